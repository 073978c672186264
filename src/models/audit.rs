use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::invoice::PaidStatus;

/// 一次真实的付款状态迁移 (old != new 且 new == PAID)
///
/// 由执行更新的代码显式传入前后状态构造, 不依赖 ORM 脏检查。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidTransition {
    pub invoice_id: i64,
    /// 操作人, 系统触发的变更为 None
    pub user_id: Option<i64>,
    pub old_status: PaidStatus,
    pub new_status: PaidStatus,
}

/// 审计日志查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    pub company_id: i64,
    pub invoice_id: Option<i64>,
    /// 操作人姓名/邮箱模糊匹配
    pub user_search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub order_by_field: Option<String>,
    /// "asc" / "desc"
    pub order_by: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 审计日志查询结果行 (连带发票号与操作人信息)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogRecord {
    pub id: i64,
    pub invoice_id: i64,
    pub user_id: Option<i64>,
    pub old_status: String,
    pub new_status: String,
    pub created_at: DateTime<Utc>,
    pub invoice_number: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// 分页结果
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
