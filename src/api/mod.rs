pub mod handlers;

use std::sync::Arc;

use sqlx::PgPool;

use crate::service::{CsvExporter, InvoiceService};

/// 共享状态: 发票服务 + 导出器 + 连接池
#[derive(Clone)]
pub struct AppState {
    pub invoices: Arc<InvoiceService>,
    pub exporter: Arc<CsvExporter>,
    pub pool: PgPool,
}
