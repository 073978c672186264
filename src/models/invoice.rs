use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::models::item::{CustomFieldValueRow, InvoiceItem};

/// 发票生命周期状态 (与归档/付款状态正交)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Completed,
    Archived,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Viewed => "VIEWED",
            InvoiceStatus::Completed => "COMPLETED",
            InvoiceStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "SENT" => Ok(InvoiceStatus::Sent),
            "VIEWED" => Ok(InvoiceStatus::Viewed),
            "COMPLETED" => Ok(InvoiceStatus::Completed),
            "ARCHIVED" => Ok(InvoiceStatus::Archived),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// 付款状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaidStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl PaidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaidStatus::Unpaid => "UNPAID",
            PaidStatus::PartiallyPaid => "PARTIALLY_PAID",
            PaidStatus::Paid => "PAID",
        }
    }
}

impl FromStr for PaidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(PaidStatus::Unpaid),
            "PARTIALLY_PAID" => Ok(PaidStatus::PartiallyPaid),
            "PAID" => Ok(PaidStatus::Paid),
            other => Err(format!("unknown paid status: {other}")),
        }
    }
}

/// 发票主表行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub id: i64,
    pub company_id: i64,
    pub customer_id: i64,
    pub currency_id: i64,
    pub invoice_number: Option<String>,
    pub reference_number: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub previous_status: Option<String>,
    pub paid_status: String,
    pub is_archived: bool,
    pub sequence_number: Option<i64>,
    pub customer_sequence_number: Option<i64>,
    pub unique_hash: Option<String>,
    pub exchange_rate: BigDecimal,
    pub sub_total: BigDecimal,
    pub discount_type: Option<String>,
    pub discount_val: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub due_amount: BigDecimal,
    pub base_sub_total: BigDecimal,
    pub base_discount_val: BigDecimal,
    pub base_tax: BigDecimal,
    pub base_total: BigDecimal,
    pub base_due_amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 客户信息
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

/// 税费行 (发票级或明细级)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaxRow {
    pub id: i64,
    pub invoice_id: Option<i64>,
    pub invoice_item_id: Option<i64>,
    pub tax_type_id: Option<i64>,
    pub name: String,
    pub percent: Option<BigDecimal>,
    pub amount: BigDecimal,
    pub base_amount: BigDecimal,
    pub currency_id: Option<i64>,
}

/// 发票聚合 (主表 + 明细 + 税费 + 自定义字段 + 客户)
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    #[serde(flatten)]
    pub header: InvoiceRow,
    pub items: Vec<InvoiceItem>,
    pub taxes: Vec<TaxRow>,
    pub fields: Vec<CustomFieldValueRow>,
    pub customer: Option<Customer>,
}

/// 创建发票的入参 (已通过外层请求校验的载荷)
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub company_id: i64,
    pub customer_id: i64,
    pub currency_id: i64,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub reference_number: Option<String>,
    pub exchange_rate: BigDecimal,
    pub sub_total: BigDecimal,
    pub discount_type: Option<String>,
    #[serde(default)]
    pub discount_val: BigDecimal,
    #[serde(default)]
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub notes: Option<String>,
    pub items: Vec<crate::models::item::NewInvoiceItem>,
    #[serde(default)]
    pub taxes: Vec<NewTax>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldEntry>,
    /// 创建后立即发送: 初始状态为 SENT 而非 DRAFT
    #[serde(default)]
    pub invoice_send: bool,
}

/// 税费入参, amount 为空的条目跳过不落库
#[derive(Debug, Clone, Deserialize)]
pub struct NewTax {
    pub tax_type_id: Option<i64>,
    pub name: String,
    pub percent: Option<BigDecimal>,
    pub amount: Option<BigDecimal>,
}

/// 自定义字段入参
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldEntry {
    pub name: String,
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_status_round_trips_through_str() {
        for status in [PaidStatus::Unpaid, PaidStatus::PartiallyPaid, PaidStatus::Paid] {
            assert_eq!(status.as_str().parse::<PaidStatus>().unwrap(), status);
        }
        assert!("PAYED".parse::<PaidStatus>().is_err());
    }

    #[test]
    fn invoice_status_round_trips_through_str() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Viewed,
            InvoiceStatus::Completed,
            InvoiceStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
    }
}
