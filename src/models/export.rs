use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// CSV 导出列头 (固定顺序)
pub const EXPORT_HEADERS: [&str; 32] = [
    "Invoice ID",
    "Invoice Number",
    "Reference Number",
    "Invoice Date",
    "Due Date",
    "Status",
    "Paid Status",
    "Sub Total",
    "Discount",
    "Discount Type",
    "Tax",
    "Total",
    "Due Amount",
    "Notes",
    "Customer ID",
    "Customer Name",
    "Customer Email",
    "Customer Phone",
    "Customer Company",
    "Currency Code",
    "Item ID",
    "Item Name",
    "Item Description",
    "Item Quantity",
    "Item Unit Name",
    "Item Price",
    "Item Discount",
    "Item Discount Type",
    "Item Tax",
    "Item Total",
    "Created At",
    "Updated At",
];

/// 导出过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportFilter {
    pub company_id: i64,
    pub customer_id: Option<i64>,
    pub status: Option<String>,
    pub paid_status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// 导出用发票行 (连带客户与币种)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportInvoiceRow {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub reference_number: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub paid_status: String,
    pub sub_total: BigDecimal,
    pub discount_val: BigDecimal,
    pub discount_type: Option<String>,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub due_amount: BigDecimal,
    pub notes: Option<String>,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_company: Option<String>,
    pub currency_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 导出用明细行
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportItemRow {
    pub id: i64,
    pub invoice_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: BigDecimal,
    pub unit_name: Option<String>,
    pub price: BigDecimal,
    pub discount_val: BigDecimal,
    pub discount_type: Option<String>,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}
