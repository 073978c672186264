use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::invoice::{CustomFieldEntry, NewTax, TaxRow};

/// 发票明细行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceItemRow {
    pub id: i64,
    pub invoice_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: BigDecimal,
    pub unit_name: Option<String>,
    pub price: BigDecimal,
    pub discount_type: Option<String>,
    pub discount_val: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub base_price: BigDecimal,
    pub base_discount_val: BigDecimal,
    pub base_tax: BigDecimal,
    pub base_total: BigDecimal,
}

/// 自定义字段值 (归属发票或明细)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomFieldValueRow {
    pub id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    pub name: String,
    pub value: Option<String>,
}

/// 明细聚合 (明细行 + 税费 + 自定义字段)
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceItem {
    #[serde(flatten)]
    pub row: InvoiceItemRow,
    pub taxes: Vec<TaxRow>,
    pub fields: Vec<CustomFieldValueRow>,
}

/// 创建明细的入参
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: BigDecimal,
    pub unit_name: Option<String>,
    pub price: BigDecimal,
    pub discount_type: Option<String>,
    #[serde(default)]
    pub discount_val: BigDecimal,
    #[serde(default)]
    pub tax: BigDecimal,
    pub total: BigDecimal,
    #[serde(default)]
    pub taxes: Vec<NewTax>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldEntry>,
}
