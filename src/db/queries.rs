use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use crate::error::DocumentError;
use crate::models::invoice::{Customer, Invoice, InvoiceRow, NewInvoice, NewTax, TaxRow};
use crate::models::item::{CustomFieldValueRow, InvoiceItem, InvoiceItemRow, NewInvoiceItem};
use crate::service::money::{BaseTotals, ItemBase};

/// 插入发票主表, 返回新行 id
pub async fn insert_invoice(
    conn: &mut PgConnection,
    payload: &NewInvoice,
    status: &str,
    base: &BaseTotals,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO invoices (
            company_id, customer_id, currency_id,
            reference_number, invoice_date, due_date,
            status, paid_status, exchange_rate,
            sub_total, discount_type, discount_val, tax, total, due_amount,
            base_sub_total, base_discount_val, base_tax, base_total, base_due_amount,
            notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'UNPAID', $8,
                $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20)
        RETURNING id
        "#,
    )
    .bind(payload.company_id)
    .bind(payload.customer_id)
    .bind(payload.currency_id)
    .bind(&payload.reference_number)
    .bind(payload.invoice_date)
    .bind(payload.due_date)
    .bind(status)
    .bind(&payload.exchange_rate)
    .bind(&payload.sub_total)
    .bind(&payload.discount_type)
    .bind(&payload.discount_val)
    .bind(&payload.tax)
    .bind(&payload.total)
    .bind(&payload.total) // 新发票未付款, due_amount = total
    .bind(&base.sub_total)
    .bind(&base.discount_val)
    .bind(&base.tax)
    .bind(&base.total)
    .bind(&base.total)
    .bind(&payload.notes)
    .fetch_one(conn)
    .await
}

/// 回写序号、单号与公开标识
pub async fn update_invoice_numbers(
    conn: &mut PgConnection,
    invoice_id: i64,
    sequence_number: i64,
    customer_sequence_number: Option<i64>,
    invoice_number: &str,
    unique_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE invoices
        SET sequence_number = $2,
            customer_sequence_number = $3,
            invoice_number = $4,
            unique_hash = $5
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .bind(sequence_number)
    .bind(customer_sequence_number)
    .bind(invoice_number)
    .bind(unique_hash)
    .execute(conn)
    .await?;

    Ok(())
}

/// 插入发票明细, 返回新行 id
pub async fn insert_item(
    conn: &mut PgConnection,
    invoice_id: i64,
    company_id: i64,
    item: &NewInvoiceItem,
    exchange_rate: &bigdecimal::BigDecimal,
    base: &ItemBase,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO invoice_items (
            invoice_id, company_id, name, description, quantity, unit_name,
            price, discount_type, discount_val, tax, total,
            exchange_rate, base_price, base_discount_val, base_tax, base_total
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING id
        "#,
    )
    .bind(invoice_id)
    .bind(company_id)
    .bind(&item.name)
    .bind(&item.description)
    .bind(&item.quantity)
    .bind(&item.unit_name)
    .bind(&item.price)
    .bind(&item.discount_type)
    .bind(&item.discount_val)
    .bind(&item.tax)
    .bind(&item.total)
    .bind(exchange_rate)
    .bind(&base.price)
    .bind(&base.discount_val)
    .bind(&base.tax)
    .bind(&base.total)
    .fetch_one(conn)
    .await
}

/// 插入税费行, invoice_id / invoice_item_id 二选一
#[allow(clippy::too_many_arguments)]
pub async fn insert_tax(
    conn: &mut PgConnection,
    company_id: i64,
    invoice_id: Option<i64>,
    invoice_item_id: Option<i64>,
    tax: &NewTax,
    amount: &bigdecimal::BigDecimal,
    base_amount: &bigdecimal::BigDecimal,
    currency_id: i64,
    exchange_rate: &bigdecimal::BigDecimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO taxes (
            company_id, invoice_id, invoice_item_id, tax_type_id,
            name, percent, amount, exchange_rate, base_amount, currency_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(company_id)
    .bind(invoice_id)
    .bind(invoice_item_id)
    .bind(tax.tax_type_id)
    .bind(&tax.name)
    .bind(&tax.percent)
    .bind(amount)
    .bind(exchange_rate)
    .bind(base_amount)
    .bind(currency_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// 插入自定义字段值
pub async fn insert_custom_field_value(
    conn: &mut PgConnection,
    company_id: i64,
    owner_type: &str,
    owner_id: i64,
    name: &str,
    value: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO custom_field_values (company_id, owner_type, owner_id, name, value)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(company_id)
    .bind(owner_type)
    .bind(owner_id)
    .bind(name)
    .bind(value)
    .execute(conn)
    .await?;

    Ok(())
}

/// 查询公司的基准币种配置 (company_settings, option = 'currency')
pub async fn company_currency_setting(
    conn: &mut PgConnection,
    company_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT value FROM company_settings
        WHERE company_id = $1 AND option = 'currency'
        "#,
    )
    .bind(company_id)
    .fetch_optional(conn)
    .await
}

/// 查询币种的小数位精度
pub async fn currency_precision(
    conn: &mut PgConnection,
    currency_id: i64,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT precision FROM currencies WHERE id = $1"#)
        .bind(currency_id)
        .fetch_optional(conn)
        .await
}

/// 记录汇率快照 (发票币种与公司基准币种不同时)
pub async fn insert_exchange_rate_log(
    conn: &mut PgConnection,
    company_id: i64,
    currency_id: i64,
    exchange_rate: &bigdecimal::BigDecimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO exchange_rate_logs (company_id, currency_id, exchange_rate)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(company_id)
    .bind(currency_id)
    .bind(exchange_rate)
    .execute(conn)
    .await?;

    Ok(())
}

/// 锁定并读取发票当前付款状态 (FOR UPDATE, 与状态更新同事务)
pub async fn lock_paid_status(
    conn: &mut PgConnection,
    invoice_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT paid_status FROM invoices WHERE id = $1 FOR UPDATE"#)
        .bind(invoice_id)
        .fetch_optional(conn)
        .await
}

/// 更新付款状态
pub async fn set_paid_status(
    conn: &mut PgConnection,
    invoice_id: i64,
    paid_status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE invoices SET paid_status = $2, updated_at = now() WHERE id = $1"#)
        .bind(invoice_id)
        .bind(paid_status)
        .execute(conn)
        .await?;

    Ok(())
}

/// 查询待归档发票 id 列表: 未归档、未付款、早于截止时间
pub async fn list_archivable_ids(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT id FROM invoices
        WHERE paid_status = 'UNPAID'
          AND is_archived = FALSE
          AND created_at < $1
        ORDER BY id
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

/// 归档单张发票, 返回实际生效行数 (0 表示状态已被并发修改)
pub async fn archive_invoice(pool: &PgPool, invoice_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET is_archived = TRUE,
            previous_status = status,
            status = 'ARCHIVED',
            updated_at = now()
        WHERE id = $1
          AND is_archived = FALSE
          AND paid_status = 'UNPAID'
        "#,
    )
    .bind(invoice_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 锁定并读取归档相关字段
pub async fn lock_archive_state(
    conn: &mut PgConnection,
    invoice_id: i64,
) -> Result<Option<(bool, String, Option<String>)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT is_archived, status, previous_status
        FROM invoices WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(conn)
    .await
}

/// 写入归档开关结果, paid_status 不受影响
pub async fn set_archive_state(
    conn: &mut PgConnection,
    invoice_id: i64,
    is_archived: bool,
    status: &str,
    previous_status: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE invoices
        SET is_archived = $2, status = $3, previous_status = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .bind(is_archived)
    .bind(status)
    .bind(previous_status)
    .execute(conn)
    .await?;

    Ok(())
}

/// 加载完整发票聚合: 主表 + 明细 + 税费 + 自定义字段 + 客户
pub async fn load_invoice(pool: &PgPool, invoice_id: i64) -> Result<Invoice, DocumentError> {
    let header: InvoiceRow = sqlx::query_as(
        r#"
        SELECT id, company_id, customer_id, currency_id, invoice_number, reference_number,
               invoice_date, due_date, status, previous_status, paid_status, is_archived,
               sequence_number, customer_sequence_number, unique_hash, exchange_rate,
               sub_total, discount_type, discount_val, tax, total, due_amount,
               base_sub_total, base_discount_val, base_tax, base_total, base_due_amount,
               notes, created_at, updated_at
        FROM invoices
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DocumentError::NotFound)?;

    let item_rows: Vec<InvoiceItemRow> = sqlx::query_as(
        r#"
        SELECT id, invoice_id, name, description, quantity, unit_name,
               price, discount_type, discount_val, tax, total,
               exchange_rate, base_price, base_discount_val, base_tax, base_total
        FROM invoice_items
        WHERE invoice_id = $1
        ORDER BY id
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;

    let item_ids: Vec<i64> = item_rows.iter().map(|i| i.id).collect();

    let taxes: Vec<TaxRow> = sqlx::query_as(
        r#"
        SELECT id, invoice_id, invoice_item_id, tax_type_id, name, percent,
               amount, base_amount, currency_id
        FROM taxes
        WHERE invoice_id = $1 OR invoice_item_id = ANY($2)
        ORDER BY id
        "#,
    )
    .bind(invoice_id)
    .bind(&item_ids)
    .fetch_all(pool)
    .await?;

    let fields: Vec<CustomFieldValueRow> = sqlx::query_as(
        r#"
        SELECT id, owner_type, owner_id, name, value
        FROM custom_field_values
        WHERE (owner_type = 'Invoice' AND owner_id = $1)
           OR (owner_type = 'InvoiceItem' AND owner_id = ANY($2))
        ORDER BY id
        "#,
    )
    .bind(invoice_id)
    .bind(&item_ids)
    .fetch_all(pool)
    .await?;

    let customer: Option<Customer> = sqlx::query_as(
        r#"
        SELECT id, company_id, name, email, phone, company_name
        FROM customers WHERE id = $1
        "#,
    )
    .bind(header.customer_id)
    .fetch_optional(pool)
    .await?;

    // 按归属拆分税费与自定义字段
    let mut item_taxes: HashMap<i64, Vec<TaxRow>> = HashMap::new();
    let mut invoice_taxes = Vec::new();
    for tax in taxes {
        match tax.invoice_item_id {
            Some(item_id) => item_taxes.entry(item_id).or_default().push(tax),
            None => invoice_taxes.push(tax),
        }
    }

    let mut item_fields: HashMap<i64, Vec<CustomFieldValueRow>> = HashMap::new();
    let mut invoice_fields = Vec::new();
    for field in fields {
        if field.owner_type == "InvoiceItem" {
            item_fields.entry(field.owner_id).or_default().push(field);
        } else {
            invoice_fields.push(field);
        }
    }

    let items = item_rows
        .into_iter()
        .map(|row| {
            let taxes = item_taxes.remove(&row.id).unwrap_or_default();
            let fields = item_fields.remove(&row.id).unwrap_or_default();
            InvoiceItem { row, taxes, fields }
        })
        .collect();

    Ok(Invoice {
        header,
        items,
        taxes: invoice_taxes,
        fields: invoice_fields,
        customer,
    })
}
