use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::export::{ExportFilter, ExportInvoiceRow, ExportItemRow};

/// 按键集游标取一页发票 (id > last_id, 升序), 连带客户与币种
pub async fn fetch_invoice_page(
    pool: &PgPool,
    filter: &ExportFilter,
    last_id: i64,
    limit: i64,
) -> Result<Vec<ExportInvoiceRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT i.id, i.invoice_number, i.reference_number, i.invoice_date, i.due_date,
               i.status, i.paid_status, i.sub_total, i.discount_val, i.discount_type,
               i.tax, i.total, i.due_amount, i.notes,
               c.id AS customer_id, c.name AS customer_name, c.email AS customer_email,
               c.phone AS customer_phone, c.company_name AS customer_company,
               cur.code AS currency_code,
               i.created_at, i.updated_at
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        LEFT JOIN currencies cur ON cur.id = i.currency_id
        WHERE i.company_id = "#,
    );
    builder.push_bind(filter.company_id);
    builder.push(" AND i.id > ").push_bind(last_id);

    if let Some(customer_id) = filter.customer_id {
        builder.push(" AND i.customer_id = ").push_bind(customer_id);
    }
    if let Some(status) = &filter.status {
        builder.push(" AND i.status = ").push_bind(status.clone());
    }
    if let Some(paid_status) = &filter.paid_status {
        builder.push(" AND i.paid_status = ").push_bind(paid_status.clone());
    }
    if let Some(from) = filter.from_date {
        builder.push(" AND i.invoice_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to_date {
        builder.push(" AND i.invoice_date <= ").push_bind(to);
    }

    builder.push(" ORDER BY i.id ASC LIMIT ").push_bind(limit);

    builder
        .build_query_as::<ExportInvoiceRow>()
        .fetch_all(pool)
        .await
}

/// 批量取一页发票的全部明细
pub async fn fetch_items_for_invoices(
    pool: &PgPool,
    invoice_ids: &[i64],
) -> Result<Vec<ExportItemRow>, sqlx::Error> {
    if invoice_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ExportItemRow>(
        r#"
        SELECT id, invoice_id, name, description, quantity, unit_name,
               price, discount_val, discount_type, tax, total
        FROM invoice_items
        WHERE invoice_id = ANY($1)
        ORDER BY invoice_id, id
        "#,
    )
    .bind(invoice_ids)
    .fetch_all(pool)
    .await
}
