use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::audit::{AuditLogFilter, AuditLogRecord, Paginated, PaidTransition};

const DEFAULT_PAGE_LIMIT: i64 = 15;

/// 追加一条付款审计记录 (仅由真实迁移触发, 与状态更新同事务)
pub async fn insert_paid_audit_log(
    conn: &mut PgConnection,
    transition: &PaidTransition,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO invoice_paid_audit_logs (invoice_id, user_id, old_status, new_status)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(transition.invoice_id)
    .bind(transition.user_id)
    .bind(transition.old_status.as_str())
    .bind(transition.new_status.as_str())
    .execute(conn)
    .await?;

    Ok(())
}

/// 排序字段白名单, 非法字段回落到 created_at
pub fn sanitize_order(field: Option<&str>, direction: Option<&str>) -> (&'static str, &'static str) {
    let column = match field {
        Some("id") => "l.id",
        Some("invoice_id") => "l.invoice_id",
        Some("user_id") => "l.user_id",
        Some("old_status") => "l.old_status",
        Some("new_status") => "l.new_status",
        _ => "l.created_at",
    };
    let dir = match direction {
        Some(d) if d.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    };
    (column, dir)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    builder.push(" WHERE i.company_id = ").push_bind(filter.company_id);

    if let Some(invoice_id) = filter.invoice_id {
        builder.push(" AND l.invoice_id = ").push_bind(invoice_id);
    }

    if let Some(search) = &filter.user_search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(from) = filter.from_date {
        builder.push(" AND l.created_at::date >= ").push_bind(from);
    }

    if let Some(to) = filter.to_date {
        builder.push(" AND l.created_at::date <= ").push_bind(to);
    }
}

/// 分页查询审计日志, 连带发票号与操作人信息
pub async fn list_audit_logs(
    pool: &PgPool,
    filter: &AuditLogFilter,
) -> Result<Paginated<AuditLogRecord>, sqlx::Error> {
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100);
    let page = filter.page.unwrap_or(1).max(1);
    let (order_column, order_dir) = sanitize_order(
        filter.order_by_field.as_deref(),
        filter.order_by.as_deref(),
    );

    let mut count_builder = QueryBuilder::new(
        r#"
        SELECT count(*)
        FROM invoice_paid_audit_logs l
        INNER JOIN invoices i ON i.id = l.invoice_id
        LEFT JOIN users u ON u.id = l.user_id
        "#,
    );
    push_filters(&mut count_builder, filter);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::new(
        r#"
        SELECT l.id, l.invoice_id, l.user_id, l.old_status, l.new_status, l.created_at,
               i.invoice_number, u.name AS user_name, u.email AS user_email
        FROM invoice_paid_audit_logs l
        INNER JOIN invoices i ON i.id = l.invoice_id
        LEFT JOIN users u ON u.id = l.user_id
        "#,
    );
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY ")
        .push(order_column)
        .push(" ")
        .push(order_dir)
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);

    let data = builder
        .build_query_as::<AuditLogRecord>()
        .fetch_all(pool)
        .await?;

    Ok(Paginated {
        data,
        page,
        limit,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_order_accepts_whitelisted_columns() {
        assert_eq!(sanitize_order(Some("invoice_id"), Some("asc")), ("l.invoice_id", "ASC"));
        assert_eq!(sanitize_order(Some("user_id"), Some("ASC")), ("l.user_id", "ASC"));
    }

    #[test]
    fn sanitize_order_rejects_arbitrary_input() {
        // 非白名单字段与方向不得进入 SQL
        assert_eq!(
            sanitize_order(Some("created_at; DROP TABLE users"), Some("asc; --")),
            ("l.created_at", "DESC")
        );
        assert_eq!(sanitize_order(None, None), ("l.created_at", "DESC"));
    }
}
