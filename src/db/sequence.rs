use sqlx::PgConnection;

use crate::error::DocumentError;
use crate::models::{SequencePair, SequenceScope};

/// 在当前事务内为单个维度分配下一个序号
///
/// 计数器行上的 upsert 持有行锁直到事务提交, 同一维度的并发分配被串行化;
/// 事务回滚时已取的序号随之释放, 不会产生无发票的空号。
pub async fn allocate_in_tx(
    conn: &mut PgConnection,
    scope: &SequenceScope,
) -> Result<i64, DocumentError> {
    let next: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (company_id, customer_id, next_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (company_id, customer_id)
        DO UPDATE SET next_value = invoice_sequences.next_value + 1
        RETURNING next_value
        "#,
    )
    .bind(scope.company_id)
    .bind(scope.customer_key())
    .fetch_one(conn)
    .await
    .map_err(DocumentError::from_allocation)?;

    Ok(next)
}

/// 分配公司全局序号与客户序号
pub async fn allocate_pair(
    conn: &mut PgConnection,
    company_id: i64,
    customer_id: i64,
) -> Result<SequencePair, DocumentError> {
    let sequence_number = allocate_in_tx(conn, &SequenceScope::company(company_id)).await?;
    let customer_sequence_number =
        allocate_in_tx(conn, &SequenceScope::customer(company_id, customer_id)).await?;

    Ok(SequencePair {
        sequence_number,
        customer_sequence_number: Some(customer_sequence_number),
    })
}
