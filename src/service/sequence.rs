use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::DocumentError;
use crate::models::sequence::SequenceScope;

/// 按维度分配序号的接口
///
/// 生产路径是 db::sequence 的事务内 upsert (计数器行锁串行化并发分配),
/// 有意不放在该接口后面: 分配必须加入调用方已经打开的创建事务才能保证
/// 回滚时释放序号, 而接口签名不携带事务句柄。
/// 该接口的内存实现用于在无数据库环境下验证分配语义。
#[allow(async_fn_in_trait)]
pub trait SequenceAllocator {
    /// 返回严格大于该维度此前任何返回值的整数
    async fn allocate(&self, scope: SequenceScope) -> Result<i64, DocumentError>;
}

/// 内存计数器: 与 invoice_sequences 表同构的 (company, customer) 键控存储
#[derive(Debug, Default)]
pub struct InMemorySequences {
    counters: Mutex<HashMap<(i64, i64), i64>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceAllocator for InMemorySequences {
    async fn allocate(&self, scope: SequenceScope) -> Result<i64, DocumentError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| DocumentError::AllocationConflict)?;
        let next = counters
            .entry((scope.company_id, scope.customer_key()))
            .or_insert(0);
        *next += 1;
        Ok(*next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_allocations_are_distinct_and_gapless() {
        let sequences = Arc::new(InMemorySequences::new());
        let scope = SequenceScope::company(1);

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let sequences = sequences.clone();
                tokio::spawn(async move { sequences.allocate(scope).await.unwrap() })
            })
            .collect();

        let mut values = Vec::new();
        for task in tasks {
            values.push(task.await.unwrap());
        }
        values.sort_unstable();

        // N 次并发分配 => 恰好 1..=N, 无重复无空号
        assert_eq!(values, (1..=32).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let sequences = InMemorySequences::new();

        assert_eq!(sequences.allocate(SequenceScope::company(1)).await.unwrap(), 1);
        assert_eq!(sequences.allocate(SequenceScope::company(1)).await.unwrap(), 2);
        // 另一家公司从 1 开始
        assert_eq!(sequences.allocate(SequenceScope::company(2)).await.unwrap(), 1);
        // 同公司的客户维度独立于公司全局维度
        assert_eq!(
            sequences.allocate(SequenceScope::customer(1, 10)).await.unwrap(),
            1
        );
        assert_eq!(sequences.allocate(SequenceScope::company(1)).await.unwrap(), 3);
    }
}
