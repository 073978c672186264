use serde::{Deserialize, Serialize};

/// 序号分配维度: 公司必填, 客户可选
///
/// 公司全局计数器与客户计数器各自独立, 互不影响。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceScope {
    pub company_id: i64,
    pub customer_id: Option<i64>,
}

impl SequenceScope {
    pub fn company(company_id: i64) -> Self {
        Self {
            company_id,
            customer_id: None,
        }
    }

    pub fn customer(company_id: i64, customer_id: i64) -> Self {
        Self {
            company_id,
            customer_id: Some(customer_id),
        }
    }

    /// 计数器表中客户列的落库值, 0 表示公司全局
    pub fn customer_key(&self) -> i64 {
        self.customer_id.unwrap_or(0)
    }
}

/// 一次分配得到的序号对
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePair {
    pub sequence_number: i64,
    pub customer_sequence_number: Option<i64>,
}
