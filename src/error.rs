use thiserror::Error;

/// 子系统错误分类
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 金额字段非法 (负数/汇率非正), 在任何写入前拒绝
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// 序号分配竞争失败, 调用方应整体重试本次创建
    #[error("sequence allocation conflict, retry the creation")]
    AllocationConflict,

    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 底层存储错误, 当前事务整体回滚
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// CSV 编码失败, 已写出的行不回收
    #[error("csv write failure: {0}")]
    Csv(#[from] csv::Error),

    /// 导出目标写入失败
    #[error("sink write failure: {0}")]
    Io(#[from] std::io::Error),

    /// 配置错误 (如 Hashids salt 构建失败)
    #[error("configuration error: {0}")]
    Config(String),
}

impl DocumentError {
    /// 将 sqlx 错误映射为分类错误: 唯一约束冲突/序列化失败 => AllocationConflict
    pub fn from_allocation(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if let Some(code) = db_err.code() {
                // 23505 = unique_violation, 40001 = serialization_failure
                if code == "23505" || code == "40001" {
                    return DocumentError::AllocationConflict;
                }
            }
        }
        DocumentError::Persistence(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_stays_persistence() {
        let err = DocumentError::from_allocation(sqlx::Error::RowNotFound);
        assert!(matches!(err, DocumentError::Persistence(_)));
    }
}
