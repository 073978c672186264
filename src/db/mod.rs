pub mod pool;
pub mod queries;
pub mod queries_audit;
pub mod queries_export;
pub mod sequence;

pub use pool::create_pool;
