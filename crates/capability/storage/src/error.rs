//! 存储层错误类型

/// 存储错误。
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid point: {0}")]
    InvalidPoint(String),
    #[error("lock failed")]
    Lock,
}
