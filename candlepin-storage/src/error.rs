//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Write conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A store lock was poisoned by a panicking writer.
    #[error("lock error: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
