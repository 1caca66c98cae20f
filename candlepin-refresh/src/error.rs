//! Error types for the refresh engine.

use candlepin_storage::StorageError;
use thiserror::Error;

/// Result type for refresh operations.
pub type Result<T> = std::result::Result<T, RefreshError>;

#[derive(Debug, Error)]
pub enum RefreshError {
    /// The node graph or a visitor reached a state that well-formed input
    /// cannot produce.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An entity or node was rejected on input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
