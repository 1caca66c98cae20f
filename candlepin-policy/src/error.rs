//! Error types for the policy layer.

use candlepin_storage::StorageError;
use thiserror::Error;

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors raised while evaluating rules. Rule refusals are not errors; they
/// are reported through [`crate::ValidationResult`].
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A collaborator query failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// A pool handed to the rules was never persisted.
    #[error("pool has no id: {0}")]
    UnsavedPool(String),
}
