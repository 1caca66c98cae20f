//! Error types for the bind layer.

use candlepin_policy::{PolicyError, ValidationResult};
use candlepin_storage::StorageError;
use candlepin_types::{ConsumerId, OwnerId, PoolId};
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type for bind operations.
pub type BindResult<T> = Result<T, BindError>;

/// Errors that can end a bind.
#[derive(Debug, Error)]
pub enum BindError {
    /// One or more requested pools do not exist.
    #[error("pools not found: {0:?}")]
    PoolsNotFound(Vec<PoolId>),

    #[error("consumer not found: {0}")]
    ConsumerNotFound(ConsumerId),

    #[error("owner not found: {0}")]
    OwnerNotFound(OwnerId),

    #[error("consumer type not found: {0}")]
    ConsumerTypeNotFound(String),

    /// The rules refused at least one requested pool.
    #[error("entitlement refused: {0}")]
    EntitlementRefused(EntitlementRefusal),

    /// An operation stopped the chain without recording a refusal.
    #[error("bind halted by {0}")]
    Halted(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A certificate or compliance collaborator failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

/// A rules refusal, carrying the result for every pool in the request and
/// the backtrace captured where the refusal was detected.
#[derive(Debug)]
pub struct EntitlementRefusal {
    results: BTreeMap<PoolId, ValidationResult>,
    backtrace: Backtrace,
}

impl EntitlementRefusal {
    pub fn new(results: BTreeMap<PoolId, ValidationResult>) -> Self {
        Self {
            results,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn results(&self) -> &BTreeMap<PoolId, ValidationResult> {
        &self.results
    }

    /// Pools whose validation failed.
    pub fn failed_pools(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.results
            .iter()
            .filter(|(_, r)| !r.is_successful())
            .map(|(id, _)| *id)
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for EntitlementRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (id, result) in &self.results {
            if result.is_successful() {
                continue;
            }
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{id}: {}", result.errors().join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for EntitlementRefusal {}
