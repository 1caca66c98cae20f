//! Core type definitions for Candlepin.
//!
//! This crate defines the small, storage-agnostic types shared by every
//! other crate in the workspace:
//! - Identifiers for pools, entitlements, consumers and owners (UUID v7)
//! - Audit events emitted when the engine creates or changes inventory
//!
//! Domain entities (pools, products, content) live in `candlepin-model`.

mod event;
mod ids;

pub use event::{Event, EventId, EventTarget, EventType};
pub use ids::{ConsumerId, EntitlementId, OwnerId, PoolId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
