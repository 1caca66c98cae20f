//! Storage layer for the Candlepin entitlement core.
//!
//! The bind and refresh engines only ever talk to storage through the
//! curator traits defined here: lock, create, merge, delete and a handful of
//! queries. Transactions are owned by the caller.
//!
//! # Architecture
//!
//! - One trait per aggregate ([`PoolCurator`], [`EntitlementCurator`], ...)
//! - Products and content are versioned rows keyed by uuid, mapped into each
//!   owner's catalog by upstream id
//! - [`InMemoryStore`] implements every curator behind a single mutex and
//!   tracks row locks until [`InMemoryStore::commit`]

mod curator;
mod error;
mod memory;

pub use curator::{
    ConsumerCurator, ContentCurator, EntitlementCurator, OwnerCurator, PoolCurator, ProductCurator,
};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
