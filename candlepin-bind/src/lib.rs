//! Bind engine for Candlepin.
//!
//! A bind grants a consumer entitlements from one or more pools. It runs as
//! a chain of [`BindOperation`]s over a shared [`BindContext`]:
//!
//! 1. every operation's `pre_process` runs before any pool is locked
//!    (rules evaluation, bonus pool planning)
//! 2. the requested pools and the consumer are locked and reloaded
//! 3. every operation's `execute` runs under those locks (persistence,
//!    bonus pool reconciliation, certificates, compliance)
//!
//! Either phase may halt the chain. Expected refusals surface as
//! [`BindError::EntitlementRefused`] with every pool's validation result.
//!
//! The caller owns the transaction: nothing here rolls back on failure.

mod chain;
mod context;
mod entitler;
mod error;
mod events;
mod operation;
pub mod ops;
mod pool_manager;
mod pool_op_processor;
mod services;

pub use chain::{BindChain, BindChainFactory};
pub use context::{BindContext, BindContextFactory};
pub use entitler::Entitler;
pub use error::{BindError, BindResult, EntitlementRefusal};
pub use events::{EventQueue, EventSink};
pub use operation::BindOperation;
pub use pool_manager::{DefaultPoolManager, PoolManager};
pub use pool_op_processor::PoolOpProcessor;
pub use services::{CertificateService, ComplianceService};
