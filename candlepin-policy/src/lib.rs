//! Entitlement policy for Candlepin.
//!
//! - [`Enforcer`]: the rules hooks a bind consults before and after it
//!   creates entitlements
//! - [`ValidationResult`]: per-pool outcome of a rules check
//! - [`PoolOperations`]: the ledger of pool creations and quantity targets
//!   that post-entitlement rules produce and persistence later applies
//! - [`EntitlementRules`]: the default enforcer, including virt_limit bonus
//!   pool handling

mod config;
mod enforcer;
mod error;
mod pool_operations;
mod rules;
mod validation;

pub use config::RulesConfig;
pub use enforcer::{BoundEntitlement, CallerType, Enforcer};
pub use error::{PolicyError, PolicyResult};
pub use pool_operations::PoolOperations;
pub use rules::EntitlementRules;
pub use validation::{rule_keys, ValidationResult};
