//! Validation results with their errors and warnings.

use serde::{Deserialize, Serialize};

/// Message keys reported by the entitlement rules.
pub mod rule_keys {
    pub const NO_ENTITLEMENTS_AVAILABLE: &str = "rulefailed.no.entitlements.available";
    pub const POOL_EXPIRED: &str = "rulefailed.pool.expired";
    pub const CONSUMER_TYPE_MISMATCH: &str = "rulefailed.consumer.type.mismatch";
    pub const VIRT_ONLY: &str = "rulefailed.virt.only";
    pub const PHYSICAL_ONLY: &str = "rulefailed.physical.only";
    pub const HOST_MISMATCH: &str = "virt.guest.host.does.not.match.pool.owner";
    pub const ALREADY_HAS_PRODUCT: &str = "rulefailed.consumer.already.has.product";
    pub const MULTI_ENTITLEMENT_UNSUPPORTED: &str = "rulefailed.pool.does.not.support.multi-entitlement";
    pub const INVALID_QUANTITY: &str = "rulefailed.invalid.quantity";
    pub const MANIFEST_DERIVED_POOL: &str = "pool.not.available.to.manifest.consumers";
    pub const POOL_NOT_STARTED: &str = "rulewarning.pool.not.started";
}

/// Outcome of validating one pool. Successful when it carries no errors;
/// warnings never fail a bind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, key: impl Into<String>) {
        self.errors.push(key.into());
    }

    pub fn add_warning(&mut self, key: impl Into<String>) {
        self.warnings.push(key.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.errors.iter().any(|e| e == key)
    }

    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
