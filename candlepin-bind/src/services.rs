//! Collaborators the bind chain calls out to.

use crate::BindResult;
use candlepin_model::{Consumer, Entitlement, Pool};
use candlepin_types::{EntitlementId, PoolId};
use std::collections::BTreeMap;

/// Issues entitlement certificates.
pub trait CertificateService: Send + Sync {
    /// Generates one certificate per entitlement and returns its serial.
    /// `pools` holds the locked pool for every entitlement.
    fn generate_entitlement_certificates(
        &self,
        consumer: &Consumer,
        entitlements: &[Entitlement],
        pools: &BTreeMap<PoolId, Pool>,
    ) -> BindResult<BTreeMap<EntitlementId, u64>>;
}

/// Computes a consumer's compliance status.
pub trait ComplianceService: Send + Sync {
    /// Returns the status label to store on the consumer, e.g. `valid`.
    fn compute_status(&self, consumer: &Consumer) -> BindResult<String>;
}
