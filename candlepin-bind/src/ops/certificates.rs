//! Certificate generation for freshly created entitlements.

use crate::{BindContext, BindOperation, BindResult, CertificateService};
use candlepin_model::{Entitlement, Pool};
use candlepin_storage::EntitlementCurator;
use candlepin_types::PoolId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Generates certificates for the new entitlements and records the serials.
pub struct HandleCertificatesOp {
    certificates: Arc<dyn CertificateService>,
    entitlements: Arc<dyn EntitlementCurator>,
}

impl HandleCertificatesOp {
    pub fn new(certificates: Arc<dyn CertificateService>, entitlements: Arc<dyn EntitlementCurator>) -> Self {
        Self {
            certificates,
            entitlements,
        }
    }
}

impl BindOperation for HandleCertificatesOp {
    fn name(&self) -> &'static str {
        "handle certificates"
    }

    fn pre_process(&mut self, _context: &mut BindContext) -> BindResult<bool> {
        Ok(true)
    }

    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool> {
        let granted: Vec<Entitlement> = context
            .entitlements()
            .values()
            .filter(|e| e.quantity > 0)
            .cloned()
            .collect();
        if granted.is_empty() {
            return Ok(true);
        }
        let pools: BTreeMap<PoolId, Pool> = context
            .pool_quantities()
            .iter()
            .map(|(id, pq)| (*id, pq.pool.clone()))
            .collect();
        let consumer = context.locked_consumer().unwrap_or(context.consumer()).clone();

        let serials = self
            .certificates
            .generate_entitlement_certificates(&consumer, &granted, &pools)?;

        let mut updated = Vec::with_capacity(serials.len());
        for ent in context.entitlements_mut().values_mut() {
            if let Some(serial) = serials.get(&ent.id) {
                ent.certificate_serials.push(*serial);
                updated.push(ent.clone());
            }
        }
        self.entitlements.merge_entitlements(&updated)?;
        Ok(true)
    }
}
