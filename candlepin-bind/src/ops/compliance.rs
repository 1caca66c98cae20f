//! Compliance recomputation, the last step of a bind.

use crate::{BindContext, BindOperation, BindResult, ComplianceService};
use candlepin_storage::ConsumerCurator;
use std::sync::Arc;
use tracing::debug;

/// Recomputes the consumer's compliance status once entitlements exist.
pub struct ComplianceOp {
    compliance: Arc<dyn ComplianceService>,
    consumers: Arc<dyn ConsumerCurator>,
}

impl ComplianceOp {
    pub fn new(compliance: Arc<dyn ComplianceService>, consumers: Arc<dyn ConsumerCurator>) -> Self {
        Self {
            compliance,
            consumers,
        }
    }
}

impl BindOperation for ComplianceOp {
    fn name(&self) -> &'static str {
        "compliance"
    }

    fn pre_process(&mut self, _context: &mut BindContext) -> BindResult<bool> {
        Ok(true)
    }

    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool> {
        // Bonus pool revocation may have saved this consumer since it was locked.
        context.lock_consumer(self.consumers.as_ref())?;
        let Some(consumer) = context.locked_consumer_mut() else {
            return Ok(true);
        };
        let status = self.compliance.compute_status(consumer)?;
        debug!(consumer = %consumer.uuid, status = %status, "compliance recomputed");
        consumer.entitlement_status = Some(status);
        self.consumers.merge_consumer(consumer)?;
        Ok(true)
    }
}
