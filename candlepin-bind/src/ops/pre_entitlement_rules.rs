//! Rules validation of the requested pools, before and after locking.

use crate::{BindContext, BindOperation, BindResult};
use candlepin_model::PoolQuantity;
use candlepin_policy::{Enforcer, ValidationResult};
use candlepin_types::PoolId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs the pre-entitlement rules before locking, then re-checks quantity
/// availability and expiry against the locked pools.
pub struct PreEntitlementRulesCheckOp {
    enforcer: Arc<dyn Enforcer>,
    results: BTreeMap<PoolId, ValidationResult>,
}

impl PreEntitlementRulesCheckOp {
    pub fn new(enforcer: Arc<dyn Enforcer>) -> Self {
        Self {
            enforcer,
            results: BTreeMap::new(),
        }
    }
}

fn all_successful(results: &BTreeMap<PoolId, ValidationResult>) -> bool {
    results.values().all(ValidationResult::is_successful)
}

impl BindOperation for PreEntitlementRulesCheckOp {
    fn name(&self) -> &'static str {
        "pre-entitlement rules check"
    }

    fn pre_process(&mut self, context: &mut BindContext) -> BindResult<bool> {
        if !context.is_quantity_requested() {
            debug!("no quantity requested, skipping rules");
            return Ok(true);
        }

        let pool_quantities: Vec<PoolQuantity> = context.pool_quantities().values().cloned().collect();
        let results = self.enforcer.pre_entitlement(
            context.consumer(),
            context.consumer_type(),
            &pool_quantities,
            context.caller(),
        )?;

        if !all_successful(&results) {
            warn!(consumer = %context.consumer().uuid, "pre-entitlement rules refused bind");
            context.set_refusal(results);
            return Ok(false);
        }
        self.results = results;
        Ok(true)
    }

    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool> {
        if !context.is_quantity_requested() {
            return Ok(true);
        }

        let mut results = BTreeMap::new();
        for (pool_id, pq) in context.pool_quantities() {
            let mut result = self.results.get(pool_id).cloned().unwrap_or_default();
            self.enforcer.finish_validation(&mut result, &pq.pool, pq.quantity);
            results.insert(*pool_id, result);
        }

        if !all_successful(&results) {
            warn!(
                consumer = %context.consumer().uuid,
                "locked pools no longer satisfy the request"
            );
            context.set_refusal(results);
            return Ok(false);
        }
        Ok(true)
    }
}
