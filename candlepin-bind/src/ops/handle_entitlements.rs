//! Creates the entitlements and adjusts pool and consumer counts.

use crate::{BindContext, BindOperation, BindResult};
use candlepin_model::{Entitlement, Pool};
use candlepin_storage::{ConsumerCurator, EntitlementCurator, PoolCurator};
use std::sync::Arc;
use tracing::debug;

/// Persists the entitlements and charges their quantities to the pools and
/// the consumer.
pub struct HandleEntitlementsOp {
    pools: Arc<dyn PoolCurator>,
    entitlements: Arc<dyn EntitlementCurator>,
    consumers: Arc<dyn ConsumerCurator>,
}

impl HandleEntitlementsOp {
    pub fn new(
        pools: Arc<dyn PoolCurator>,
        entitlements: Arc<dyn EntitlementCurator>,
        consumers: Arc<dyn ConsumerCurator>,
    ) -> Self {
        Self {
            pools,
            entitlements,
            consumers,
        }
    }
}

impl BindOperation for HandleEntitlementsOp {
    fn name(&self) -> &'static str {
        "handle entitlements"
    }

    fn pre_process(&mut self, _context: &mut BindContext) -> BindResult<bool> {
        Ok(true)
    }

    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool> {
        let manifest = context.consumer_type().manifest;
        let granted: Vec<Entitlement> = context
            .entitlements()
            .values()
            .filter(|e| e.quantity > 0)
            .cloned()
            .collect();
        if granted.is_empty() {
            return Ok(true);
        }

        let mut charged: Vec<Pool> = Vec::with_capacity(granted.len());
        for ent in &granted {
            if let Some(pq) = context.pool_quantities_mut().get_mut(&ent.pool_id) {
                pq.pool.consumed += ent.quantity;
                if manifest {
                    pq.pool.exported += ent.quantity;
                }
                charged.push(pq.pool.clone());
            }
        }

        self.entitlements.create_entitlements(&granted)?;
        self.pools.merge_pools(&charged)?;

        let total: i64 = granted.iter().map(|e| e.quantity).sum();
        if let Some(consumer) = context.locked_consumer_mut() {
            consumer.entitlement_count += total;
            self.consumers.merge_consumer(consumer)?;
        }
        debug!(count = granted.len(), quantity = total, "entitlements persisted");
        Ok(true)
    }
}
