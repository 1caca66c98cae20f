//! Applies a [`PoolOperations`] ledger to storage.

use crate::{BindResult, EventSink};
use candlepin_model::Pool;
use candlepin_policy::PoolOperations;
use candlepin_storage::PoolCurator;
use candlepin_types::{Event, PoolId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Persists pool creations and quantity changes computed by the rules.
pub struct PoolOpProcessor {
    pools: Arc<dyn PoolCurator>,
    events: Arc<dyn EventSink>,
}

impl PoolOpProcessor {
    pub fn new(pools: Arc<dyn PoolCurator>, events: Arc<dyn EventSink>) -> Self {
        Self { pools, events }
    }

    /// Saves every creation in one batch, then applies every quantity
    /// update. A pool-created event is queued for each creation that had
    /// no id before saving.
    pub fn process(&self, operations: PoolOperations) -> BindResult<()> {
        let (creations, updates) = operations.into_parts();

        if !creations.is_empty() {
            let existing: HashSet<PoolId> = creations.iter().filter_map(|p| p.id).collect();
            let created = self.pools.create_pools(creations)?;
            for pool in &created {
                let Some(id) = pool.id else { continue };
                if existing.contains(&id) {
                    continue;
                }
                let payload = serde_json::to_string(pool)?;
                self.events
                    .queue(Event::pool_created(id.to_string(), pool.owner_id, payload));
            }
            debug!(count = created.len(), "created pools");
        }

        if !updates.is_empty() {
            self.set_pool_quantity(updates.into_values().collect())?;
        }
        Ok(())
    }

    /// Sets each pool's quantity to its target and merges the batch.
    ///
    /// Pools not already locked by this transaction are locked and reloaded
    /// first, and the target lands on the reloaded copy. Already locked
    /// pools are used as given.
    pub fn set_pool_quantity(&self, targets: Vec<(Pool, i64)>) -> BindResult<Vec<Pool>> {
        let mut batch = Vec::with_capacity(targets.len());
        let mut pending = Vec::new();

        for (mut pool, quantity) in targets {
            if pool.locked {
                pool.quantity = quantity;
                batch.push(pool);
            } else if let Some(id) = pool.id {
                pending.push((id, quantity));
            }
        }

        if !pending.is_empty() {
            let ids: Vec<PoolId> = pending.iter().map(|(id, _)| *id).collect();
            for mut pool in self.pools.lock_pools(&ids)? {
                let target = pending
                    .iter()
                    .find(|(id, _)| Some(*id) == pool.id)
                    .map(|(_, q)| *q);
                if let Some(quantity) = target {
                    pool.quantity = quantity;
                    batch.push(pool);
                }
            }
        }

        self.pools.merge_pools(&batch)?;
        debug!(count = batch.len(), "set pool quantities");
        Ok(batch)
    }
}
