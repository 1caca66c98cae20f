//! Ledger of pending pool changes.
//!
//! Rules evaluation runs before any pool is locked, so it cannot write pool
//! rows directly. It records what it wants here instead: pools to create and
//! absolute quantity targets for existing pools. The bind chain hands the
//! ledger to persistence once the locks are held.

use candlepin_model::Pool;
use candlepin_types::PoolId;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolOperations {
    creations: Vec<Pool>,
    updates: BTreeMap<PoolId, (Pool, i64)>,
}

impl PoolOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a pool for creation.
    pub fn create_pool(&mut self, pool: Pool) {
        self.creations.push(pool);
    }

    /// Sets the absolute quantity `pool` should end up with. A later call for
    /// the same pool replaces the earlier target. Pools that were never
    /// persisted cannot be updated and are ignored.
    pub fn update_quantity(&mut self, pool: Pool, quantity: i64) {
        match pool.id {
            Some(id) => {
                self.updates.insert(id, (pool, quantity));
            }
            None => warn!(product = %pool.product.id, "ignoring quantity update for unsaved pool"),
        }
    }

    /// Merges `other` into this ledger. Creations are concatenated; update
    /// targets from `other` win on collision.
    pub fn append(&mut self, other: PoolOperations) {
        self.creations.extend(other.creations);
        self.updates.extend(other.updates);
    }

    pub fn creations(&self) -> &[Pool] {
        &self.creations
    }

    /// Quantity targets keyed by pool id.
    pub fn updates(&self) -> impl Iterator<Item = (&Pool, i64)> {
        self.updates.values().map(|(pool, quantity)| (pool, *quantity))
    }

    pub fn quantity_target(&self, pool_id: PoolId) -> Option<i64> {
        self.updates.get(&pool_id).map(|(_, quantity)| *quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.updates.is_empty()
    }

    /// Splits the ledger into its creations and its update targets.
    pub fn into_parts(self) -> (Vec<Pool>, BTreeMap<PoolId, (Pool, i64)>) {
        (self.creations, self.updates)
    }
}
