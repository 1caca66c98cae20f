//! Shared state for one bind.

use crate::{BindError, BindResult, EntitlementRefusal};
use candlepin_model::{Consumer, ConsumerType, Entitlement, Owner, PoolQuantity};
use candlepin_policy::{BoundEntitlement, CallerType, ValidationResult};
use candlepin_storage::{ConsumerCurator, OwnerCurator, PoolCurator};
use candlepin_types::PoolId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Everything the operations of one bind read and write.
///
/// Built fully resolved by [`BindContextFactory::create`]: the owner,
/// consumer type and every requested pool are loaded up front, and one
/// draft entitlement exists per requested pool.
#[derive(Debug)]
pub struct BindContext {
    consumer: Consumer,
    owner: Owner,
    consumer_type: ConsumerType,
    caller: CallerType,
    pool_quantities: BTreeMap<PoolId, PoolQuantity>,
    entitlements: BTreeMap<PoolId, Entitlement>,
    locked_consumer: Option<Consumer>,
    refusal: Option<EntitlementRefusal>,
}

impl BindContext {
    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn consumer_type(&self) -> &ConsumerType {
        &self.consumer_type
    }

    pub fn caller(&self) -> CallerType {
        self.caller
    }

    pub fn pool_quantities(&self) -> &BTreeMap<PoolId, PoolQuantity> {
        &self.pool_quantities
    }

    pub fn pool_quantities_mut(&mut self) -> &mut BTreeMap<PoolId, PoolQuantity> {
        &mut self.pool_quantities
    }

    pub fn pool_quantity(&self, pool_id: PoolId) -> Option<&PoolQuantity> {
        self.pool_quantities.get(&pool_id)
    }

    /// Draft entitlements keyed by pool, one per requested pool.
    pub fn entitlements(&self) -> &BTreeMap<PoolId, Entitlement> {
        &self.entitlements
    }

    pub fn entitlements_mut(&mut self) -> &mut BTreeMap<PoolId, Entitlement> {
        &mut self.entitlements
    }

    /// True when at least one pool was asked for a positive quantity.
    pub fn is_quantity_requested(&self) -> bool {
        self.pool_quantities.values().any(|pq| pq.quantity > 0)
    }

    /// Entitlements with a positive quantity, paired with their pools.
    pub fn bound_entitlements(&self) -> Vec<BoundEntitlement<'_>> {
        self.entitlements
            .iter()
            .filter(|(_, ent)| ent.quantity > 0)
            .filter_map(|(pool_id, ent)| {
                self.pool_quantities.get(pool_id).map(|pq| BoundEntitlement {
                    entitlement: ent,
                    pool: &pq.pool,
                })
            })
            .collect()
    }

    /// Takes row locks on every requested pool and swaps in the reloaded
    /// copies. Fails if a pool disappeared since the context was built.
    pub fn lock_pools(&mut self, pools: &dyn PoolCurator) -> BindResult<()> {
        let ids: Vec<PoolId> = self.pool_quantities.keys().copied().collect();
        let locked = pools.lock_pools(&ids)?;

        let mut refreshed = 0;
        for pool in locked {
            let Some(id) = pool.id else { continue };
            if let Some(pq) = self.pool_quantities.get_mut(&id) {
                pq.pool = pool;
                refreshed += 1;
            }
        }

        if refreshed != ids.len() {
            let missing = self
                .pool_quantities
                .iter()
                .filter(|(_, pq)| !pq.pool.locked)
                .map(|(id, _)| *id)
                .collect();
            return Err(BindError::PoolsNotFound(missing));
        }
        debug!(count = refreshed, "bind pools locked");
        Ok(())
    }

    /// Takes a row lock on the consumer and keeps the reloaded copy.
    pub fn lock_consumer(&mut self, consumers: &dyn ConsumerCurator) -> BindResult<()> {
        let locked = consumers.lock_consumer(self.consumer.id)?;
        self.locked_consumer = Some(locked);
        Ok(())
    }

    pub fn locked_consumer(&self) -> Option<&Consumer> {
        self.locked_consumer.as_ref()
    }

    pub fn locked_consumer_mut(&mut self) -> Option<&mut Consumer> {
        self.locked_consumer.as_mut()
    }

    /// Records a refusal. The map must hold every pool in the request.
    pub fn set_refusal(&mut self, results: BTreeMap<PoolId, ValidationResult>) {
        self.refusal = Some(EntitlementRefusal::new(results));
    }

    pub fn refusal(&self) -> Option<&EntitlementRefusal> {
        self.refusal.as_ref()
    }

    pub fn take_refusal(&mut self) -> Option<EntitlementRefusal> {
        self.refusal.take()
    }
}

/// Builds resolved [`BindContext`]s.
#[derive(Clone)]
pub struct BindContextFactory {
    owners: Arc<dyn OwnerCurator>,
    consumers: Arc<dyn ConsumerCurator>,
    pools: Arc<dyn PoolCurator>,
}

impl BindContextFactory {
    pub fn new(
        owners: Arc<dyn OwnerCurator>,
        consumers: Arc<dyn ConsumerCurator>,
        pools: Arc<dyn PoolCurator>,
    ) -> Self {
        Self {
            owners,
            consumers,
            pools,
        }
    }

    pub fn create(
        &self,
        consumer: Consumer,
        quantities: &BTreeMap<PoolId, i64>,
        caller: CallerType,
    ) -> BindResult<BindContext> {
        let owner = self
            .owners
            .get_owner(consumer.owner_id)?
            .ok_or(BindError::OwnerNotFound(consumer.owner_id))?;
        let consumer_type = self
            .consumers
            .get_consumer_type(&consumer.type_label)?
            .ok_or_else(|| BindError::ConsumerTypeNotFound(consumer.type_label.clone()))?;

        let ids: Vec<PoolId> = quantities.keys().copied().collect();
        let mut found: BTreeMap<PoolId, _> = self
            .pools
            .get_pools(&ids)?
            .into_iter()
            .filter_map(|pool| pool.id.map(|id| (id, pool)))
            .collect();

        let missing: Vec<PoolId> = ids.iter().filter(|id| !found.contains_key(id)).copied().collect();
        if !missing.is_empty() {
            return Err(BindError::PoolsNotFound(missing));
        }

        let mut pool_quantities = BTreeMap::new();
        let mut entitlements = BTreeMap::new();
        for (pool_id, quantity) in quantities {
            if let Some(pool) = found.remove(pool_id) {
                pool_quantities.insert(*pool_id, PoolQuantity::new(pool, *quantity));
                entitlements.insert(
                    *pool_id,
                    Entitlement::draft(owner.id, consumer.id, *pool_id, *quantity),
                );
            }
        }

        Ok(BindContext {
            consumer,
            owner,
            consumer_type,
            caller,
            pool_quantities,
            entitlements,
            locked_consumer: None,
            refusal: None,
        })
    }
}
