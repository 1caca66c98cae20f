//! Bonus pool quantity enforcement.

use crate::BindResult;
use candlepin_model::product_attributes;
use candlepin_policy::BoundEntitlement;
use candlepin_storage::{ConsumerCurator, EntitlementCurator, PoolCurator};
use candlepin_types::{EntitlementId, OwnerId, PoolId};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Pool maintenance invoked by the bind chain.
pub trait PoolManager: Send + Sync {
    /// Revokes entitlements from derived pools of the bound virt_limit
    /// subscriptions that are now consumed beyond their quantity. The bound
    /// pools themselves are left alone.
    fn check_bonus_pool_quantities(
        &self,
        owner_id: OwnerId,
        bound: &[BoundEntitlement<'_>],
    ) -> BindResult<()>;
}

/// [`PoolManager`] backed by the curators.
pub struct DefaultPoolManager {
    pools: Arc<dyn PoolCurator>,
    entitlements: Arc<dyn EntitlementCurator>,
    consumers: Arc<dyn ConsumerCurator>,
}

impl DefaultPoolManager {
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

    /// Removes the newest entitlements of an overflowing pool until the
    /// pool fits its quantity again.
    fn revoke_overflow(&self, pool_id: PoolId) -> BindResult<()> {
        let Some(mut pool) = self.pools.lock_pools(&[pool_id])?.into_iter().next() else {
            return Ok(());
        };
        if pool.is_unlimited() || !pool.is_overflowing() {
            return Ok(());
        }

        let mut entitlements = self.entitlements.list_by_pool(pool_id)?;
        entitlements.sort_by(|a, b| b.created.cmp(&a.created));

        let mut revoked: Vec<EntitlementId> = Vec::new();
        for ent in entitlements {
            if pool.consumed <= pool.quantity {
                break;
            }
            pool.consumed -= ent.quantity;

            if let Some(mut consumer) = self.consumers.get_consumer(ent.consumer_id)? {
                let manifest = self
                    .consumers
                    .get_consumer_type(&consumer.type_label)?
                    .is_some_and(|t| t.manifest);
                if manifest {
                    pool.exported -= ent.quantity;
                }
                consumer.entitlement_count -= ent.quantity;
                self.consumers.merge_consumer(&consumer)?;
            }
            revoked.push(ent.id);
        }

        if revoked.is_empty() {
            return Ok(());
        }
        info!(
            pool_id = %pool_id,
            count = revoked.len(),
            "revoking entitlements from overflowing pool"
        );
        self.entitlements.delete_entitlements(&revoked)?;
        self.pools.merge_pools(&[pool])?;
        Ok(())
    }
}

impl PoolManager for DefaultPoolManager {
    fn check_bonus_pool_quantities(
        &self,
        owner_id: OwnerId,
        bound: &[BoundEntitlement<'_>],
    ) -> BindResult<()> {
        let excluded: HashSet<PoolId> = bound.iter().filter_map(|b| b.pool.id).collect();
        let subscriptions: BTreeSet<&str> = bound
            .iter()
            .filter(|b| b.pool.has_merged_attribute(product_attributes::VIRT_LIMIT))
            .filter_map(|b| b.pool.subscription_id())
            .collect();

        for subscription_id in subscriptions {
            for pool in self.pools.list_by_subscription(owner_id, subscription_id)? {
                let Some(id) = pool.id else { continue };
                if excluded.contains(&id) || !pool.is_derived() || pool.is_unlimited() {
                    continue;
                }
                if pool.is_overflowing() {
                    debug!(pool_id = %id, subscription_id, "bonus pool overflowing");
                    self.revoke_overflow(id)?;
                }
            }
        }
        Ok(())
    }
}
