//! Default entitlement rules.

use crate::{
    rule_keys, BoundEntitlement, CallerType, Enforcer, PolicyError, PolicyResult, PoolOperations,
    RulesConfig, ValidationResult,
};
use candlepin_model::{
    pool_attributes, product_attributes, Consumer, ConsumerType, Entitlement, Pool, PoolQuantity,
    PoolType, SourceStack, SourceSubscription,
};
use candlepin_storage::{ConsumerCurator, EntitlementCurator, PoolCurator};
use candlepin_types::PoolId;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

const UNLIMITED: i64 = -1;

/// Parses a virt_limit attribute. `None` means no bonus pool should be
/// created: the value is missing, non-positive, or not a number.
fn parse_virt_limit(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.eq_ignore_ascii_case("unlimited") {
        return Some(UNLIMITED);
    }
    value.parse::<i64>().ok().filter(|q| *q > 0)
}

/// Native implementation of the entitlement rules.
pub struct EntitlementRules {
    config: RulesConfig,
    consumers: Arc<dyn ConsumerCurator>,
    entitlements: Arc<dyn EntitlementCurator>,
    pools: Arc<dyn PoolCurator>,
}

impl EntitlementRules {
    pub fn new(
        config: RulesConfig,
        consumers: Arc<dyn ConsumerCurator>,
        entitlements: Arc<dyn EntitlementCurator>,
        pools: Arc<dyn PoolCurator>,
    ) -> Self {
        Self {
            config,
            consumers,
            entitlements,
            pools,
        }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    // ── Pre-entitlement ──────────────────────────────────────────

    fn validate_pool(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        pool: &Pool,
        quantity: i64,
        held_pools: &HashSet<PoolId>,
        host: &mut Option<Option<Consumer>>,
    ) -> PolicyResult<ValidationResult> {
        let mut result = ValidationResult::new();

        if quantity < 0 {
            result.add_error(rule_keys::INVALID_QUANTITY);
            return Ok(result);
        }

        if consumer_type.manifest {
            // Distributors are exempt from attribute rules, but may never see
            // derived pools.
            if pool.attributes.contains_key(pool_attributes::DERIVED_POOL) {
                result.add_error(rule_keys::MANIFEST_DERIVED_POOL);
            }
        } else {
            let multi_ent = pool.is_multi_entitlement();
            if !multi_ent && pool.id.is_some_and(|id| held_pools.contains(&id)) {
                result.add_error(rule_keys::ALREADY_HAS_PRODUCT);
            }
            if quantity > 1 && !multi_ent {
                result.add_error(rule_keys::MULTI_ENTITLEMENT_UNSUPPORTED);
            }

            match pool.merged_attribute(pool_attributes::REQUIRES_CONSUMER_TYPE) {
                Some(required) if required != consumer_type.label => {
                    result.add_error(rule_keys::CONSUMER_TYPE_MISMATCH);
                }
                Some(_) => {}
                None => {
                    if consumer_type.label != ConsumerType::SYSTEM
                        && consumer_type.label != ConsumerType::HYPERVISOR
                    {
                        result.add_error(rule_keys::CONSUMER_TYPE_MISMATCH);
                    }
                }
            }

            if pool.is_virt_only() && !consumer.is_guest() {
                result.add_error(rule_keys::VIRT_ONLY);
            }
            if pool.is_physical_only() && consumer.is_guest() {
                result.add_error(rule_keys::PHYSICAL_ONLY);
            }

            if let Some(required_host) = pool.attribute(pool_attributes::REQUIRES_HOST) {
                if self.config.standalone {
                    if consumer.virt_uuid().is_none() {
                        result.add_error(rule_keys::VIRT_ONLY);
                    } else {
                        if host.is_none() {
                            *host = Some(self.consumers.get_host(consumer)?);
                        }
                        let matches = host
                            .as_ref()
                            .and_then(Option::as_ref)
                            .is_some_and(|h| h.uuid == required_host);
                        if !matches {
                            result.add_error(rule_keys::HOST_MISMATCH);
                        }
                    }
                }
            }
        }

        if pool.start_date > Utc::now() {
            result.add_warning(rule_keys::POOL_NOT_STARTED);
        }

        self.finish_validation(&mut result, pool, quantity);
        Ok(result)
    }

    // ── Post-entitlement ─────────────────────────────────────────

    /// Builds the host-restricted bonus pool a virt_limit entitlement yields.
    fn host_restricted_pool(
        consumer: &Consumer,
        pool: &Pool,
        entitlement: &Entitlement,
        quantity: i64,
    ) -> Pool {
        let mut derived = Pool::new(
            pool.owner_id,
            pool.product.clone(),
            quantity,
            pool.start_date,
            pool.end_date,
        );
        derived.attributes = pool.attributes.clone();
        derived
            .attributes
            .insert(pool_attributes::REQUIRES_HOST.to_string(), consumer.uuid.clone());
        derived
            .attributes
            .insert(pool_attributes::DERIVED_POOL.to_string(), "true".to_string());
        derived
            .attributes
            .insert(pool_attributes::VIRT_ONLY.to_string(), "true".to_string());
        if let Some(id) = pool.id {
            derived
                .attributes
                .insert(pool_attributes::SOURCE_POOL_ID.to_string(), id.to_string());
        }
        derived.source_subscription = pool.source_subscription.as_ref().map(|s| SourceSubscription {
            subscription_id: s.subscription_id.clone(),
            sub_key: entitlement.id.to_string(),
        });
        derived.contract_number.clone_from(&pool.contract_number);
        derived.account_number.clone_from(&pool.account_number);
        derived.order_number.clone_from(&pool.order_number);

        match pool.stack_id() {
            Some(stack_id) => {
                derived.pool_type = PoolType::StackDerived;
                derived.source_stack = Some(SourceStack {
                    consumer_id: consumer.id,
                    stack_id: stack_id.to_string(),
                });
            }
            None => {
                derived.pool_type = PoolType::EntitlementDerived;
                derived.source_entitlement = Some(entitlement.id);
            }
        }
        derived
    }

    fn post_bind_virt_limit(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        bound: &[BoundEntitlement<'_>],
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
    ) -> PolicyResult<PoolOperations> {
        let mut ops = PoolOperations::new();
        let stacks_with_sub_pools: BTreeSet<&str> = sub_pools_for_stack_ids
            .iter()
            .filter_map(|p| p.source_stack.as_ref().map(|s| s.stack_id.as_str()))
            .collect();
        let mut covered_stacks: BTreeSet<String> = BTreeSet::new();

        let regular_host = !consumer_type.manifest && !consumer.is_guest();
        let mut hosted_adjustments = Vec::new();

        debug!(entitlements = bound.len(), "running virt_limit post-bind");
        for pair in bound {
            let pool = pair.pool;
            if regular_host && (self.config.standalone || pool.is_host_limited()) && !is_update {
                let stack_id = pool.stack_id();
                let uncovered = stack_id.is_none_or(|s| {
                    !stacks_with_sub_pools.contains(s) && !covered_stacks.contains(s)
                });
                if !uncovered {
                    debug!(pool_id = ?pool.id, "stack already has a sub-pool, skipping");
                    continue;
                }
                if let Some(s) = stack_id {
                    covered_stacks.insert(s.to_string());
                }
                let Some(virt_quantity) =
                    parse_virt_limit(pool.merged_attribute(product_attributes::VIRT_LIMIT))
                else {
                    continue;
                };
                debug!(pool_id = ?pool.id, virt_quantity, "creating host-restricted pool");
                ops.create_pool(Self::host_restricted_pool(
                    consumer,
                    pool,
                    pair.entitlement,
                    virt_quantity,
                ));
            } else {
                hosted_adjustments.push(*pair);
            }
        }

        if !hosted_adjustments.is_empty() {
            ops.append(self.adjust_hosted_bonus_pool_quantity(
                consumer_type,
                &hosted_adjustments,
                is_update,
            )?);
        }
        Ok(ops)
    }

    /// Distributors binding virt_limit pools in hosted mode export those
    /// guests' rights, so the subscription's bonus pools shrink accordingly.
    fn adjust_hosted_bonus_pool_quantity(
        &self,
        consumer_type: &ConsumerType,
        bound: &[BoundEntitlement<'_>],
        is_update: bool,
    ) -> PolicyResult<PoolOperations> {
        let mut ops = PoolOperations::new();
        if !consumer_type.manifest || self.config.standalone {
            return Ok(ops);
        }

        let mut subscription_pools: BTreeMap<String, Vec<Pool>> = BTreeMap::new();
        for pair in bound {
            if let Some(sub_id) = pair.pool.subscription_id() {
                if !subscription_pools.contains_key(sub_id) {
                    let pools = self.pools.list_by_subscription(pair.pool.owner_id, sub_id)?;
                    subscription_pools.insert(sub_id.to_string(), pools);
                }
            }
        }

        for pair in bound {
            let pool = pair.pool;
            if pool.is_host_limited() {
                continue;
            }
            let Some(sub_id) = pool.subscription_id() else {
                continue;
            };
            let siblings = subscription_pools.get(sub_id).map(Vec::as_slice).unwrap_or_default();
            let derived = siblings
                .iter()
                .filter(|p| p.attributes.contains_key(pool_attributes::DERIVED_POOL));
            let virt_limit = pool.merged_attribute(product_attributes::VIRT_LIMIT);

            if virt_limit.is_some_and(|v| v.eq_ignore_ascii_case("unlimited")) {
                // An unlimited bonus pool drops to zero once the physical
                // pool is entirely exported.
                let mut exported = pool.exported;
                if !is_update {
                    exported += pair.entitlement.quantity;
                }
                let target = if pool.quantity == exported { 0 } else { UNLIMITED };
                for derived_pool in derived {
                    ops.update_quantity(derived_pool.clone(), target);
                }
                continue;
            }

            let Some(limit) = virt_limit.and_then(|v| v.trim().parse::<i64>().ok()) else {
                continue;
            };
            let virt_quantity = limit.saturating_mul(pair.entitlement.quantity);
            if virt_quantity == 0 {
                continue;
            }
            let primary_unlimited = siblings.iter().any(|p| p.quantity == UNLIMITED);
            for derived_pool in derived {
                let id = derived_pool
                    .id
                    .ok_or_else(|| PolicyError::UnsavedPool(derived_pool.product.id.clone()))?;
                let target = if primary_unlimited
                    && matches!(derived_pool.pool_type, PoolType::Bonus | PoolType::UnmappedGuest)
                {
                    UNLIMITED
                } else {
                    let current = ops.quantity_target(id).unwrap_or(derived_pool.quantity);
                    (current - virt_quantity).max(0)
                };
                ops.update_quantity(derived_pool.clone(), target);
            }
        }
        Ok(ops)
    }
}

impl Enforcer for EntitlementRules {
    fn pre_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        pool_quantities: &[PoolQuantity],
        caller: CallerType,
    ) -> PolicyResult<BTreeMap<PoolId, ValidationResult>> {
        debug!(consumer = %consumer.uuid, pools = pool_quantities.len(), ?caller, "pre-entitlement");

        let held_pools: HashSet<PoolId> = if consumer_type.manifest {
            HashSet::new()
        } else {
            self.entitlements
                .list_by_consumer(consumer.id)?
                .into_iter()
                .map(|e| e.pool_id)
                .collect()
        };

        let mut host = None;
        let mut results = BTreeMap::new();
        for pq in pool_quantities {
            let id = pq
                .pool
                .id
                .ok_or_else(|| PolicyError::UnsavedPool(pq.pool.product.id.clone()))?;
            let result = self.validate_pool(
                consumer,
                consumer_type,
                &pq.pool,
                pq.quantity,
                &held_pools,
                &mut host,
            )?;
            results.insert(id, result);
        }
        Ok(results)
    }

    fn finish_validation(&self, result: &mut ValidationResult, pool: &Pool, quantity: i64) {
        if !pool.entitlements_available(quantity) {
            result.add_error(rule_keys::NO_ENTITLEMENTS_AVAILABLE);
        }
        if pool.is_expired(Utc::now()) {
            result.add_error(rule_keys::POOL_EXPIRED);
        }
    }

    fn post_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        bound: &[BoundEntitlement<'_>],
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
    ) -> PolicyResult<PoolOperations> {
        let virt_limited: Vec<BoundEntitlement<'_>> = bound
            .iter()
            .filter(|pair| pair.pool.has_merged_attribute(product_attributes::VIRT_LIMIT))
            .copied()
            .collect();

        // Manifest consumers only matter in hosted mode.
        if virt_limited.is_empty() || (consumer_type.manifest && self.config.standalone) {
            return Ok(PoolOperations::new());
        }
        self.post_bind_virt_limit(
            consumer,
            consumer_type,
            &virt_limited,
            sub_pools_for_stack_ids,
            is_update,
        )
    }
}
