//! Bonus pool creation and updates after entitlements are granted.

use crate::{BindContext, BindOperation, BindResult, PoolOpProcessor};
use candlepin_model::Pool;
use candlepin_policy::{Enforcer, PoolOperations};
use candlepin_storage::{EntitlementCurator, PoolCurator};
use candlepin_types::PoolId;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Creates and adjusts the bonus pools the new entitlements call for, and
/// widens stack-derived pools to cover their stack.
pub struct PostBindBonusPoolsOp {
    enforcer: Arc<dyn Enforcer>,
    pools: Arc<dyn PoolCurator>,
    entitlements: Arc<dyn EntitlementCurator>,
    processor: Arc<PoolOpProcessor>,
    ledger: Option<PoolOperations>,
    stack_windows: BTreeMap<PoolId, (DateTime<Utc>, DateTime<Utc>)>,
}

impl PostBindBonusPoolsOp {
    pub fn new(
        enforcer: Arc<dyn Enforcer>,
        pools: Arc<dyn PoolCurator>,
        entitlements: Arc<dyn EntitlementCurator>,
        processor: Arc<PoolOpProcessor>,
    ) -> Self {
        Self {
            enforcer,
            pools,
            entitlements,
            processor,
            ledger: None,
            stack_windows: BTreeMap::new(),
        }
    }

    /// Computes the window each stack-derived pool should span: the
    /// earliest start and latest end over every pool in its stack the
    /// consumer draws from, including the pools being bound now.
    fn stack_windows(
        &self,
        context: &BindContext,
        sub_pools: &[Pool],
    ) -> BindResult<BTreeMap<PoolId, (DateTime<Utc>, DateTime<Utc>)>> {
        let mut stacked: Vec<Pool> = context
            .pool_quantities()
            .values()
            .filter(|pq| pq.quantity > 0 && pq.pool.is_stacked())
            .map(|pq| pq.pool.clone())
            .collect();

        let existing: Vec<PoolId> = self
            .entitlements
            .list_by_consumer(context.consumer().id)?
            .into_iter()
            .map(|e| e.pool_id)
            .filter(|id| !context.pool_quantities().contains_key(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !existing.is_empty() {
            stacked.extend(self.pools.get_pools(&existing)?.into_iter().filter(Pool::is_stacked));
        }

        let mut windows = BTreeMap::new();
        for sub_pool in sub_pools {
            let (Some(id), Some(source)) = (sub_pool.id, sub_pool.source_stack.as_ref()) else {
                continue;
            };
            let members = stacked
                .iter()
                .filter(|p| p.stack_id() == Some(source.stack_id.as_str()) && p.id != sub_pool.id);
            let window = members.fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, p| {
                Some(match acc {
                    None => (p.start_date, p.end_date),
                    Some((start, end)) => (start.min(p.start_date), end.max(p.end_date)),
                })
            });
            if let Some((start, end)) = window
                && (start, end) != (sub_pool.start_date, sub_pool.end_date)
            {
                windows.insert(id, (start, end));
            }
        }
        Ok(windows)
    }
}

impl BindOperation for PostBindBonusPoolsOp {
    fn name(&self) -> &'static str {
        "post-bind bonus pools"
    }

    fn pre_process(&mut self, context: &mut BindContext) -> BindResult<bool> {
        let stack_ids: BTreeSet<String> = context
            .pool_quantities()
            .values()
            .filter_map(|pq| pq.pool.stack_id().map(str::to_owned))
            .collect();
        let sub_pools = if stack_ids.is_empty() {
            Vec::new()
        } else {
            self.pools
                .sub_pools_for_stack_ids(context.consumer().id, &stack_ids)?
        };

        let bound = context.bound_entitlements();
        let ledger = self.enforcer.post_entitlement(
            context.consumer(),
            context.consumer_type(),
            &bound,
            &sub_pools,
            false,
        )?;
        debug!(
            creations = ledger.creations().len(),
            updates = ledger.updates().count(),
            "bonus pool plan"
        );
        self.ledger = Some(ledger);
        self.stack_windows = self.stack_windows(context, &sub_pools)?;
        Ok(true)
    }

    fn execute(&mut self, _context: &mut BindContext) -> BindResult<bool> {
        if !self.stack_windows.is_empty() {
            let ids: Vec<PoolId> = self.stack_windows.keys().copied().collect();
            let mut widened = Vec::with_capacity(ids.len());
            for mut pool in self.pools.lock_pools(&ids)? {
                if let Some((start, end)) = pool.id.and_then(|id| self.stack_windows.get(&id)) {
                    pool.start_date = *start;
                    pool.end_date = *end;
                    widened.push(pool);
                }
            }
            self.pools.merge_pools(&widened)?;
        }

        if let Some(ledger) = self.ledger.take() {
            self.processor.process(ledger)?;
        }
        Ok(true)
    }
}
