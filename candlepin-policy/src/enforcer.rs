//! Rules enforcement seam used by the bind chain.

use crate::{PolicyResult, PoolOperations, ValidationResult};
use candlepin_model::{Consumer, ConsumerType, Entitlement, Pool, PoolQuantity};
use candlepin_types::PoolId;
use std::collections::BTreeMap;

/// Who is asking for validation. Some rules relax for read-only callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallerType {
    #[default]
    Bind,
    BestPools,
    ListPools,
    Unknown,
}

/// An entitlement paired with the pool it draws from.
///
/// Entitlements only reference their pool by id, so rules that need both
/// receive the pairing explicitly.
#[derive(Debug, Clone, Copy)]
pub struct BoundEntitlement<'a> {
    pub entitlement: &'a Entitlement,
    pub pool: &'a Pool,
}

/// Entitlement rules consulted by the bind chain.
pub trait Enforcer: Send + Sync {
    /// Validates every requested pool quantity. The result map holds an
    /// entry for every pool in `pool_quantities`, successful or not.
    fn pre_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        pool_quantities: &[PoolQuantity],
        caller: CallerType,
    ) -> PolicyResult<BTreeMap<PoolId, ValidationResult>>;

    /// Checks the parts of validation that depend on current inventory:
    /// quantity availability and expiry. Run again once pools are locked.
    fn finish_validation(&self, result: &mut ValidationResult, pool: &Pool, quantity: i64);

    /// Computes the pool side effects of newly granted entitlements.
    fn post_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        bound: &[BoundEntitlement<'_>],
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
    ) -> PolicyResult<PoolOperations>;
}
