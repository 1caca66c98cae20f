//! Bonus pool shrinking and overflow revocation for manifest binds.

use crate::{BindContext, BindOperation, BindResult, PoolManager};
use std::sync::Arc;

/// Revokes entitlements from bonus pools the bind pushed over quantity.
pub struct CheckBonusPoolQuantitiesOp {
    pool_manager: Arc<dyn PoolManager>,
}

impl CheckBonusPoolQuantitiesOp {
    pub fn new(pool_manager: Arc<dyn PoolManager>) -> Self {
        Self { pool_manager }
    }
}

impl BindOperation for CheckBonusPoolQuantitiesOp {
    fn name(&self) -> &'static str {
        "check bonus pool quantities"
    }

    fn pre_process(&mut self, _context: &mut BindContext) -> BindResult<bool> {
        Ok(true)
    }

    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool> {
        let bound = context.bound_entitlements();
        if bound.is_empty() {
            return Ok(true);
        }
        self.pool_manager
            .check_bonus_pool_quantities(context.owner().id, &bound)?;
        Ok(true)
    }
}
