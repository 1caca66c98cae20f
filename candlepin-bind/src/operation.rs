//! The two-phase bind operation trait.

use crate::{BindContext, BindResult};

/// One step of the bind chain.
///
/// Returning `Ok(false)` from either phase halts the chain. An operation
/// that halts because the rules refused should record the refusal on the
/// context first.
pub trait BindOperation: Send {
    /// Name used in logs and in [`crate::BindError::Halted`].
    fn name(&self) -> &'static str;

    /// Runs before pools are locked. Must not write.
    fn pre_process(&mut self, context: &mut BindContext) -> BindResult<bool>;

    /// Runs with the requested pools and the consumer locked.
    fn execute(&mut self, context: &mut BindContext) -> BindResult<bool>;
}
