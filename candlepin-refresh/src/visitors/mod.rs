//! Visitors for the three entity kinds.

mod content;
mod pool;
mod product;

pub use content::ContentNodeVisitor;
pub use pool::PoolNodeVisitor;
pub use product::ProductNodeVisitor;

use crate::{NodeKey, RefreshError};

fn stateless(key: &NodeKey) -> RefreshError {
    RefreshError::InvariantViolation(format!("applying changes to {key} before it has a state"))
}
