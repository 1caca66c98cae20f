//! The node visitor trait and its per-kind dispatch.

use crate::{EntityKind, NodeKey, NodeMapper, Result};

/// Per-kind refresh logic, dispatched by [`crate::NodeProcessor`].
///
/// Each hook receives the whole graph so a visitor can read a node's
/// children and parents while it updates the node itself.
pub trait NodeVisitor: Send {
    /// The kind of node this visitor handles.
    fn kind(&self) -> EntityKind;

    /// Decides the node's state. Does nothing if the node already has one.
    /// Children are processed before their parents.
    fn process_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()>;

    /// Marks the node deleted if nothing upstream or in the graph still
    /// needs it. Parents are pruned before their children.
    fn prune_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()>;

    /// Persists the node's state. Children are applied before their parents.
    fn apply_changes(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()>;

    /// Flushes work batched across nodes. Called once, after every node has
    /// been applied.
    fn complete(&mut self) -> Result<()> {
        Ok(())
    }
}
