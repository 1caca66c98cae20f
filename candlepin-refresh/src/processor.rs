//! Depth-ordered walk of the refresh graph.

use crate::{
    EntityKind, EntityState, NodeKey, NodeMapper, NodeState, NodeVisitor, RefreshError,
    RefreshResult, Result,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Runs registered [`NodeVisitor`]s over a [`NodeMapper`].
///
/// Nodes are bucketed by the deepest depth at which any root reaches them.
/// Every node is processed before any of its parents, then pruned from the
/// roots down, then applied children-first. Within a depth tier nodes are
/// ordered by kind (content, product, pool) and then id, which keeps lock
/// acquisition order stable across concurrent refreshes.
#[derive(Default)]
pub struct NodeProcessor {
    visitors: BTreeMap<EntityKind, Box<dyn NodeVisitor>>,
}

impl NodeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a visitor, replacing any previous one for its kind.
    pub fn add_visitor(&mut self, visitor: impl NodeVisitor + 'static) -> &mut Self {
        self.visitors.insert(visitor.kind(), Box::new(visitor));
        self
    }

    pub fn with_visitor(mut self, visitor: impl NodeVisitor + 'static) -> Self {
        self.add_visitor(visitor);
        self
    }

    fn visitor(&mut self, kind: EntityKind) -> Result<&mut Box<dyn NodeVisitor>> {
        self.visitors
            .get_mut(&kind)
            .ok_or_else(|| RefreshError::InvariantViolation(format!("no visitor registered for {kind} nodes")))
    }

    pub fn process_nodes(&mut self, nodes: &mut NodeMapper) -> Result<RefreshResult> {
        let tiers = depth_tiers(nodes)?;
        debug!(nodes = nodes.len(), tiers = tiers.len(), "processing refresh graph");

        for tier in tiers.values().rev() {
            for key in tier {
                self.visitor(key.kind)?.process_node(nodes, key)?;
            }
        }
        for tier in tiers.values() {
            for key in tier {
                self.visitor(key.kind)?.prune_node(nodes, key)?;
            }
        }
        for tier in tiers.values().rev() {
            for key in tier {
                self.visitor(key.kind)?.apply_changes(nodes, key)?;
            }
        }
        for visitor in self.visitors.values_mut() {
            visitor.complete()?;
        }

        let result = compile_result(nodes)?;
        info!(
            created = result.count(EntityState::Created),
            updated = result.count(EntityState::Updated),
            deleted = result.count(EntityState::Deleted),
            "refresh graph processed"
        );
        Ok(result)
    }
}

/// Buckets every node reachable from a root by its deepest depth.
fn depth_tiers(nodes: &NodeMapper) -> Result<BTreeMap<usize, BTreeSet<NodeKey>>> {
    let mut depths: BTreeMap<NodeKey, usize> = BTreeMap::new();
    let mut path = BTreeSet::new();
    for root in nodes.root_nodes() {
        walk(nodes, root.key(), 0, &mut path, &mut depths)?;
    }

    let mut tiers: BTreeMap<usize, BTreeSet<NodeKey>> = BTreeMap::new();
    for (key, depth) in depths {
        tiers.entry(depth).or_default().insert(key);
    }
    Ok(tiers)
}

fn walk(
    nodes: &NodeMapper,
    key: NodeKey,
    depth: usize,
    path: &mut BTreeSet<NodeKey>,
    depths: &mut BTreeMap<NodeKey, usize>,
) -> Result<()> {
    if path.contains(&key) {
        return Err(RefreshError::InvariantViolation(format!("cycle through node {key}")));
    }
    if depths.get(&key).is_some_and(|d| *d >= depth) {
        return Ok(());
    }
    let node = nodes
        .get(&key)
        .ok_or_else(|| RefreshError::InvariantViolation(format!("dangling edge to {key}")))?;

    depths.insert(key.clone(), depth);
    path.insert(key.clone());
    for child in node.children() {
        walk(nodes, child.clone(), depth + 1, path, depths)?;
    }
    path.remove(&key);
    Ok(())
}

fn compile_result(nodes: &NodeMapper) -> Result<RefreshResult> {
    let mut result = RefreshResult::new();
    for node in nodes.nodes() {
        let state = match node.state() {
            None => {
                return Err(RefreshError::InvariantViolation(format!(
                    "node {} was never processed",
                    node.key()
                )));
            }
            Some(NodeState::Created) => EntityState::Created,
            Some(NodeState::Updated | NodeState::ChildrenUpdated) => EntityState::Updated,
            Some(NodeState::Unchanged) => EntityState::Unchanged,
            Some(NodeState::Deleted) => EntityState::Deleted,
            Some(NodeState::Skipped) => continue,
        };
        result.add(node.key(), state);
    }
    Ok(result)
}
