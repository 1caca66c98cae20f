//! Node storage keyed by entity kind and id.

use crate::{
    AnyNode, ContentNode, EntityKind, NodeKey, NodeState, PoolNode, ProductNode, RefreshError, Result,
};
use std::collections::BTreeMap;

/// Arena of graph nodes addressed by [`NodeKey`]. Edges are stored as keys
/// on both ends.
#[derive(Debug, Default)]
pub struct NodeMapper {
    nodes: BTreeMap<NodeKey, AnyNode>,
}

fn missing(key: &NodeKey) -> RefreshError {
    RefreshError::InvariantViolation(format!("no node mapped for {key}"))
}

fn wrong_kind(key: &NodeKey, expected: EntityKind) -> RefreshError {
    RefreshError::InvariantViolation(format!("node {key} is not a {expected} node"))
}

impl NodeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Each key may be mapped once.
    pub fn add_node(&mut self, node: impl Into<AnyNode>) -> Result<NodeKey> {
        let node = node.into();
        let key = node.key();
        if self.nodes.contains_key(&key) {
            return Err(RefreshError::InvalidArgument(format!("node {key} is already mapped")));
        }
        self.nodes.insert(key.clone(), node);
        Ok(key)
    }

    pub fn get(&self, key: &NodeKey) -> Option<&AnyNode> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: &NodeKey) -> Option<&mut AnyNode> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records `child` as a child of `parent`. Both must be mapped.
    pub fn link(&mut self, parent: &NodeKey, child: &NodeKey) -> Result<()> {
        if !self.nodes.contains_key(child) {
            return Err(missing(child));
        }
        self.nodes
            .get_mut(parent)
            .ok_or_else(|| missing(parent))?
            .children_mut()
            .insert(child.clone());
        if let Some(node) = self.nodes.get_mut(child) {
            node.parents_mut().insert(parent.clone());
        }
        Ok(())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AnyNode> {
        self.nodes.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    /// Nodes with no parents.
    pub fn root_nodes(&self) -> impl Iterator<Item = &AnyNode> {
        self.nodes.values().filter(|n| n.parents().is_empty())
    }

    /// Nodes with no children.
    pub fn leaf_nodes(&self) -> impl Iterator<Item = &AnyNode> {
        self.nodes.values().filter(|n| n.children().is_empty())
    }

    /// True if any child of `key` changed during this refresh.
    pub fn children_changed(&self, key: &NodeKey) -> Result<bool> {
        let node = self.get(key).ok_or_else(|| missing(key))?;
        Ok(node
            .children()
            .iter()
            .filter_map(|child| self.get(child))
            .any(AnyNode::is_changed))
    }

    /// True if every parent of `key` is being deleted. Vacuously true for
    /// roots.
    pub fn parents_deleted(&self, key: &NodeKey) -> Result<bool> {
        let node = self.get(key).ok_or_else(|| missing(key))?;
        Ok(node
            .parents()
            .iter()
            .filter_map(|parent| self.get(parent))
            .all(|p| p.state() == Some(NodeState::Deleted)))
    }

    pub fn content_node(&self, key: &NodeKey) -> Result<&ContentNode> {
        match self.get(key) {
            Some(AnyNode::Content(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Content)),
            None => Err(missing(key)),
        }
    }

    pub fn content_node_mut(&mut self, key: &NodeKey) -> Result<&mut ContentNode> {
        match self.nodes.get_mut(key) {
            Some(AnyNode::Content(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Content)),
            None => Err(missing(key)),
        }
    }

    pub fn product_node(&self, key: &NodeKey) -> Result<&ProductNode> {
        match self.get(key) {
            Some(AnyNode::Product(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Product)),
            None => Err(missing(key)),
        }
    }

    pub fn product_node_mut(&mut self, key: &NodeKey) -> Result<&mut ProductNode> {
        match self.nodes.get_mut(key) {
            Some(AnyNode::Product(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Product)),
            None => Err(missing(key)),
        }
    }

    pub fn pool_node(&self, key: &NodeKey) -> Result<&PoolNode> {
        match self.get(key) {
            Some(AnyNode::Pool(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Pool)),
            None => Err(missing(key)),
        }
    }

    pub fn pool_node_mut(&mut self, key: &NodeKey) -> Result<&mut PoolNode> {
        match self.nodes.get_mut(key) {
            Some(AnyNode::Pool(node)) => Ok(node),
            Some(_) => Err(wrong_kind(key, EntityKind::Pool)),
            None => Err(missing(key)),
        }
    }
}
