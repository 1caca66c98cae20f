//! Content node processing.

use super::stateless;
use crate::{EntityKind, NodeKey, NodeMapper, NodeState, NodeVisitor, RefreshError, Result};
use candlepin_model::Content;
use candlepin_storage::ContentCurator;
use std::sync::Arc;
use tracing::debug;

/// Refreshes content. Content nodes are always leaves.
pub struct ContentNodeVisitor {
    content: Arc<dyn ContentCurator>,
}

impl ContentNodeVisitor {
    pub fn new(content: Arc<dyn ContentCurator>) -> Self {
        Self { content }
    }
}

impl NodeVisitor for ContentNodeVisitor {
    fn kind(&self) -> EntityKind {
        EntityKind::Content
    }

    fn process_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let node = nodes.content_node_mut(key)?;
        if node.state().is_some() {
            return Ok(());
        }
        if !node.is_leaf() {
            return Err(RefreshError::InvariantViolation(format!(
                "content node {key} has children"
            )));
        }

        let state = match (node.existing(), node.imported()) {
            (Some(existing), Some(imported)) if existing.is_changed_by(imported) => NodeState::Updated,
            (Some(_), _) => NodeState::Unchanged,
            (None, Some(_)) => NodeState::Created,
            (None, None) => NodeState::Skipped,
        };
        node.set_state(state);
        Ok(())
    }

    fn prune_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let parents_deleted = nodes.parents_deleted(key)?;
        let node = nodes.content_node_mut(key)?;
        let cleared = node
            .existing()
            .is_some_and(|e| e.locked && node.imported().is_none() && parents_deleted);
        if cleared {
            debug!(content = %key.id, "content no longer referenced upstream");
            node.set_state(NodeState::Deleted);
        }
        Ok(())
    }

    fn apply_changes(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let node = nodes.content_node_mut(key)?;
        let owner_id = node.owner_id();

        match node.state().ok_or_else(|| stateless(key))? {
            NodeState::Created => {
                let Some(imported) = node.imported() else {
                    return Err(RefreshError::InvariantViolation(format!(
                        "created node {key} has no upstream version"
                    )));
                };
                let created = self
                    .content
                    .create_content(owner_id, Content::from_info(imported))?;
                node.set_merged(created);
            }
            NodeState::Updated => {
                let (Some(existing), Some(imported)) = (node.existing(), node.imported()) else {
                    return Err(RefreshError::InvariantViolation(format!(
                        "updated node {key} lacks a version"
                    )));
                };
                let mut merged = existing.clone();
                merged.apply(imported);
                self.content.merge_content(owner_id, &merged)?;
                node.set_merged(merged);
            }
            NodeState::Deleted => {
                if let Some(uuid) = node.existing().and_then(|e| e.uuid.clone()) {
                    self.content.delete_content(owner_id, &uuid)?;
                }
            }
            NodeState::ChildrenUpdated | NodeState::Unchanged | NodeState::Skipped => {}
        }
        Ok(())
    }
}
