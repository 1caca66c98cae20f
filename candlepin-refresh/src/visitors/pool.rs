//! Pool node processing.

use super::stateless;
use crate::{EntityKind, NodeKey, NodeMapper, NodeState, NodeVisitor, RefreshError, Result};
use candlepin_model::{Pool, Product};
use candlepin_storage::PoolCurator;
use candlepin_types::PoolId;
use std::sync::Arc;
use tracing::{debug, info};

/// Refreshes subscription pools. Existing pools are locked and reloaded
/// before they are written.
pub struct PoolNodeVisitor {
    pools: Arc<dyn PoolCurator>,
}

impl PoolNodeVisitor {
    pub fn new(pools: Arc<dyn PoolCurator>) -> Self {
        Self { pools }
    }

    fn lock(&self, key: &NodeKey, pool_id: Option<PoolId>) -> Result<Pool> {
        let id = pool_id.ok_or_else(|| {
            RefreshError::InvariantViolation(format!("existing pool for {key} has no id"))
        })?;
        self.pools
            .lock_pools(&[id])?
            .into_iter()
            .next()
            .ok_or_else(|| RefreshError::InvariantViolation(format!("pool {id} vanished during refresh")))
    }
}

/// The product version standing after this refresh for the pool at `key`.
fn resolved_product(nodes: &NodeMapper, key: &NodeKey) -> Result<Product> {
    let node = nodes.pool_node(key)?;
    let product_id = node
        .imported()
        .map(|s| s.product.id.as_str())
        .or_else(|| node.existing().map(|p| p.product.id.as_str()))
        .ok_or_else(|| RefreshError::InvariantViolation(format!("pool node {key} has no product")))?;

    let child_key = NodeKey::product(product_id);
    let child = nodes.product_node(&child_key).map_err(|_| {
        RefreshError::InvariantViolation(format!("{key} references unmapped child {child_key}"))
    })?;
    if child.state().is_none() {
        return Err(RefreshError::InvariantViolation(format!(
            "{key} resolved before its child {child_key}"
        )));
    }
    child.current().cloned().ok_or_else(|| {
        RefreshError::InvariantViolation(format!("child {child_key} has no product version"))
    })
}

impl NodeVisitor for PoolNodeVisitor {
    fn kind(&self) -> EntityKind {
        EntityKind::Pool
    }

    fn process_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        if nodes.pool_node(key)?.state().is_some() {
            return Ok(());
        }
        let children_changed = nodes.children_changed(key)?;
        let node = nodes.pool_node_mut(key)?;

        let state = match (node.existing(), node.imported()) {
            (Some(existing), Some(imported)) if existing.is_changed_by(imported) => NodeState::Updated,
            (Some(_), _) if children_changed => NodeState::ChildrenUpdated,
            (Some(_), _) => NodeState::Unchanged,
            (None, Some(_)) => NodeState::Created,
            (None, None) => NodeState::Skipped,
        };
        node.set_state(state);
        Ok(())
    }

    fn prune_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let node = nodes.pool_node_mut(key)?;
        let orphaned = node.imported().is_none()
            && node
                .existing()
                .is_some_and(|p| p.subscription_id().is_some());
        if orphaned {
            debug!(subscription = %key.id, "subscription gone upstream");
            node.set_state(NodeState::Deleted);
        }
        Ok(())
    }

    fn apply_changes(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let state = nodes.pool_node(key)?.state().ok_or_else(|| stateless(key))?;

        match state {
            NodeState::Created => {
                let product = resolved_product(nodes, key)?;
                let node = nodes.pool_node(key)?;
                let Some(subscription) = node.imported() else {
                    return Err(RefreshError::InvariantViolation(format!(
                        "created node {key} has no upstream version"
                    )));
                };
                let pool = Pool::from_subscription(node.owner_id(), subscription, product);
                let created = self.pools.create_pools(vec![pool])?;
                if let Some(pool) = created.into_iter().next() {
                    nodes.pool_node_mut(key)?.set_merged(pool);
                }
            }
            NodeState::Updated | NodeState::ChildrenUpdated => {
                let product = resolved_product(nodes, key)?;
                let node = nodes.pool_node(key)?;
                let mut pool = self.lock(key, node.existing().and_then(|p| p.id))?;
                if let (NodeState::Updated, Some(subscription)) = (state, node.imported()) {
                    pool.apply(subscription);
                }
                pool.product = product;
                self.pools.merge_pools(std::slice::from_ref(&pool))?;
                nodes.pool_node_mut(key)?.set_merged(pool);
            }
            NodeState::Deleted => {
                let node = nodes.pool_node(key)?;
                let ids: Vec<PoolId> = self
                    .pools
                    .list_by_subscription(node.owner_id(), &key.id)?
                    .into_iter()
                    .filter_map(|p| p.id)
                    .collect();
                info!(subscription = %key.id, pools = ids.len(), "deleting subscription pools");
                self.pools.delete_pools(&ids)?;
            }
            NodeState::Unchanged | NodeState::Skipped => {}
        }
        Ok(())
    }
}
