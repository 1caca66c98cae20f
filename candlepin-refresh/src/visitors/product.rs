//! Product node processing.

use super::stateless;
use crate::{EntityKind, NodeKey, NodeMapper, NodeState, NodeVisitor, RefreshError, Result};
use candlepin_model::{EntityRef, Product, ProductContent, ProductInfo};
use candlepin_storage::ProductCurator;
use candlepin_types::OwnerId;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Refreshes products and rewrites their references to child products and
/// content.
///
/// Upstream products that lose every reference are deleted once they have
/// been orphaned for longer than the grace period. The orphan date is
/// recorded on the first refresh that finds them unreferenced and cleared
/// again if they are referenced later.
pub struct ProductNodeVisitor {
    products: Arc<dyn ProductCurator>,
    grace_period_days: i32,
    orphaned: Vec<(OwnerId, String)>,
    unorphaned: Vec<(OwnerId, String)>,
}

impl ProductNodeVisitor {
    pub fn new(products: Arc<dyn ProductCurator>, grace_period_days: i32) -> Self {
        Self {
            products,
            grace_period_days,
            orphaned: Vec::new(),
            unorphaned: Vec::new(),
        }
    }

    /// Decides whether an unreferenced, upstream-managed product may go now.
    /// Queues orphan date changes as a side effect.
    fn cleared_for_deletion(&mut self, owner_id: OwnerId, product: &Product, eligible: bool) -> bool {
        let uuid = product.uuid.clone().unwrap_or_default();
        if !eligible || self.grace_period_days < 0 {
            if product.orphaned_date.is_some() {
                self.unorphaned.push((owner_id, uuid));
            }
            return false;
        }
        if self.grace_period_days == 0 {
            return true;
        }
        match product.orphaned_date {
            None => {
                self.orphaned.push((owner_id, uuid));
                false
            }
            Some(orphaned) => {
                let cutoff = (Utc::now() - Duration::days(i64::from(self.grace_period_days))).date_naive();
                orphaned.date_naive() < cutoff
            }
        }
    }

    fn set_orphaned_dates(&self, entries: &[(OwnerId, String)], orphaned: bool) -> Result<()> {
        let now = Utc::now();
        for (owner_id, uuid) in entries {
            for mut product in self.products.products_by_uuids(std::slice::from_ref(uuid))? {
                product.orphaned_date = orphaned.then_some(now);
                self.products.merge_product(*owner_id, &product)?;
            }
        }
        Ok(())
    }
}

/// Reference to the version of child product `id` standing after this
/// refresh. The child must already have been processed.
fn product_ref(nodes: &NodeMapper, parent: &NodeKey, id: &str) -> Result<EntityRef> {
    let key = NodeKey::product(id);
    let node = nodes.product_node(&key).map_err(|_| {
        RefreshError::InvariantViolation(format!("{parent} references unmapped child {key}"))
    })?;
    if node.state().is_none() {
        return Err(RefreshError::InvariantViolation(format!(
            "{parent} resolved before its child {key}"
        )));
    }
    let uuid = node.current().and_then(|p| p.uuid.clone());
    Ok(EntityRef::new(id, uuid))
}

fn content_ref(nodes: &NodeMapper, parent: &NodeKey, id: &str) -> Result<EntityRef> {
    let key = NodeKey::content(id);
    let node = nodes.content_node(&key).map_err(|_| {
        RefreshError::InvariantViolation(format!("{parent} references unmapped child {key}"))
    })?;
    if node.state().is_none() {
        return Err(RefreshError::InvariantViolation(format!(
            "{parent} resolved before its child {key}"
        )));
    }
    let uuid = node.current().and_then(|c| c.uuid.clone());
    Ok(EntityRef::new(id, uuid))
}

/// Resolves a persisted reference, keeping it as stored when the graph does
/// not hold its target.
fn persisted_ref(
    nodes: &NodeMapper,
    parent: &NodeKey,
    stored: &EntityRef,
    key: NodeKey,
    resolve: fn(&NodeMapper, &NodeKey, &str) -> Result<EntityRef>,
) -> Result<EntityRef> {
    if nodes.contains(&key) {
        resolve(nodes, parent, &stored.id)
    } else {
        warn!(parent = %parent, child = %key, "keeping unresolvable child reference");
        Ok(stored.clone())
    }
}

/// Points `product`'s child references at the versions standing after this
/// refresh. Children the upstream version specifies replace the current
/// ones; unspecified children keep their ids.
fn resolve_children(
    nodes: &NodeMapper,
    key: &NodeKey,
    product: &mut Product,
    imported: Option<&ProductInfo>,
) -> Result<()> {
    let stored_product = |r: &EntityRef| {
        persisted_ref(nodes, key, r, NodeKey::product(r.id.as_str()), product_ref)
    };

    product.derived_product = match imported.and_then(|i| i.derived_product.as_deref()) {
        Some(derived) => Some(product_ref(nodes, key, &derived.id)?),
        None => product.derived_product.as_ref().map(stored_product).transpose()?,
    };

    product.provided_products = match imported.and_then(|i| i.provided_products.as_ref()) {
        Some(provided) => provided
            .iter()
            .map(|p| product_ref(nodes, key, &p.id))
            .collect::<Result<_>>()?,
        None => product
            .provided_products
            .iter()
            .map(stored_product)
            .collect::<Result<_>>()?,
    };

    product.product_content = match imported.and_then(|i| i.product_content.as_ref()) {
        Some(links) => links
            .iter()
            .map(|pc| {
                Ok(ProductContent {
                    content: content_ref(nodes, key, &pc.content.id)?,
                    enabled: pc.enabled,
                })
            })
            .collect::<Result<_>>()?,
        None => product
            .product_content
            .iter()
            .map(|pc| {
                let content_key = NodeKey::content(pc.content.id.as_str());
                Ok(ProductContent {
                    content: persisted_ref(nodes, key, &pc.content, content_key, content_ref)?,
                    enabled: pc.enabled,
                })
            })
            .collect::<Result<_>>()?,
    };
    Ok(())
}

impl NodeVisitor for ProductNodeVisitor {
    fn kind(&self) -> EntityKind {
        EntityKind::Product
    }

    fn process_node(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        if nodes.product_node(key)?.state().is_some() {
            return Ok(());
        }
        let children_changed = nodes.children_changed(key)?;
        let node = nodes.product_node_mut(key)?;

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
        let parents_deleted = nodes.parents_deleted(key)?;
        let node = nodes.product_node(key)?;
        let Some(existing) = node.existing() else {
            return Ok(());
        };
        let eligible = existing.locked && node.imported().is_none() && parents_deleted;
        let owner_id = node.owner_id();
        let existing = existing.clone();

        if self.cleared_for_deletion(owner_id, &existing, eligible) {
            debug!(product = %key.id, "product orphaned past its grace period");
            nodes.product_node_mut(key)?.set_state(NodeState::Deleted);
        }
        Ok(())
    }

    fn apply_changes(&mut self, nodes: &mut NodeMapper, key: &NodeKey) -> Result<()> {
        let node = nodes.product_node(key)?;
        let owner_id = node.owner_id();

        match node.state().ok_or_else(|| stateless(key))? {
            NodeState::Created => {
                let Some(imported) = node.imported() else {
                    return Err(RefreshError::InvariantViolation(format!(
                        "created node {key} has no upstream version"
                    )));
                };
                let mut product = Product::from_info(imported);
                resolve_children(nodes, key, &mut product, Some(imported))?;
                let created = self.products.create_product(owner_id, product)?;
                nodes.product_node_mut(key)?.set_merged(created);
            }
            state @ (NodeState::Updated | NodeState::ChildrenUpdated) => {
                let Some(existing) = node.existing() else {
                    return Err(RefreshError::InvariantViolation(format!(
                        "updated node {key} has no persisted version"
                    )));
                };
                let imported = node.imported();
                let mut merged = existing.clone();
                if let (NodeState::Updated, Some(info)) = (state, imported) {
                    merged.apply(info);
                }
                resolve_children(nodes, key, &mut merged, imported)?;
                self.products.merge_product(owner_id, &merged)?;
                nodes.product_node_mut(key)?.set_merged(merged);
            }
            NodeState::Deleted => {
                if let Some(uuid) = node.existing().and_then(|e| e.uuid.clone()) {
                    self.products.delete_product(owner_id, &uuid)?;
                }
            }
            NodeState::Unchanged | NodeState::Skipped => {}
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        if !self.orphaned.is_empty() {
            info!(count = self.orphaned.len(), "recording newly orphaned products");
        }
        self.set_orphaned_dates(&self.orphaned, true)?;
        self.set_orphaned_dates(&self.unorphaned, false)?;
        self.orphaned.clear();
        self.unorphaned.clear();
        Ok(())
    }
}
