//! Builds the refresh node graph from mapped entities.

use crate::{
    ContentMapper, ContentNode, NodeKey, NodeMapper, PoolMapper, PoolNode, ProductMapper, ProductNode,
    RefreshError, Result,
};
use candlepin_model::Product;
use candlepin_types::OwnerId;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Builds the refresh graph from populated mappers.
pub struct NodeFactory;

impl NodeFactory {
    /// Creates one node per mapped id and links pools to their product and
    /// products to their derived product, provided products and content.
    /// Children come from the upstream version when there is one, else from
    /// the persisted version. Upstream children must all be mapped; persisted
    /// children that cannot be resolved are skipped.
    pub fn build(
        owner_id: OwnerId,
        pools: &PoolMapper,
        products: &ProductMapper,
        content: &ContentMapper,
    ) -> Result<NodeMapper> {
        let mut nodes = NodeMapper::new();

        for id in content.entity_ids() {
            nodes.add_node(ContentNode::new(
                owner_id,
                id,
                content.existing_entity(id).cloned(),
                content.imported_entity(id).cloned(),
            ))?;
        }
        for id in products.entity_ids() {
            nodes.add_node(ProductNode::new(
                owner_id,
                id,
                products.existing_entity(id).cloned(),
                products.imported_entity(id).cloned(),
            ))?;
        }
        for id in pools.entity_ids() {
            nodes.add_node(PoolNode::new(
                owner_id,
                id,
                pools.existing_entity(id).cloned(),
                pools.imported_entity(id).cloned(),
            ))?;
        }

        for id in pools.entity_ids() {
            let product_id = match (pools.imported_entity(id), pools.existing_entity(id)) {
                (Some(subscription), _) => subscription.product.id.as_str(),
                (None, Some(pool)) => pool.product.id.as_str(),
                (None, None) => continue,
            };
            link_child(&mut nodes, &NodeKey::pool(id), NodeKey::product(product_id))?;
        }

        for id in products.entity_ids() {
            let parent = NodeKey::product(id);
            match (products.imported_entity(id), products.existing_entity(id)) {
                (Some(info), _) => {
                    let children: BTreeSet<NodeKey> = info
                        .child_products()
                        .map(|p| NodeKey::product(p.id.as_str()))
                        .chain(info.child_content().map(|c| NodeKey::content(c.id.as_str())))
                        .collect();
                    for child in children {
                        link_child(&mut nodes, &parent, child)?;
                    }
                }
                (None, Some(product)) => {
                    // Persisted references that no longer resolve stay out of the graph.
                    for child in existing_children(product) {
                        if nodes.contains(&child) {
                            nodes.link(&parent, &child)?;
                        } else {
                            warn!(parent = %parent, child = %child, "skipping unresolvable child reference");
                        }
                    }
                }
                (None, None) => {}
            }
        }

        debug!(nodes = nodes.len(), "built refresh graph");
        Ok(nodes)
    }
}

fn existing_children(product: &Product) -> BTreeSet<NodeKey> {
    product
        .derived_product
        .iter()
        .chain(&product.provided_products)
        .map(|r| NodeKey::product(r.id.as_str()))
        .chain(
            product
                .product_content
                .iter()
                .map(|pc| NodeKey::content(pc.content.id.as_str())),
        )
        .collect()
}

fn link_child(nodes: &mut NodeMapper, parent: &NodeKey, child: NodeKey) -> Result<()> {
    if !nodes.contains(&child) {
        return Err(RefreshError::InvariantViolation(format!(
            "{parent} references unmapped child {child}"
        )));
    }
    nodes.link(parent, &child)
}
