//! Refresh of one owner.

use crate::visitors::{ContentNodeVisitor, PoolNodeVisitor, ProductNodeVisitor};
use crate::{
    AnyNode, ContentMapper, NodeFactory, NodeMapper, NodeProcessor, NodeState, PoolMapper,
    ProductMapper, RefreshConfig, RefreshResult, Result,
};
use candlepin_model::{ContentInfo, Pool, ProductInfo, SourceSubscription, SubscriptionInfo};
use candlepin_storage::{ContentCurator, PoolCurator, ProductCurator};
use candlepin_types::OwnerId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects upstream data, then reconciles one owner's pools, products and
/// content against it.
pub struct RefreshWorker {
    pools: Arc<dyn PoolCurator>,
    products: Arc<dyn ProductCurator>,
    content: Arc<dyn ContentCurator>,
    config: RefreshConfig,
    pool_mapper: PoolMapper,
    product_mapper: ProductMapper,
    content_mapper: ContentMapper,
}

impl RefreshWorker {
    pub fn new(
        pools: Arc<dyn PoolCurator>,
        products: Arc<dyn ProductCurator>,
        content: Arc<dyn ContentCurator>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            pools,
            products,
            content,
            config,
            pool_mapper: PoolMapper::new(),
            product_mapper: ProductMapper::new(),
            content_mapper: ContentMapper::new(),
        }
    }

    /// Registers upstream subscriptions along with every product and content
    /// nested under them.
    pub fn add_subscriptions<It>(&mut self, subscriptions: It) -> Result<&mut Self>
    where
        It: IntoIterator<Item = SubscriptionInfo>,
    {
        for subscription in subscriptions {
            self.register_product(&subscription.product)?;
            self.pool_mapper.add_imported_entity(subscription)?;
        }
        Ok(self)
    }

    /// Registers upstream products, recursing into their derived and
    /// provided products and their content.
    pub fn add_products<It>(&mut self, products: It) -> Result<&mut Self>
    where
        It: IntoIterator<Item = ProductInfo>,
    {
        for product in products {
            self.register_product(&product)?;
        }
        Ok(self)
    }

    pub fn add_content<It>(&mut self, content: It) -> Result<&mut Self>
    where
        It: IntoIterator<Item = ContentInfo>,
    {
        self.content_mapper.add_imported_entities(content)?;
        Ok(self)
    }

    fn register_product(&mut self, product: &ProductInfo) -> Result<()> {
        for child in product.child_products() {
            self.register_product(child)?;
        }
        self.content_mapper
            .add_imported_entities(product.child_content().cloned())?;
        self.product_mapper.add_imported_entity(product.clone())?;
        Ok(())
    }

    pub fn pool_mapper(&self) -> &PoolMapper {
        &self.pool_mapper
    }

    pub fn product_mapper(&self) -> &ProductMapper {
        &self.product_mapper
    }

    pub fn content_mapper(&self) -> &ContentMapper {
        &self.content_mapper
    }

    /// Reconciles `owner_id` against everything registered so far.
    pub fn execute(&mut self, owner_id: OwnerId) -> Result<RefreshResult> {
        let existing_pools: Vec<Pool> = self
            .pools
            .list_by_owner(owner_id)?
            .into_iter()
            .filter(|p| {
                p.source_subscription
                    .as_ref()
                    .is_some_and(|s| s.sub_key == SourceSubscription::MASTER)
            })
            .collect();
        let pool_products: Vec<_> = existing_pools.iter().map(|p| p.product.clone()).collect();
        self.pool_mapper.add_existing_entities(existing_pools)?;

        let owner_products = self.products.products_by_owner(owner_id)?;
        let product_scope: BTreeSet<String> = owner_products.iter().map(|p| p.id.clone()).collect();
        self.product_mapper.add_existing_entities(owner_products)?;
        for product in pool_products {
            if self.product_mapper.existing_entity(&product.id).is_none() {
                self.product_mapper.add_existing_entity(product)?;
            }
        }

        let owner_content = self.content.content_by_owner(owner_id)?;
        let content_scope: BTreeSet<String> = owner_content.iter().map(|c| c.id.clone()).collect();
        self.content_mapper.add_existing_entities(owner_content)?;

        self.map_existing_children()?;

        if self
            .product_mapper
            .validate_existing_entities(product_scope.iter().map(String::as_str))
        {
            warn!(owner = %owner_id, "products outside the owner's catalog are referenced");
        }
        if self
            .content_mapper
            .validate_existing_entities(content_scope.iter().map(String::as_str))
        {
            warn!(owner = %owner_id, "content outside the owner's catalog is referenced");
        }

        let mut nodes = NodeFactory::build(
            owner_id,
            &self.pool_mapper,
            &self.product_mapper,
            &self.content_mapper,
        )?;
        let mut processor = NodeProcessor::new()
            .with_visitor(ContentNodeVisitor::new(self.content.clone()))
            .with_visitor(ProductNodeVisitor::new(
                self.products.clone(),
                self.config.orphaned_entity_grace_period,
            ))
            .with_visitor(PoolNodeVisitor::new(self.pools.clone()));
        let result = processor.process_nodes(&mut nodes)?;

        if self.product_mapper.is_dirty() {
            let mapping = standing_uuids(&nodes, |node| match node {
                AnyNode::Product(n) if n.state() != Some(NodeState::Deleted) => {
                    n.current().and_then(|p| p.uuid.clone()).map(|u| (n.id().to_owned(), u))
                }
                _ => None,
            });
            debug!(owner = %owner_id, products = mapping.len(), "rebuilding owner product mapping");
            self.products.rebuild_owner_product_mapping(owner_id, &mapping)?;
        }
        if self.content_mapper.is_dirty() {
            let mapping = standing_uuids(&nodes, |node| match node {
                AnyNode::Content(n) if n.state() != Some(NodeState::Deleted) => {
                    n.current().and_then(|c| c.uuid.clone()).map(|u| (n.id().to_owned(), u))
                }
                _ => None,
            });
            debug!(owner = %owner_id, content = mapping.len(), "rebuilding owner content mapping");
            self.content.rebuild_owner_content_mapping(owner_id, &mapping)?;
        }

        info!(owner = %owner_id, entities = result.len(), "refresh complete");
        Ok(result)
    }

    /// Maps persisted children of mapped products that the owner's catalog
    /// did not already supply, following references until none are new.
    fn map_existing_children(&mut self) -> Result<()> {
        loop {
            let mut product_uuids = BTreeSet::new();
            let mut content_uuids = BTreeSet::new();
            for (_, product) in self.product_mapper.existing_entities() {
                for child in product.derived_product.iter().chain(&product.provided_products) {
                    if self.product_mapper.existing_entity(&child.id).is_none() {
                        product_uuids.extend(child.uuid.clone());
                    }
                }
                for link in &product.product_content {
                    if self.content_mapper.existing_entity(&link.content.id).is_none() {
                        content_uuids.extend(link.content.uuid.clone());
                    }
                }
            }

            if !content_uuids.is_empty() {
                let uuids: Vec<String> = content_uuids.into_iter().collect();
                self.content_mapper
                    .add_existing_entities(self.content.content_by_uuids(&uuids)?)?;
            }
            if product_uuids.is_empty() {
                return Ok(());
            }
            let uuids: Vec<String> = product_uuids.into_iter().collect();
            let found = self.products.products_by_uuids(&uuids)?;
            if !self.product_mapper.add_existing_entities(found)? {
                return Ok(());
            }
        }
    }
}

fn standing_uuids<F>(nodes: &NodeMapper, select: F) -> BTreeMap<String, String>
where
    F: Fn(&AnyNode) -> Option<(String, String)>,
{
    nodes.nodes().filter_map(select).collect()
}
