#![allow(dead_code)]

use candlepin_model::{ContentInfo, Owner, ProductInfo, SubscriptionInfo};
use candlepin_refresh::{RefreshConfig, RefreshWorker};
use candlepin_storage::InMemoryStore;
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub owner: Owner,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::new());
        let owner = Owner::new("acme", "Acme Corp");
        store.add_owner(owner.clone()).unwrap();
        Self { store, owner }
    }

    pub fn worker(&self, grace_period_days: i32) -> RefreshWorker {
        RefreshWorker::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            RefreshConfig {
                orphaned_entity_grace_period: grace_period_days,
            },
        )
    }
}

pub fn make_content(id: &str, label: &str) -> ContentInfo {
    ContentInfo {
        name: Some(format!("{id} content")),
        label: Some(label.to_string()),
        content_type: Some("yum".to_string()),
        vendor: Some("Acme".to_string()),
        ..ContentInfo::new(id)
    }
}

/// A product with one content set and one provided product.
pub fn make_product(id: &str) -> ProductInfo {
    ProductInfo::new(id)
        .with_name(id.to_uppercase())
        .with_content(make_content(&format!("{id}-repo"), &format!("{id}-rpms")), true)
        .with_provided_product(ProductInfo::new(format!("{id}-eng")).with_name("Engineering"))
}

pub fn make_subscription(id: &str, product: ProductInfo, quantity: i64) -> SubscriptionInfo {
    SubscriptionInfo::new(id, product, quantity)
}
