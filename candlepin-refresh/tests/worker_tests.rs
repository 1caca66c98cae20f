mod common;

use candlepin_model::{EntityRef, Owner, Pool, Product, ProductContent, ProductInfo, SourceSubscription};
use candlepin_refresh::{EntityKind, EntityState, RefreshConfig, RefreshError};
use candlepin_storage::{ContentCurator, PoolCurator, ProductCurator};
use chrono::{Duration, Utc};
use common::{Fixture, make_content, make_product, make_subscription};
use pretty_assertions::assert_eq;

fn master_pool(fx: &Fixture) -> Pool {
    let mut pools = fx.store.list_by_owner(fx.owner.id).unwrap();
    assert_eq!(pools.len(), 1);
    pools.remove(0)
}

#[test]
fn first_refresh_creates_the_whole_tree() {
    let fx = Fixture::new();
    let mut worker = fx.worker(-1);
    worker
        .add_subscriptions([make_subscription("sub-1", make_product("sku"), 10)])
        .unwrap();

    let result = worker.execute(fx.owner.id).unwrap();

    assert_eq!(result.count(EntityState::Created), 4);
    assert_eq!(result.state(EntityKind::Pool, "sub-1"), Some(EntityState::Created));
    assert_eq!(result.state(EntityKind::Content, "sku-repo"), Some(EntityState::Created));

    let pool = master_pool(&fx);
    assert_eq!(pool.quantity, 10);
    assert_eq!(pool.subscription_id(), Some("sub-1"));

    let products = fx.store.products_by_owner(fx.owner.id).unwrap();
    let eng = products.iter().find(|p| p.id == "sku-eng").unwrap();
    let content = fx.store.content_by_owner(fx.owner.id).unwrap();
    assert_eq!(pool.product.provided_products, vec![eng.reference()]);
    assert_eq!(pool.product.product_content[0].content, content[0].reference());
}

#[test]
fn repeated_refresh_changes_nothing() {
    let fx = Fixture::new();
    let subscription = make_subscription("sub-1", make_product("sku"), 10);
    fx.worker(-1)
        .add_subscriptions([subscription.clone()])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();
    let before = master_pool(&fx);

    let result = fx
        .worker(-1)
        .add_subscriptions([subscription])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();

    assert_eq!(result.count(EntityState::Unchanged), 4);
    assert_eq!(result.len(), 4);
    assert_eq!(master_pool(&fx), before);
}

#[test]
fn upstream_changes_propagate_to_parents_without_losing_consumption() {
    let fx = Fixture::new();
    fx.worker(-1)
        .add_subscriptions([make_subscription("sub-1", make_product("sku"), 10)])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();
    let mut pool = master_pool(&fx);
    pool.consumed = 3;
    fx.store.merge_pools(std::slice::from_ref(&pool)).unwrap();

    let changed = ProductInfo::new("sku")
        .with_name("SKU")
        .with_content(make_content("sku-repo", "sku-rpms-v2"), true)
        .with_provided_product(ProductInfo::new("sku-eng").with_name("Engineering"));
    let result = fx
        .worker(-1)
        .add_subscriptions([make_subscription("sub-1", changed, 20)])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();

    assert_eq!(result.state(EntityKind::Content, "sku-repo"), Some(EntityState::Updated));
    assert_eq!(result.state(EntityKind::Product, "sku"), Some(EntityState::Updated));
    assert_eq!(result.state(EntityKind::Product, "sku-eng"), Some(EntityState::Unchanged));
    assert_eq!(result.state(EntityKind::Pool, "sub-1"), Some(EntityState::Updated));

    let updated = master_pool(&fx);
    assert_eq!(updated.id, pool.id);
    assert_eq!(updated.quantity, 20);
    assert_eq!(updated.consumed, 3);
    let content = fx.store.content_by_owner(fx.owner.id).unwrap();
    assert_eq!(content[0].label, "sku-rpms-v2");
}

#[test]
fn dropped_subscription_removes_its_upstream_tree() {
    let fx = Fixture::new();
    fx.worker(0)
        .add_subscriptions([make_subscription("sub-1", make_product("sku"), 10)])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();

    let result = fx.worker(0).execute(fx.owner.id).unwrap();

    assert_eq!(result.count(EntityState::Deleted), 4);
    assert!(fx.store.list_by_owner(fx.owner.id).unwrap().is_empty());
    assert!(fx.store.products_by_owner(fx.owner.id).unwrap().is_empty());
    assert!(fx.store.content_by_owner(fx.owner.id).unwrap().is_empty());
}

#[test]
fn dropped_subscription_keeps_products_inside_the_grace_period() {
    let fx = Fixture::new();
    fx.worker(30)
        .add_subscriptions([make_subscription("sub-1", make_product("sku"), 10)])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();

    let result = fx.worker(30).execute(fx.owner.id).unwrap();

    assert_eq!(result.state(EntityKind::Pool, "sub-1"), Some(EntityState::Deleted));
    assert_eq!(result.state(EntityKind::Product, "sku"), Some(EntityState::Unchanged));
    assert_eq!(result.state(EntityKind::Content, "sku-repo"), Some(EntityState::Unchanged));
    let sku = fx
        .store
        .products_by_owner(fx.owner.id)
        .unwrap()
        .into_iter()
        .find(|p| p.id == "sku")
        .unwrap();
    assert!(sku.orphaned_date.is_some());
}

#[test]
fn standalone_products_and_content_are_refreshed() {
    let fx = Fixture::new();
    let mut worker = fx.worker(-1);
    worker
        .add_products([ProductInfo::new("addon").with_name("Add-on")])
        .unwrap()
        .add_content([make_content("extras", "extras-rpms")])
        .unwrap();

    assert!(worker.product_mapper().imported_entity("addon").is_some());
    assert!(worker.content_mapper().imported_entity("extras").is_some());
    assert!(worker.pool_mapper().entity_ids().is_empty());

    let result = worker.execute(fx.owner.id).unwrap();

    assert_eq!(result.state(EntityKind::Product, "addon"), Some(EntityState::Created));
    assert_eq!(result.state(EntityKind::Content, "extras"), Some(EntityState::Created));
}

#[test]
fn products_outside_the_catalog_are_mapped_into_it() {
    let fx = Fixture::new();
    let other = Owner::new("other", "Other Org");
    fx.store.add_owner(other.clone()).unwrap();
    let shared = fx
        .store
        .create_product(
            other.id,
            Product {
                locked: true,
                ..Product::new("sku", "SKU")
            },
        )
        .unwrap();
    let now = Utc::now();
    let mut pool = Pool::new(fx.owner.id, shared.clone(), 10, now, now + Duration::days(30));
    pool.source_subscription = Some(SourceSubscription::master("sub-1"));
    fx.store.create_pools(vec![pool]).unwrap();
    fx.store.commit().unwrap();
    assert!(fx.store.products_by_owner(fx.owner.id).unwrap().is_empty());

    let mut worker = fx.worker(-1);
    worker
        .add_subscriptions([make_subscription(
            "sub-1",
            ProductInfo::new("sku").with_name("SKU"),
            10,
        )])
        .unwrap();
    let result = worker.execute(fx.owner.id).unwrap();

    assert_eq!(result.state(EntityKind::Product, "sku"), Some(EntityState::Unchanged));
    assert!(worker.product_mapper().is_dirty_id("sku"));
    let catalog = fx.store.products_by_owner(fx.owner.id).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].uuid, shared.uuid);
}

fn product_with_dangling_children(fx: &Fixture) -> Product {
    fx.store
        .create_product(
            fx.owner.id,
            Product {
                locked: true,
                provided_products: vec![EntityRef::new("ghost", None)],
                product_content: vec![ProductContent {
                    content: EntityRef::new("lost-repo", Some("no-such-uuid".into())),
                    enabled: true,
                }],
                ..Product::new("sku", "SKU")
            },
        )
        .unwrap()
}

#[test]
fn unresolvable_persisted_children_are_skipped() {
    let fx = Fixture::new();
    let stored = product_with_dangling_children(&fx);

    let result = fx.worker(-1).execute(fx.owner.id).unwrap();

    assert_eq!(result.state(EntityKind::Product, "sku"), Some(EntityState::Unchanged));
    assert_eq!(result.state(EntityKind::Product, "ghost"), None);
    assert_eq!(result.state(EntityKind::Content, "lost-repo"), None);
    let catalog = fx.store.products_by_owner(fx.owner.id).unwrap();
    assert_eq!(catalog, vec![stored]);
}

#[test]
fn updated_product_keeps_unresolvable_persisted_children() {
    let fx = Fixture::new();
    let stored = product_with_dangling_children(&fx);

    let result = fx
        .worker(-1)
        .add_products([ProductInfo::new("sku").with_name("SKU v2")])
        .unwrap()
        .execute(fx.owner.id)
        .unwrap();

    assert_eq!(result.state(EntityKind::Product, "sku"), Some(EntityState::Updated));
    let catalog = fx.store.products_by_owner(fx.owner.id).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].name.as_deref(), Some("SKU v2"));
    assert_eq!(catalog[0].provided_products, stored.provided_products);
    assert_eq!(catalog[0].product_content, stored.product_content);
}

#[test]
fn subscription_without_an_id_is_rejected() {
    let fx = Fixture::new();
    let err = fx
        .worker(-1)
        .add_subscriptions([make_subscription("", make_product("sku"), 1)])
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, RefreshError::InvalidArgument(_)));
}

#[test]
fn grace_period_is_read_from_json() {
    assert_eq!(RefreshConfig::from_json("{}").unwrap(), RefreshConfig::default());
    assert_eq!(RefreshConfig::default().orphaned_entity_grace_period, -1);

    let config = RefreshConfig::from_json(r#"{"orphaned_entity_grace_period": 7}"#).unwrap();
    assert_eq!(config.orphaned_entity_grace_period, 7);

    assert!(matches!(
        RefreshConfig::from_json(r#"{"orphaned_entity_grace_period": "soon"}"#),
        Err(RefreshError::Config(_))
    ));
}
