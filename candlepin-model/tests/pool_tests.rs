use candlepin_model::{
    pool_attributes, product_attributes, Pool, PoolType, Product, ProductInfo, SourceSubscription,
    SubscriptionInfo,
};
use candlepin_types::OwnerId;
use chrono::{Duration, Utc};

fn make_pool(quantity: i64) -> Pool {
    let now = Utc::now();
    Pool::new(
        OwnerId::new(),
        Product::new("prod-1", "Product One"),
        quantity,
        now - Duration::days(1),
        now + Duration::days(365),
    )
}

// ── Quantity ─────────────────────────────────────────────────────

#[test]
fn negative_quantity_is_unlimited() {
    let pool = make_pool(-1);
    assert!(pool.is_unlimited());
    assert!(pool.entitlements_available(1_000_000));
    assert!(!pool.is_overflowing());
}

#[test]
fn entitlements_available_respects_consumed() {
    let mut pool = make_pool(5);
    pool.consumed = 4;
    assert!(pool.entitlements_available(1));
    assert!(!pool.entitlements_available(2));
}

#[test]
fn overflowing_when_consumed_exceeds_quantity() {
    let mut pool = make_pool(2);
    pool.consumed = 3;
    assert!(pool.is_overflowing());
}

#[test]
fn expired_after_end_date() {
    let pool = make_pool(1);
    assert!(!pool.is_expired(Utc::now()));
    assert!(pool.is_expired(Utc::now() + Duration::days(400)));
}

// ── Attributes ───────────────────────────────────────────────────

#[test]
fn merged_attribute_prefers_product() {
    let mut pool = make_pool(1).with_attribute(product_attributes::VIRT_LIMIT, "2");
    assert_eq!(pool.merged_attribute(product_attributes::VIRT_LIMIT), Some("2"));

    pool.product = pool
        .product
        .clone()
        .with_attribute(product_attributes::VIRT_LIMIT, "8");
    assert_eq!(pool.merged_attribute(product_attributes::VIRT_LIMIT), Some("8"));
}

#[test]
fn stack_id_comes_from_product() {
    let mut pool = make_pool(1);
    assert!(!pool.is_stacked());
    pool.product = pool
        .product
        .clone()
        .with_attribute(product_attributes::STACKING_ID, "stack-a");
    assert_eq!(pool.stack_id(), Some("stack-a"));
}

#[test]
fn flag_attributes() {
    let pool = make_pool(1)
        .with_attribute(pool_attributes::DERIVED_POOL, "true")
        .with_attribute(pool_attributes::VIRT_ONLY, "true")
        .with_attribute(pool_attributes::MULTI_ENTITLEMENT, "yes");
    assert!(pool.is_derived());
    assert!(pool.is_virt_only());
    assert!(pool.is_multi_entitlement());
    assert!(!pool.is_physical_only());
}

#[test]
fn derived_pool_types() {
    assert!(PoolType::StackDerived.is_derived_type());
    assert!(PoolType::EntitlementDerived.is_derived_type());
    assert!(!PoolType::Bonus.is_derived_type());
}

// ── Subscriptions ────────────────────────────────────────────────

#[test]
fn from_subscription_scales_by_multiplier() {
    let mut product = ProductInfo::new("prod-1").with_name("Product One");
    product.multiplier = Some(4);
    let sub = SubscriptionInfo::new("sub-1", product, 10);

    let pool = Pool::from_subscription(OwnerId::new(), &sub, Product::new("prod-1", "Product One"));
    assert_eq!(pool.quantity, 40);
    assert_eq!(pool.subscription_id(), Some("sub-1"));
    assert_eq!(
        pool.source_subscription.as_ref().map(|s| s.sub_key.as_str()),
        Some(SourceSubscription::MASTER)
    );
}

#[test]
fn subscription_change_detection() {
    let sub = SubscriptionInfo::new("sub-1", ProductInfo::new("prod-1"), 10);
    let mut pool = Pool::from_subscription(OwnerId::new(), &sub, Product::new("prod-1", "P"));
    assert!(!pool.is_changed_by(&sub));

    let mut bigger = sub.clone();
    bigger.quantity = Some(20);
    assert!(pool.is_changed_by(&bigger));

    pool.apply(&bigger);
    assert_eq!(pool.quantity, 20);
    assert!(!pool.is_changed_by(&bigger));
}
