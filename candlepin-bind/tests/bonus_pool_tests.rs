mod common;

use candlepin_model::{
    pool_attributes, product_attributes, Consumer, ConsumerType, Entitlement, Pool, PoolType,
    Product, SourceSubscription,
};
use candlepin_storage::{ConsumerCurator, EntitlementCurator, PoolCurator};
use chrono::{Duration, Utc};
use common::Harness;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn virt_limited(id: &str, limit: &str) -> Product {
    Product::new(id, id.to_uppercase()).with_attribute(product_attributes::VIRT_LIMIT, limit)
}

fn derived_pools(h: &Harness) -> Vec<Pool> {
    h.store
        .list_by_owner(h.owner.id)
        .unwrap()
        .into_iter()
        .filter(Pool::is_derived)
        .collect()
}

// ── Standalone ───────────────────────────────────────────────────

#[test]
fn virt_limit_bind_creates_host_restricted_pool() {
    let h = Harness::new(true);
    let host = h.make_consumer(&ConsumerType::system());
    let pool = h.make_pool(virt_limited("rhel", "4"), 10);

    h.entitler()
        .entitle_by_pools(host.id, &BTreeMap::from([(pool.id.unwrap(), 1)]))
        .unwrap();

    let derived = derived_pools(&h);
    assert_eq!(derived.len(), 1);
    let bonus = &derived[0];
    assert_eq!(bonus.quantity, 4);
    assert_eq!(bonus.pool_type, PoolType::EntitlementDerived);
    assert_eq!(bonus.attribute(pool_attributes::REQUIRES_HOST), Some(host.uuid.as_str()));
    assert_eq!(
        bonus.attribute(pool_attributes::SOURCE_POOL_ID),
        Some(pool.id.unwrap().to_string().as_str())
    );

    let events = h.events.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_id, bonus.id.unwrap().to_string());
}

#[test]
fn stack_derived_pool_widens_to_cover_its_stack() {
    let h = Harness::new(true);
    let host = h.make_consumer(&ConsumerType::system());
    let stacked = |id: &str| virt_limited(id, "2").with_attribute(product_attributes::STACKING_ID, "s1");

    let first = h.make_pool(stacked("rhel-a"), 10);
    h.entitler()
        .entitle_by_pools(host.id, &BTreeMap::from([(first.id.unwrap(), 1)]))
        .unwrap();
    h.store.commit().unwrap();

    let derived = derived_pools(&h);
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].pool_type, PoolType::StackDerived);
    assert_eq!(derived[0].start_date, first.start_date);

    let mut second = h.make_pool(stacked("rhel-b"), 10);
    second.start_date = first.start_date - Duration::days(10);
    second.end_date = first.end_date + Duration::days(30);
    h.store.merge_pools(&[second.clone()]).unwrap();

    h.entitler()
        .entitle_by_pools(host.id, &BTreeMap::from([(second.id.unwrap(), 1)]))
        .unwrap();

    let derived = derived_pools(&h);
    assert_eq!(derived.len(), 1, "the stack keeps a single derived pool");
    assert_eq!(derived[0].start_date, second.start_date);
    assert_eq!(derived[0].end_date, second.end_date);
}

// ── Hosted ───────────────────────────────────────────────────────

#[test]
fn hosted_manifest_bind_shrinks_bonus_pool_and_revokes_overflow() {
    let h = Harness::new(false);
    let distributor = h.make_consumer(&ConsumerType::candlepin());
    let guest = h.make_consumer(&ConsumerType::system());
    let primary = h.make_pool(virt_limited("rhel", "2"), 10);

    let now = Utc::now();
    let mut bonus = Pool::new(h.owner.id, primary.product.clone(), 20, primary.start_date, primary.end_date)
        .with_attribute(pool_attributes::DERIVED_POOL, "true")
        .with_attribute(pool_attributes::VIRT_ONLY, "true");
    bonus.pool_type = PoolType::Bonus;
    bonus.consumed = 18;
    bonus.source_subscription = Some(SourceSubscription {
        subscription_id: "sub-1".into(),
        sub_key: SourceSubscription::DERIVED.into(),
    });
    let bonus_id = h.store.create_pools(vec![bonus]).unwrap()[0].id.unwrap();
    h.store.commit().unwrap();

    let guest_entitlements: Vec<Entitlement> = (1..=3)
        .map(|age| Entitlement {
            created: now - Duration::hours(age),
            ..Entitlement::draft(h.owner.id, guest.id, bonus_id, 6)
        })
        .collect();
    h.store.create_entitlements(&guest_entitlements).unwrap();
    h.store
        .merge_consumer(&Consumer {
            entitlement_count: 18,
            ..guest.clone()
        })
        .unwrap();

    h.entitler()
        .entitle_by_pools(distributor.id, &BTreeMap::from([(primary.id.unwrap(), 3)]))
        .unwrap();

    let bonus = h.stored_pool(bonus_id);
    assert_eq!(bonus.quantity, 14);
    assert_eq!(bonus.consumed, 12);

    let remaining: Vec<_> = h.store.list_by_pool(bonus_id).unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&guest_entitlements[0].id), "newest entitlement goes first");

    let guest = h.store.get_consumer(guest.id).unwrap().unwrap();
    assert_eq!(guest.entitlement_count, 12);
    assert_eq!(h.stored_pool(primary.id.unwrap()).exported, 3);
}

#[test]
fn revoking_the_binding_consumers_own_entitlements_keeps_its_count() {
    let h = Harness::new(false);
    let distributor = h.make_consumer(&ConsumerType::candlepin());
    let primary = h.make_pool(virt_limited("rhel", "2"), 10);

    let now = Utc::now();
    let mut bonus = Pool::new(h.owner.id, primary.product.clone(), 20, primary.start_date, primary.end_date)
        .with_attribute(pool_attributes::DERIVED_POOL, "true");
    bonus.pool_type = PoolType::Bonus;
    bonus.consumed = 18;
    bonus.source_subscription = Some(SourceSubscription {
        subscription_id: "sub-1".into(),
        sub_key: SourceSubscription::DERIVED.into(),
    });
    let bonus_id = h.store.create_pools(vec![bonus]).unwrap()[0].id.unwrap();
    h.store.commit().unwrap();

    let held: Vec<Entitlement> = (1..=3)
        .map(|age| Entitlement {
            created: now - Duration::hours(age),
            ..Entitlement::draft(h.owner.id, distributor.id, bonus_id, 6)
        })
        .collect();
    h.store.create_entitlements(&held).unwrap();
    h.store
        .merge_consumer(&Consumer {
            entitlement_count: 18,
            ..distributor.clone()
        })
        .unwrap();

    h.entitler()
        .entitle_by_pools(distributor.id, &BTreeMap::from([(primary.id.unwrap(), 3)]))
        .unwrap();

    let bonus = h.stored_pool(bonus_id);
    assert_eq!(bonus.quantity, 14);
    assert_eq!(bonus.consumed, 12);

    let held_total: i64 = h
        .store
        .list_by_consumer(distributor.id)
        .unwrap()
        .iter()
        .map(|e| e.quantity)
        .sum();
    assert_eq!(held_total, 15);
    let stored = h.store.get_consumer(distributor.id).unwrap().unwrap();
    assert_eq!(stored.entitlement_count, held_total);
    assert_eq!(stored.entitlement_status.as_deref(), Some("valid"));
}
