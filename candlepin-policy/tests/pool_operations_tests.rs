use candlepin_model::{Pool, Product};
use candlepin_policy::PoolOperations;
use candlepin_types::{OwnerId, PoolId};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

fn make_saved_pool(quantity: i64) -> Pool {
    let now = Utc::now();
    let mut pool = Pool::new(
        OwnerId::new(),
        Product::new("prod", "Product"),
        quantity,
        now,
        now + Duration::days(1),
    );
    pool.id = Some(PoolId::new());
    pool
}

#[test]
fn update_quantity_last_write_wins() {
    let pool = make_saved_pool(10);
    let mut ops = PoolOperations::new();
    ops.update_quantity(pool.clone(), 7);
    ops.update_quantity(pool.clone(), 3);

    assert_eq!(ops.quantity_target(pool.id.unwrap()), Some(3));
    assert_eq!(ops.updates().count(), 1);
}

#[test]
fn update_quantity_ignores_unsaved_pool() {
    let mut pool = make_saved_pool(10);
    pool.id = None;
    let mut ops = PoolOperations::new();
    ops.update_quantity(pool, 1);
    assert!(ops.is_empty());
}

#[test]
fn create_pool_appends_in_order() {
    let mut ops = PoolOperations::new();
    let a = make_saved_pool(1);
    let b = make_saved_pool(2);
    ops.create_pool(a.clone());
    ops.create_pool(b.clone());
    assert_eq!(ops.creations(), [a, b]);
}

#[test]
fn append_overwrites_on_collision() {
    let shared = make_saved_pool(10);
    let only_left = make_saved_pool(5);

    let mut left = PoolOperations::new();
    left.update_quantity(shared.clone(), 1);
    left.update_quantity(only_left.clone(), 4);

    let mut right = PoolOperations::new();
    right.update_quantity(shared.clone(), 9);
    right.create_pool(make_saved_pool(3));

    left.append(right);
    assert_eq!(left.quantity_target(shared.id.unwrap()), Some(9));
    assert_eq!(left.quantity_target(only_left.id.unwrap()), Some(4));
    assert_eq!(left.creations().len(), 1);
}

#[test]
fn into_parts_splits_ledger() {
    let pool = make_saved_pool(10);
    let mut ops = PoolOperations::new();
    ops.create_pool(make_saved_pool(1));
    ops.update_quantity(pool.clone(), 2);

    let (creations, updates) = ops.into_parts();
    assert_eq!(creations.len(), 1);
    assert_eq!(updates.get(&pool.id.unwrap()).map(|(_, q)| *q), Some(2));
}
