use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::str::FromStr;

// ── PoolId ───────────────────────────────────────────────────────

#[test]
fn pool_id_new_is_unique() {
    assert_ne!(PoolId::new(), PoolId::new());
}

#[test]
fn pool_id_display_and_parse() {
    let id = PoolId::new();
    let parsed = PoolId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn pool_id_parse_invalid() {
    assert!(PoolId::parse("not-a-uuid").is_err());
    assert!(PoolId::from_str("garbage").is_err());
}

#[test]
fn pool_ids_order_by_creation() {
    let first = PoolId::new();
    let second = PoolId::new();
    let set: BTreeSet<_> = [second, first].into_iter().collect();
    assert_eq!(set.into_iter().next(), Some(first));
}

// ── Other ids ────────────────────────────────────────────────────

#[test]
fn entitlement_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(EntitlementId::from_uuid(uuid).as_uuid(), uuid);
}

#[test]
fn consumer_and_owner_ids_serialize_transparently() {
    let consumer = ConsumerId::new();
    let json = serde_json::to_string(&consumer).unwrap();
    assert_eq!(json, format!("\"{consumer}\""));

    let owner: OwnerId = serde_json::from_str(&format!("\"{}\"", consumer.as_uuid())).unwrap();
    assert_eq!(owner.as_uuid(), consumer.as_uuid());
}

proptest! {
    #[test]
    fn any_uuid_survives_display_and_parse(bytes in any::<[u8; 16]>()) {
        let uuid = uuid::Uuid::from_bytes(bytes);
        let pool = PoolId::from_uuid(uuid);
        prop_assert_eq!(PoolId::parse(&pool.to_string()).unwrap(), pool);
        let consumer = ConsumerId::from_uuid(uuid);
        prop_assert_eq!(ConsumerId::from_str(&consumer.to_string()).unwrap(), consumer);
    }
}
