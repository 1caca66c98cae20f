//! Entitlements granted to consumers.

use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grant of `quantity` of a pool to a consumer.
///
/// The pool is referenced by id only. Code that needs the pool alongside
/// the entitlement receives both explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub owner_id: OwnerId,
    pub consumer_id: ConsumerId,
    pub pool_id: PoolId,
    pub quantity: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub certificate_serials: Vec<u64>,
}

impl Entitlement {
    /// Builds an unpersisted draft with a freshly generated id.
    pub fn draft(owner_id: OwnerId, consumer_id: ConsumerId, pool_id: PoolId, quantity: i64) -> Self {
        let now = Utc::now();
        Self {
            id: EntitlementId::new(),
            owner_id,
            consumer_id,
            pool_id,
            quantity,
            created: now,
            updated: now,
            certificate_serials: Vec::new(),
        }
    }
}
