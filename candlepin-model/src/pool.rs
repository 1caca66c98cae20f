//! Pools, their types and source subscriptions.

use crate::{product_attributes, Product, SubscriptionInfo};
use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known pool attribute names.
pub mod pool_attributes {
    pub const DERIVED_POOL: &str = "pool_derived";
    pub const DEVELOPMENT_POOL: &str = "dev_pool";
    pub const MULTI_ENTITLEMENT: &str = "multi-entitlement";
    pub const PHYSICAL_ONLY: &str = "physical_only";
    pub const REQUIRES_CONSUMER_TYPE: &str = "requires_consumer_type";
    pub const REQUIRES_HOST: &str = "requires_host";
    pub const SOURCE_POOL_ID: &str = "source_pool_id";
    pub const UNMAPPED_GUESTS_ONLY: &str = "unmapped_guests_only";
    pub const VIRT_ONLY: &str = "virt_only";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    #[default]
    Normal,
    EntitlementDerived,
    StackDerived,
    Bonus,
    UnmappedGuest,
    Development,
}

impl PoolType {
    pub fn is_derived_type(self) -> bool {
        matches!(self, Self::EntitlementDerived | Self::StackDerived)
    }
}

/// Links a pool to the upstream subscription it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSubscription {
    pub subscription_id: String,
    pub sub_key: String,
}

impl SourceSubscription {
    pub const MASTER: &'static str = "master";
    pub const DERIVED: &'static str = "derived";

    pub fn master(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            sub_key: Self::MASTER.to_string(),
        }
    }
}

/// Links a stack-derived pool to the consumer stack it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceStack {
    pub consumer_id: ConsumerId,
    pub stack_id: String,
}

/// A unit of grantable subscription inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// `None` until the pool is first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PoolId>,
    pub owner_id: OwnerId,
    #[serde(default, rename = "type")]
    pub pool_type: PoolType,
    pub product: Product,
    /// Negative means unlimited.
    pub quantity: i64,
    #[serde(default)]
    pub consumed: i64,
    #[serde(default)]
    pub exported: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_subscription: Option<SourceSubscription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_entitlement: Option<EntitlementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_stack: Option<SourceStack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_pool_id: Option<String>,
    /// Set while the current transaction holds a row lock on this pool.
    /// Never persisted.
    #[serde(skip)]
    pub locked: bool,
}

impl Pool {
    pub fn new(
        owner_id: OwnerId,
        product: Product,
        quantity: i64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            owner_id,
            pool_type: PoolType::Normal,
            product,
            quantity,
            consumed: 0,
            exported: 0,
            start_date,
            end_date,
            attributes: BTreeMap::new(),
            source_subscription: None,
            source_entitlement: None,
            source_stack: None,
            contract_number: None,
            account_number: None,
            order_number: None,
            upstream_pool_id: None,
            locked: false,
        }
    }

    /// Builds the master pool for an upstream subscription.
    pub fn from_subscription(owner_id: OwnerId, subscription: &SubscriptionInfo, product: Product) -> Self {
        let now = Utc::now();
        let quantity = subscription.pool_quantity(product.multiplier).unwrap_or(0);
        let mut pool = Self::new(
            owner_id,
            product,
            quantity,
            subscription.start_date.unwrap_or(now),
            subscription.end_date.unwrap_or(now),
        );
        pool.source_subscription = Some(SourceSubscription::master(subscription.id.clone()));
        pool.contract_number.clone_from(&subscription.contract_number);
        pool.account_number.clone_from(&subscription.account_number);
        pool.order_number.clone_from(&subscription.order_number);
        pool.upstream_pool_id.clone_from(&subscription.upstream_pool_id);
        pool
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Looks the attribute up on the product first, then on the pool.
    pub fn merged_attribute(&self, key: &str) -> Option<&str> {
        self.product.attribute(key).or_else(|| self.attribute(key))
    }

    pub fn has_merged_attribute(&self, key: &str) -> bool {
        self.merged_attribute(key).is_some()
    }

    fn attribute_is_true(&self, key: &str) -> bool {
        self.merged_attribute(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    pub fn is_unlimited(&self) -> bool {
        self.quantity < 0
    }

    /// True if `quantity` more entitlements can be consumed.
    pub fn entitlements_available(&self, quantity: i64) -> bool {
        self.is_unlimited() || self.consumed.saturating_add(quantity) <= self.quantity
    }

    pub fn is_overflowing(&self) -> bool {
        !self.is_unlimited() && self.consumed > self.quantity
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }

    pub fn stack_id(&self) -> Option<&str> {
        self.product.attribute(product_attributes::STACKING_ID)
    }

    pub fn is_stacked(&self) -> bool {
        self.stack_id().is_some()
    }

    pub fn is_derived(&self) -> bool {
        self.attribute(pool_attributes::DERIVED_POOL) == Some("true")
    }

    pub fn is_virt_only(&self) -> bool {
        self.attribute_is_true(pool_attributes::VIRT_ONLY)
    }

    pub fn is_physical_only(&self) -> bool {
        self.attribute_is_true(pool_attributes::PHYSICAL_ONLY)
    }

    pub fn is_multi_entitlement(&self) -> bool {
        self.merged_attribute(pool_attributes::MULTI_ENTITLEMENT)
            .is_some_and(|v| v.eq_ignore_ascii_case("yes") || v == "1")
    }

    pub fn is_host_limited(&self) -> bool {
        self.attribute_is_true(product_attributes::HOST_LIMITED)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.source_subscription
            .as_ref()
            .map(|s| s.subscription_id.as_str())
    }

    /// True if `subscription` would change this pool's quantity, window,
    /// or upstream identifiers.
    pub fn is_changed_by(&self, subscription: &SubscriptionInfo) -> bool {
        if subscription
            .pool_quantity(self.product.multiplier)
            .is_some_and(|q| q != self.quantity)
        {
            return true;
        }
        if subscription.start_date.is_some_and(|d| d != self.start_date)
            || subscription.end_date.is_some_and(|d| d != self.end_date)
        {
            return true;
        }
        (subscription.contract_number.is_some() && subscription.contract_number != self.contract_number)
            || (subscription.account_number.is_some() && subscription.account_number != self.account_number)
            || (subscription.order_number.is_some() && subscription.order_number != self.order_number)
            || (subscription.upstream_pool_id.is_some()
                && subscription.upstream_pool_id != self.upstream_pool_id)
            || subscription.product.id != self.product.id
    }

    /// Copies the fields `subscription` specifies onto this pool.
    pub fn apply(&mut self, subscription: &SubscriptionInfo) {
        if let Some(quantity) = subscription.pool_quantity(self.product.multiplier) {
            self.quantity = quantity;
        }
        if let Some(start) = subscription.start_date {
            self.start_date = start;
        }
        if let Some(end) = subscription.end_date {
            self.end_date = end;
        }
        if subscription.contract_number.is_some() {
            self.contract_number.clone_from(&subscription.contract_number);
        }
        if subscription.account_number.is_some() {
            self.account_number.clone_from(&subscription.account_number);
        }
        if subscription.order_number.is_some() {
            self.order_number.clone_from(&subscription.order_number);
        }
        if subscription.upstream_pool_id.is_some() {
            self.upstream_pool_id.clone_from(&subscription.upstream_pool_id);
        }
    }
}

/// A pool paired with a requested quantity of it.
///
/// During a bind the pool is replaced in place by its locked, reloaded copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolQuantity {
    pub pool: Pool,
    pub quantity: i64,
}

impl PoolQuantity {
    pub fn new(pool: Pool, quantity: i64) -> Self {
        Self { pool, quantity }
    }
}
