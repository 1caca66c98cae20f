//! Domain model for the Candlepin entitlement core.
//!
//! Defines the entities every other subsystem operates on:
//! - [`Pool`] and [`PoolQuantity`]: grantable subscription inventory and a
//!   requested amount of it
//! - [`Entitlement`]: a grant of some quantity of a pool to a consumer
//! - [`Consumer`], [`ConsumerType`], [`Owner`]: who binds, and on whose behalf
//! - [`Product`] and [`Content`]: the upstream catalog pools are built from
//! - [`SubscriptionInfo`], [`ProductInfo`], [`ContentInfo`]: imported
//!   upstream data used by refresh
//!
//! These types carry no persistence logic; storage, policy, bind and refresh
//! all depend on them.

mod consumer;
mod content;
mod entitlement;
mod owner;
mod pool;
mod product;
mod upstream;

pub use consumer::{Consumer, ConsumerType};
pub use content::Content;
pub use entitlement::Entitlement;
pub use owner::Owner;
pub use pool::{pool_attributes, Pool, PoolQuantity, PoolType, SourceStack, SourceSubscription};
pub use product::{product_attributes, EntityRef, Product, ProductContent};
pub use upstream::{ContentInfo, ProductContentInfo, ProductInfo, SubscriptionInfo};
