//! Curator traits consumed by the bind and refresh engines.

use crate::StorageResult;
use candlepin_model::{Consumer, ConsumerType, Content, Entitlement, Owner, Pool, Product};
use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use std::collections::{BTreeMap, BTreeSet};

pub trait OwnerCurator: Send + Sync {
    fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>>;
}

pub trait ConsumerCurator: Send + Sync {
    fn get_consumer(&self, id: ConsumerId) -> StorageResult<Option<Consumer>>;

    fn get_consumer_type(&self, label: &str) -> StorageResult<Option<ConsumerType>>;

    /// Finds the hypervisor currently reporting `guest` by its virt uuid.
    fn get_host(&self, guest: &Consumer) -> StorageResult<Option<Consumer>>;

    /// Takes a row lock on the consumer and returns a fresh copy.
    fn lock_consumer(&self, id: ConsumerId) -> StorageResult<Consumer>;

    fn merge_consumer(&self, consumer: &Consumer) -> StorageResult<()>;
}

pub trait PoolCurator: Send + Sync {
    /// Loads the pools with the given ids. Unknown ids are left out.
    fn get_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>>;

    /// Takes row locks on the given pools and returns reloaded copies with
    /// `locked` set.
    fn lock_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>>;

    /// Persists new pools in one batch. Pools without an id are assigned one.
    /// The returned pools are locked by the current transaction.
    fn create_pools(&self, pools: Vec<Pool>) -> StorageResult<Vec<Pool>>;

    fn merge_pools(&self, pools: &[Pool]) -> StorageResult<()>;

    fn delete_pools(&self, ids: &[PoolId]) -> StorageResult<()>;

    fn list_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Pool>>;

    /// Every pool created from the given subscription, master and derived.
    fn list_by_subscription(&self, owner_id: OwnerId, subscription_id: &str) -> StorageResult<Vec<Pool>>;

    /// Stack-derived pools serving `consumer_id` for any of `stack_ids`.
    fn sub_pools_for_stack_ids(
        &self,
        consumer_id: ConsumerId,
        stack_ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Pool>>;
}

pub trait EntitlementCurator: Send + Sync {
    fn create_entitlements(&self, entitlements: &[Entitlement]) -> StorageResult<()>;

    fn merge_entitlements(&self, entitlements: &[Entitlement]) -> StorageResult<()>;

    fn delete_entitlements(&self, ids: &[EntitlementId]) -> StorageResult<()>;

    fn list_by_consumer(&self, consumer_id: ConsumerId) -> StorageResult<Vec<Entitlement>>;

    fn list_by_pool(&self, pool_id: PoolId) -> StorageResult<Vec<Entitlement>>;
}

/// Products are stored once per version (uuid) and mapped into owner
/// catalogs by upstream id.
pub trait ProductCurator: Send + Sync {
    fn products_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Product>>;

    fn products_by_uuids(&self, uuids: &[String]) -> StorageResult<Vec<Product>>;

    /// Persists a new product version, assigns its uuid and maps it into the
    /// owner's catalog.
    fn create_product(&self, owner_id: OwnerId, product: Product) -> StorageResult<Product>;

    fn merge_product(&self, owner_id: OwnerId, product: &Product) -> StorageResult<()>;

    /// Removes the product from the owner's catalog, and the row itself once
    /// no owner maps it.
    fn delete_product(&self, owner_id: OwnerId, uuid: &str) -> StorageResult<()>;

    /// Replaces the owner's id-to-uuid catalog mapping.
    fn rebuild_owner_product_mapping(
        &self,
        owner_id: OwnerId,
        mapping: &BTreeMap<String, String>,
    ) -> StorageResult<()>;
}

pub trait ContentCurator: Send + Sync {
    fn content_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Content>>;

    fn content_by_uuids(&self, uuids: &[String]) -> StorageResult<Vec<Content>>;

    fn create_content(&self, owner_id: OwnerId, content: Content) -> StorageResult<Content>;

    fn merge_content(&self, owner_id: OwnerId, content: &Content) -> StorageResult<()>;

    fn delete_content(&self, owner_id: OwnerId, uuid: &str) -> StorageResult<()>;

    fn rebuild_owner_content_mapping(
        &self,
        owner_id: OwnerId,
        mapping: &BTreeMap<String, String>,
    ) -> StorageResult<()>;
}
