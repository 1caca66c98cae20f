//! In-memory implementation of every curator.
//!
//! All state sits behind one mutex, so each curator call is atomic. Row
//! locks are bookkeeping only: they are recorded when taken and released by
//! [`InMemoryStore::commit`], which lets callers and tests observe exactly
//! what a transaction locked.

use crate::{
    ConsumerCurator, ContentCurator, EntitlementCurator, OwnerCurator, PoolCurator, ProductCurator,
    StorageError, StorageResult,
};
use candlepin_model::{Consumer, ConsumerType, Content, Entitlement, Owner, Pool, Product};
use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct State {
    owners: HashMap<OwnerId, Owner>,
    consumers: HashMap<ConsumerId, Consumer>,
    consumer_types: HashMap<String, ConsumerType>,
    pools: BTreeMap<PoolId, Pool>,
    entitlements: BTreeMap<EntitlementId, Entitlement>,
    products: HashMap<String, Product>,
    owner_products: HashMap<OwnerId, BTreeMap<String, String>>,
    content: HashMap<String, Content>,
    owner_content: HashMap<OwnerId, BTreeMap<String, String>>,
    pool_locks: BTreeSet<PoolId>,
    consumer_locks: BTreeSet<ConsumerId>,
}

/// Thread-safe in-memory store.
pub struct InMemoryStore {
    state: Mutex<State>,
}

fn new_uuid() -> String {
    Uuid::now_v7().simple().to_string()
}

impl InMemoryStore {
    /// Creates an empty store with the standard consumer types registered.
    pub fn new() -> Self {
        let mut state = State::default();
        for ctype in [
            ConsumerType::system(),
            ConsumerType::hypervisor(),
            ConsumerType::candlepin(),
        ] {
            state.consumer_types.insert(ctype.label.clone(), ctype);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn add_owner(&self, owner: Owner) -> StorageResult<()> {
        self.state.lock()?.owners.insert(owner.id, owner);
        Ok(())
    }

    pub fn add_consumer(&self, consumer: Consumer) -> StorageResult<()> {
        self.state.lock()?.consumers.insert(consumer.id, consumer);
        Ok(())
    }

    pub fn add_consumer_type(&self, consumer_type: ConsumerType) -> StorageResult<()> {
        self.state
            .lock()?
            .consumer_types
            .insert(consumer_type.label.clone(), consumer_type);
        Ok(())
    }

    /// Pool ids currently locked by the open transaction.
    pub fn held_pool_locks(&self) -> StorageResult<BTreeSet<PoolId>> {
        Ok(self.state.lock()?.pool_locks.clone())
    }

    pub fn held_consumer_locks(&self) -> StorageResult<BTreeSet<ConsumerId>> {
        Ok(self.state.lock()?.consumer_locks.clone())
    }

    /// Ends the current transaction, releasing every row lock.
    pub fn commit(&self) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        debug!(
            pools = state.pool_locks.len(),
            consumers = state.consumer_locks.len(),
            "releasing row locks"
        );
        state.pool_locks.clear();
        state.consumer_locks.clear();
        Ok(())
    }

    pub fn pool(&self, id: PoolId) -> StorageResult<Option<Pool>> {
        Ok(self.state.lock()?.pools.get(&id).cloned())
    }

    pub fn entitlement_count(&self) -> StorageResult<usize> {
        Ok(self.state.lock()?.entitlements.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn stored(pool: &Pool) -> Pool {
    Pool {
        locked: false,
        ..pool.clone()
    }
}

fn remove_mapping(
    mappings: &mut HashMap<OwnerId, BTreeMap<String, String>>,
    owner_id: OwnerId,
    uuid: &str,
) {
    if let Some(mapping) = mappings.get_mut(&owner_id) {
        mapping.retain(|_, u| u != uuid);
    }
}

fn is_mapped(mappings: &HashMap<OwnerId, BTreeMap<String, String>>, uuid: &str) -> bool {
    mappings.values().any(|m| m.values().any(|u| u == uuid))
}

// ── Owners & consumers ───────────────────────────────────────────

impl OwnerCurator for InMemoryStore {
    fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>> {
        Ok(self.state.lock()?.owners.get(&id).cloned())
    }
}

impl ConsumerCurator for InMemoryStore {
    fn get_consumer(&self, id: ConsumerId) -> StorageResult<Option<Consumer>> {
        Ok(self.state.lock()?.consumers.get(&id).cloned())
    }

    fn get_consumer_type(&self, label: &str) -> StorageResult<Option<ConsumerType>> {
        Ok(self.state.lock()?.consumer_types.get(label).cloned())
    }

    fn get_host(&self, guest: &Consumer) -> StorageResult<Option<Consumer>> {
        let Some(virt_uuid) = guest.virt_uuid() else {
            return Ok(None);
        };
        let state = self.state.lock()?;
        Ok(state
            .consumers
            .values()
            .find(|c| c.owner_id == guest.owner_id && c.id != guest.id && c.has_guest(&virt_uuid))
            .cloned())
    }

    fn lock_consumer(&self, id: ConsumerId) -> StorageResult<Consumer> {
        let mut state = self.state.lock()?;
        let consumer = state
            .consumers
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("consumer {id}")))?;
        state.consumer_locks.insert(id);
        Ok(consumer)
    }

    fn merge_consumer(&self, consumer: &Consumer) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        if !state.consumers.contains_key(&consumer.id) {
            return Err(StorageError::NotFound(format!("consumer {}", consumer.id)));
        }
        state.consumers.insert(consumer.id, consumer.clone());
        Ok(())
    }
}

// ── Pools ────────────────────────────────────────────────────────

impl PoolCurator for InMemoryStore {
    fn get_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>> {
        let state = self.state.lock()?;
        Ok(ids.iter().filter_map(|id| state.pools.get(id).cloned()).collect())
    }

    fn lock_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>> {
        let mut state = self.state.lock()?;
        let mut locked = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(pool) = state.pools.get(id).cloned() else {
                continue;
            };
            state.pool_locks.insert(*id);
            locked.push(Pool {
                locked: true,
                ..pool
            });
        }
        debug!(count = locked.len(), "locked pools");
        Ok(locked)
    }

    fn create_pools(&self, pools: Vec<Pool>) -> StorageResult<Vec<Pool>> {
        let mut state = self.state.lock()?;
        let mut created = Vec::with_capacity(pools.len());
        for mut pool in pools {
            let id = *pool.id.get_or_insert_with(PoolId::new);
            state.pools.insert(id, stored(&pool));
            state.pool_locks.insert(id);
            pool.locked = true;
            created.push(pool);
        }
        Ok(created)
    }

    fn merge_pools(&self, pools: &[Pool]) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        for pool in pools {
            let id = pool
                .id
                .ok_or_else(|| StorageError::InvalidData("cannot merge an unsaved pool".into()))?;
            if !state.pools.contains_key(&id) {
                return Err(StorageError::NotFound(format!("pool {id}")));
            }
            state.pools.insert(id, stored(pool));
        }
        Ok(())
    }

    fn delete_pools(&self, ids: &[PoolId]) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        for id in ids {
            state.pools.remove(id);
            state.pool_locks.remove(id);
            state.entitlements.retain(|_, e| e.pool_id != *id);
        }
        Ok(())
    }

    fn list_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Pool>> {
        let state = self.state.lock()?;
        Ok(state
            .pools
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn list_by_subscription(&self, owner_id: OwnerId, subscription_id: &str) -> StorageResult<Vec<Pool>> {
        let state = self.state.lock()?;
        Ok(state
            .pools
            .values()
            .filter(|p| p.owner_id == owner_id && p.subscription_id() == Some(subscription_id))
            .cloned()
            .collect())
    }

    fn sub_pools_for_stack_ids(
        &self,
        consumer_id: ConsumerId,
        stack_ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Pool>> {
        let state = self.state.lock()?;
        Ok(state
            .pools
            .values()
            .filter(|p| {
                p.source_stack
                    .as_ref()
                    .is_some_and(|s| s.consumer_id == consumer_id && stack_ids.contains(&s.stack_id))
            })
            .cloned()
            .collect())
    }
}

// ── Entitlements ─────────────────────────────────────────────────

impl EntitlementCurator for InMemoryStore {
    fn create_entitlements(&self, entitlements: &[Entitlement]) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        for ent in entitlements {
            if state.entitlements.contains_key(&ent.id) {
                return Err(StorageError::Conflict(format!("entitlement {} exists", ent.id)));
            }
            state.entitlements.insert(ent.id, ent.clone());
        }
        Ok(())
    }

    fn merge_entitlements(&self, entitlements: &[Entitlement]) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        for ent in entitlements {
            if !state.entitlements.contains_key(&ent.id) {
                return Err(StorageError::NotFound(format!("entitlement {}", ent.id)));
            }
            state.entitlements.insert(ent.id, ent.clone());
        }
        Ok(())
    }

    fn delete_entitlements(&self, ids: &[EntitlementId]) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        for id in ids {
            state.entitlements.remove(id);
        }
        Ok(())
    }

    fn list_by_consumer(&self, consumer_id: ConsumerId) -> StorageResult<Vec<Entitlement>> {
        let state = self.state.lock()?;
        Ok(state
            .entitlements
            .values()
            .filter(|e| e.consumer_id == consumer_id)
            .cloned()
            .collect())
    }

    fn list_by_pool(&self, pool_id: PoolId) -> StorageResult<Vec<Entitlement>> {
        let state = self.state.lock()?;
        Ok(state
            .entitlements
            .values()
            .filter(|e| e.pool_id == pool_id)
            .cloned()
            .collect())
    }
}

// ── Catalog ──────────────────────────────────────────────────────

impl ProductCurator for InMemoryStore {
    fn products_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Product>> {
        let state = self.state.lock()?;
        Ok(state
            .owner_products
            .get(&owner_id)
            .into_iter()
            .flat_map(|m| m.values())
            .filter_map(|uuid| state.products.get(uuid).cloned())
            .collect())
    }

    fn products_by_uuids(&self, uuids: &[String]) -> StorageResult<Vec<Product>> {
        let state = self.state.lock()?;
        Ok(uuids
            .iter()
            .filter_map(|uuid| state.products.get(uuid).cloned())
            .collect())
    }

    fn create_product(&self, owner_id: OwnerId, mut product: Product) -> StorageResult<Product> {
        let mut state = self.state.lock()?;
        let uuid = product.uuid.get_or_insert_with(new_uuid).clone();
        state.products.insert(uuid.clone(), product.clone());
        state
            .owner_products
            .entry(owner_id)
            .or_default()
            .insert(product.id.clone(), uuid);
        Ok(product)
    }

    fn merge_product(&self, owner_id: OwnerId, product: &Product) -> StorageResult<()> {
        let uuid = product
            .uuid
            .clone()
            .ok_or_else(|| StorageError::InvalidData(format!("product {} has no uuid", product.id)))?;
        let mut state = self.state.lock()?;
        if !state.products.contains_key(&uuid) {
            return Err(StorageError::NotFound(format!("product {uuid}")));
        }
        state.products.insert(uuid.clone(), product.clone());
        state
            .owner_products
            .entry(owner_id)
            .or_default()
            .insert(product.id.clone(), uuid);
        Ok(())
    }

    fn delete_product(&self, owner_id: OwnerId, uuid: &str) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        remove_mapping(&mut state.owner_products, owner_id, uuid);
        if !is_mapped(&state.owner_products, uuid) {
            state.products.remove(uuid);
        }
        Ok(())
    }

    fn rebuild_owner_product_mapping(
        &self,
        owner_id: OwnerId,
        mapping: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        if let Some(uuid) = mapping.values().find(|u| !state.products.contains_key(*u)) {
            return Err(StorageError::NotFound(format!("product {uuid}")));
        }
        state.owner_products.insert(owner_id, mapping.clone());
        Ok(())
    }
}

impl ContentCurator for InMemoryStore {
    fn content_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Content>> {
        let state = self.state.lock()?;
        Ok(state
            .owner_content
            .get(&owner_id)
            .into_iter()
            .flat_map(|m| m.values())
            .filter_map(|uuid| state.content.get(uuid).cloned())
            .collect())
    }

    fn content_by_uuids(&self, uuids: &[String]) -> StorageResult<Vec<Content>> {
        let state = self.state.lock()?;
        Ok(uuids
            .iter()
            .filter_map(|uuid| state.content.get(uuid).cloned())
            .collect())
    }

    fn create_content(&self, owner_id: OwnerId, mut content: Content) -> StorageResult<Content> {
        let mut state = self.state.lock()?;
        let uuid = content.uuid.get_or_insert_with(new_uuid).clone();
        state.content.insert(uuid.clone(), content.clone());
        state
            .owner_content
            .entry(owner_id)
            .or_default()
            .insert(content.id.clone(), uuid);
        Ok(content)
    }

    fn merge_content(&self, owner_id: OwnerId, content: &Content) -> StorageResult<()> {
        let uuid = content
            .uuid
            .clone()
            .ok_or_else(|| StorageError::InvalidData(format!("content {} has no uuid", content.id)))?;
        let mut state = self.state.lock()?;
        if !state.content.contains_key(&uuid) {
            return Err(StorageError::NotFound(format!("content {uuid}")));
        }
        state.content.insert(uuid.clone(), content.clone());
        state
            .owner_content
            .entry(owner_id)
            .or_default()
            .insert(content.id.clone(), uuid);
        Ok(())
    }

    fn delete_content(&self, owner_id: OwnerId, uuid: &str) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        remove_mapping(&mut state.owner_content, owner_id, uuid);
        if !is_mapped(&state.owner_content, uuid) {
            state.content.remove(uuid);
        }
        Ok(())
    }

    fn rebuild_owner_content_mapping(
        &self,
        owner_id: OwnerId,
        mapping: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let mut state = self.state.lock()?;
        if let Some(uuid) = mapping.values().find(|u| !state.content.contains_key(*u)) {
            return Err(StorageError::NotFound(format!("content {uuid}")));
        }
        state.owner_content.insert(owner_id, mapping.clone());
        Ok(())
    }
}
