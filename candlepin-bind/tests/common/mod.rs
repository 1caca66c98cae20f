#![allow(dead_code)]

use candlepin_bind::{
    BindChainFactory, BindContextFactory, BindResult, CertificateService, ComplianceService,
    DefaultPoolManager, Entitler, EventQueue, PoolOpProcessor,
};
use candlepin_model::{
    Consumer, ConsumerType, Entitlement, Owner, Pool, PoolQuantity, Product, SourceSubscription,
};
use candlepin_policy::{
    BoundEntitlement, CallerType, EntitlementRules, Enforcer, PolicyResult, PoolOperations,
    RulesConfig, ValidationResult,
};
use candlepin_storage::{InMemoryStore, PoolCurator, StorageResult};
use candlepin_types::{ConsumerId, EntitlementId, OwnerId, PoolId};
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Counting enforcer ────────────────────────────────────────────

/// Delegates to the real rules and counts each call.
pub struct CountingEnforcer {
    inner: EntitlementRules,
    pub pre_calls: AtomicUsize,
    pub finish_calls: AtomicUsize,
    pub post_calls: AtomicUsize,
}

impl Enforcer for CountingEnforcer {
    fn pre_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        pool_quantities: &[PoolQuantity],
        caller: CallerType,
    ) -> PolicyResult<BTreeMap<PoolId, ValidationResult>> {
        self.pre_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .pre_entitlement(consumer, consumer_type, pool_quantities, caller)
    }

    fn finish_validation(&self, result: &mut ValidationResult, pool: &Pool, quantity: i64) {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.finish_validation(result, pool, quantity);
    }

    fn post_entitlement(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        bound: &[BoundEntitlement<'_>],
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
    ) -> PolicyResult<PoolOperations> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .post_entitlement(consumer, consumer_type, bound, sub_pools_for_stack_ids, is_update)
    }
}

// ── Recording pool curator ───────────────────────────────────────

/// Forwards to the store and records lock and create batches.
pub struct RecordingPoolCurator {
    store: Arc<InMemoryStore>,
    pub lock_calls: Mutex<Vec<Vec<PoolId>>>,
    pub create_calls: Mutex<Vec<usize>>,
}

impl RecordingPoolCurator {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            lock_calls: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn locked_ids(&self) -> BTreeSet<PoolId> {
        self.lock_calls.lock().unwrap().iter().flatten().copied().collect()
    }
}

impl PoolCurator for RecordingPoolCurator {
    fn get_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>> {
        self.store.get_pools(ids)
    }

    fn lock_pools(&self, ids: &[PoolId]) -> StorageResult<Vec<Pool>> {
        self.lock_calls.lock().unwrap().push(ids.to_vec());
        self.store.lock_pools(ids)
    }

    fn create_pools(&self, pools: Vec<Pool>) -> StorageResult<Vec<Pool>> {
        self.create_calls.lock().unwrap().push(pools.len());
        self.store.create_pools(pools)
    }

    fn merge_pools(&self, pools: &[Pool]) -> StorageResult<()> {
        self.store.merge_pools(pools)
    }

    fn delete_pools(&self, ids: &[PoolId]) -> StorageResult<()> {
        self.store.delete_pools(ids)
    }

    fn list_by_owner(&self, owner_id: OwnerId) -> StorageResult<Vec<Pool>> {
        self.store.list_by_owner(owner_id)
    }

    fn list_by_subscription(&self, owner_id: OwnerId, subscription_id: &str) -> StorageResult<Vec<Pool>> {
        self.store.list_by_subscription(owner_id, subscription_id)
    }

    fn sub_pools_for_stack_ids(
        &self,
        consumer_id: ConsumerId,
        stack_ids: &BTreeSet<String>,
    ) -> StorageResult<Vec<Pool>> {
        self.store.sub_pools_for_stack_ids(consumer_id, stack_ids)
    }
}

// ── Collaborator stubs ───────────────────────────────────────────

#[derive(Default)]
pub struct SerialCertificates {
    next: AtomicU64,
}

impl CertificateService for SerialCertificates {
    fn generate_entitlement_certificates(
        &self,
        _consumer: &Consumer,
        entitlements: &[Entitlement],
        _pools: &BTreeMap<PoolId, Pool>,
    ) -> BindResult<BTreeMap<EntitlementId, u64>> {
        Ok(entitlements
            .iter()
            .map(|e| (e.id, self.next.fetch_add(1, Ordering::SeqCst) + 1))
            .collect())
    }
}

pub struct FixedCompliance(pub &'static str);

impl ComplianceService for FixedCompliance {
    fn compute_status(&self, _consumer: &Consumer) -> BindResult<String> {
        Ok(self.0.to_string())
    }
}

// ── Harness ──────────────────────────────────────────────────────

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub pools: Arc<RecordingPoolCurator>,
    pub enforcer: Arc<CountingEnforcer>,
    pub events: Arc<EventQueue>,
    pub owner: Owner,
}

impl Harness {
    pub fn new(standalone: bool) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::new());
        let owner = Owner::new("acme", "Acme Corp");
        store.add_owner(owner.clone()).unwrap();

        let enforcer = Arc::new(CountingEnforcer {
            inner: EntitlementRules::new(
                RulesConfig { standalone },
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            pre_calls: AtomicUsize::new(0),
            finish_calls: AtomicUsize::new(0),
            post_calls: AtomicUsize::new(0),
        });

        Self {
            pools: Arc::new(RecordingPoolCurator::new(store.clone())),
            store,
            enforcer,
            events: Arc::new(EventQueue::new()),
            owner,
        }
    }

    pub fn processor(&self) -> PoolOpProcessor {
        PoolOpProcessor::new(self.pools.clone(), self.events.clone())
    }

    pub fn context_factory(&self) -> BindContextFactory {
        BindContextFactory::new(self.store.clone(), self.store.clone(), self.pools.clone())
    }

    pub fn chain_factory(&self) -> BindChainFactory {
        BindChainFactory::new(
            self.context_factory(),
            self.enforcer.clone(),
            self.pools.clone(),
            self.store.clone(),
            self.store.clone(),
            Arc::new(self.processor()),
            Arc::new(DefaultPoolManager::new(
                self.pools.clone(),
                self.store.clone(),
                self.store.clone(),
            )),
            Arc::new(SerialCertificates::default()),
            Arc::new(FixedCompliance("valid")),
        )
    }

    pub fn entitler(&self) -> Entitler {
        Entitler::new(self.store.clone(), self.chain_factory())
    }

    pub fn make_pool(&self, product: Product, quantity: i64) -> Pool {
        self.make_pool_for("sub-1", product, quantity)
    }

    pub fn make_pool_for(&self, subscription_id: &str, product: Product, quantity: i64) -> Pool {
        let now = Utc::now();
        let mut pool = Pool::new(
            self.owner.id,
            product,
            quantity,
            now - Duration::days(1),
            now + Duration::days(365),
        );
        pool.source_subscription = Some(SourceSubscription::master(subscription_id));
        let saved = self.store.create_pools(vec![pool]).unwrap().remove(0);
        self.store.commit().unwrap();
        Pool {
            locked: false,
            ..saved
        }
    }

    pub fn make_consumer(&self, consumer_type: &ConsumerType) -> Consumer {
        let consumer = Consumer::new("box-1", self.owner.id, consumer_type.label.clone());
        self.store.add_consumer(consumer.clone()).unwrap();
        consumer
    }

    pub fn stored_pool(&self, id: PoolId) -> Pool {
        self.store.pool(id).unwrap().expect("pool exists")
    }
}
