//! Entry point that runs a bind chain for a consumer.

use crate::{BindChainFactory, BindError, BindResult};
use candlepin_model::Entitlement;
use candlepin_policy::CallerType;
use candlepin_storage::ConsumerCurator;
use candlepin_types::{ConsumerId, PoolId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Entry point for granting entitlements.
pub struct Entitler {
    consumers: Arc<dyn ConsumerCurator>,
    chains: BindChainFactory,
}

impl Entitler {
    pub fn new(consumers: Arc<dyn ConsumerCurator>, chains: BindChainFactory) -> Self {
        Self { consumers, chains }
    }

    /// Binds `consumer_id` to each pool at the given quantity.
    ///
    /// An empty request grants nothing and touches no storage.
    pub fn entitle_by_pools(
        &self,
        consumer_id: ConsumerId,
        quantities: &BTreeMap<PoolId, i64>,
    ) -> BindResult<Vec<Entitlement>> {
        if quantities.is_empty() {
            return Ok(Vec::new());
        }
        let consumer = self
            .consumers
            .get_consumer(consumer_id)?
            .ok_or(BindError::ConsumerNotFound(consumer_id))?;
        info!(consumer = %consumer.uuid, pools = quantities.len(), "binding by pools");

        self.chains
            .create(consumer, quantities, CallerType::Bind)?
            .run()
    }
}
