//! The bind chain and its factory.

use crate::ops::{
    CheckBonusPoolQuantitiesOp, ComplianceOp, HandleCertificatesOp, HandleEntitlementsOp,
    PostBindBonusPoolsOp, PreEntitlementRulesCheckOp,
};
use crate::{
    BindContext, BindContextFactory, BindError, BindOperation, BindResult, CertificateService,
    ComplianceService, PoolManager, PoolOpProcessor,
};
use candlepin_model::{Consumer, Entitlement};
use candlepin_policy::{CallerType, Enforcer};
use candlepin_storage::{ConsumerCurator, EntitlementCurator, PoolCurator};
use candlepin_types::PoolId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// An ordered list of operations over one [`BindContext`].
pub struct BindChain {
    context: BindContext,
    operations: Vec<Box<dyn BindOperation>>,
    pools: Arc<dyn PoolCurator>,
    consumers: Arc<dyn ConsumerCurator>,
}

impl BindChain {
    pub fn new(
        context: BindContext,
        operations: Vec<Box<dyn BindOperation>>,
        pools: Arc<dyn PoolCurator>,
        consumers: Arc<dyn ConsumerCurator>,
    ) -> Self {
        Self {
            context,
            operations,
            pools,
            consumers,
        }
    }

    pub fn context(&self) -> &BindContext {
        &self.context
    }

    /// Runs every `pre_process`, locks the requested pools and the consumer,
    /// then runs every `execute`. Returns the entitlements granted with a
    /// positive quantity.
    pub fn run(mut self) -> BindResult<Vec<Entitlement>> {
        for op in &mut self.operations {
            if !op.pre_process(&mut self.context)? {
                return Err(halted(&mut self.context, op.name()));
            }
        }

        self.context.lock_pools(self.pools.as_ref())?;
        self.context.lock_consumer(self.consumers.as_ref())?;

        for op in &mut self.operations {
            debug!(operation = op.name(), "executing");
            if !op.execute(&mut self.context)? {
                return Err(halted(&mut self.context, op.name()));
            }
        }

        let granted: Vec<Entitlement> = self
            .context
            .entitlements()
            .values()
            .filter(|e| e.quantity > 0)
            .cloned()
            .collect();
        info!(
            consumer = %self.context.consumer().uuid,
            count = granted.len(),
            "bind complete"
        );
        Ok(granted)
    }
}

fn halted(context: &mut BindContext, operation: &'static str) -> BindError {
    match context.take_refusal() {
        Some(refusal) => BindError::EntitlementRefused(refusal),
        None => BindError::Halted(operation),
    }
}

/// Assembles the standard bind chain.
#[derive(Clone)]
pub struct BindChainFactory {
    contexts: BindContextFactory,
    enforcer: Arc<dyn Enforcer>,
    pools: Arc<dyn PoolCurator>,
    consumers: Arc<dyn ConsumerCurator>,
    entitlements: Arc<dyn EntitlementCurator>,
    processor: Arc<PoolOpProcessor>,
    pool_manager: Arc<dyn PoolManager>,
    certificates: Arc<dyn CertificateService>,
    compliance: Arc<dyn ComplianceService>,
}

impl BindChainFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contexts: BindContextFactory,
        enforcer: Arc<dyn Enforcer>,
        pools: Arc<dyn PoolCurator>,
        consumers: Arc<dyn ConsumerCurator>,
        entitlements: Arc<dyn EntitlementCurator>,
        processor: Arc<PoolOpProcessor>,
        pool_manager: Arc<dyn PoolManager>,
        certificates: Arc<dyn CertificateService>,
        compliance: Arc<dyn ComplianceService>,
    ) -> Self {
        Self {
            contexts,
            enforcer,
            pools,
            consumers,
            entitlements,
            processor,
            pool_manager,
            certificates,
            compliance,
        }
    }

    pub fn create(
        &self,
        consumer: Consumer,
        quantities: &BTreeMap<PoolId, i64>,
        caller: CallerType,
    ) -> BindResult<BindChain> {
        let context = self.contexts.create(consumer, quantities, caller)?;
        let operations: Vec<Box<dyn BindOperation>> = vec![
            Box::new(PreEntitlementRulesCheckOp::new(self.enforcer.clone())),
            Box::new(HandleEntitlementsOp::new(
                self.pools.clone(),
                self.entitlements.clone(),
                self.consumers.clone(),
            )),
            Box::new(PostBindBonusPoolsOp::new(
                self.enforcer.clone(),
                self.pools.clone(),
                self.entitlements.clone(),
                self.processor.clone(),
            )),
            Box::new(CheckBonusPoolQuantitiesOp::new(self.pool_manager.clone())),
            Box::new(HandleCertificatesOp::new(
                self.certificates.clone(),
                self.entitlements.clone(),
            )),
            Box::new(ComplianceOp::new(self.compliance.clone(), self.consumers.clone())),
        ];
        Ok(BindChain::new(
            context,
            operations,
            self.pools.clone(),
            self.consumers.clone(),
        ))
    }
}
