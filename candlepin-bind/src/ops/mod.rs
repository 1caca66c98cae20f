//! The operations that make up the standard bind chain, in chain order.

mod certificates;
mod check_bonus_pools;
mod compliance;
mod handle_entitlements;
mod post_bind_bonus_pools;
mod pre_entitlement_rules;

pub use certificates::HandleCertificatesOp;
pub use check_bonus_pools::CheckBonusPoolQuantitiesOp;
pub use compliance::ComplianceOp;
pub use handle_entitlements::HandleEntitlementsOp;
pub use post_bind_bonus_pools::PostBindBonusPoolsOp;
pub use pre_entitlement_rules::PreEntitlementRulesCheckOp;
