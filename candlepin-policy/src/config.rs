//! Rules configuration.

use crate::PolicyResult;
use serde::Deserialize;

/// Configuration for the entitlement rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Standalone (on-premise) deployments create host-restricted bonus pools
    /// at bind time. Hosted deployments adjust pre-created bonus pools
    /// instead.
    pub standalone: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self { standalone: true }
    }
}

impl RulesConfig {
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
