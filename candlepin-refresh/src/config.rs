//! Refresh worker configuration.

use crate::Result;
use serde::Deserialize;

/// Configuration for a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Days an upstream product may stay unreferenced before it is deleted.
    /// Negative keeps orphans forever; zero deletes them on the first
    /// refresh that finds them orphaned.
    pub orphaned_entity_grace_period: i32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            orphaned_entity_grace_period: -1,
        }
    }
}

impl RefreshConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
