//! Owners (organizations).

use candlepin_types::OwnerId;
use serde::{Deserialize, Serialize};

/// An organization. Pools, consumers and the product catalog are scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub key: String,
    pub display_name: String,
}

impl Owner {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: OwnerId::new(),
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}
