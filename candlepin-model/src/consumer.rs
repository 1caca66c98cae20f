//! Consumers and their types.

use candlepin_types::{ConsumerId, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The kind of consumer. Manifest consumers (distributors) export
/// entitlements to another Candlepin instead of using them locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerType {
    pub label: String,
    pub manifest: bool,
}

impl ConsumerType {
    pub const SYSTEM: &'static str = "system";
    pub const HYPERVISOR: &'static str = "hypervisor";
    pub const CANDLEPIN: &'static str = "candlepin";

    pub fn new(label: impl Into<String>, manifest: bool) -> Self {
        Self {
            label: label.into(),
            manifest,
        }
    }

    #[must_use]
    pub fn system() -> Self {
        Self::new(Self::SYSTEM, false)
    }

    #[must_use]
    pub fn hypervisor() -> Self {
        Self::new(Self::HYPERVISOR, false)
    }

    /// The distributor type used for manifests.
    #[must_use]
    pub fn candlepin() -> Self {
        Self::new(Self::CANDLEPIN, true)
    }
}

/// A registered system, hypervisor or distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: ConsumerId,
    /// Externally visible identifier. Host-restricted pools reference this.
    pub uuid: String,
    pub name: String,
    pub owner_id: OwnerId,
    /// Label of the consumer's [`ConsumerType`].
    pub type_label: String,
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
    /// Virtual guest ids reported by a hypervisor.
    #[serde(default)]
    pub guest_ids: BTreeSet<String>,
    #[serde(default)]
    pub entitlement_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlement_status: Option<String>,
}

impl Consumer {
    pub const FACT_VIRT_IS_GUEST: &'static str = "virt.is_guest";
    pub const FACT_VIRT_UUID: &'static str = "virt.uuid";

    pub fn new(name: impl Into<String>, owner_id: OwnerId, type_label: impl Into<String>) -> Self {
        let id = ConsumerId::new();
        Self {
            id,
            uuid: id.to_string(),
            name: name.into(),
            owner_id,
            type_label: type_label.into(),
            facts: BTreeMap::new(),
            guest_ids: BTreeSet::new(),
            entitlement_count: 0,
            entitlement_status: None,
        }
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    /// True if the consumer reports itself as a virtual guest.
    pub fn is_guest(&self) -> bool {
        self.fact(Self::FACT_VIRT_IS_GUEST)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// The guest's virt uuid, normalized to lowercase.
    pub fn virt_uuid(&self) -> Option<String> {
        self.fact(Self::FACT_VIRT_UUID)
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_ascii_lowercase())
    }

    pub fn has_guest(&self, virt_uuid: &str) -> bool {
        self.guest_ids
            .iter()
            .any(|g| g.eq_ignore_ascii_case(virt_uuid))
    }
}
