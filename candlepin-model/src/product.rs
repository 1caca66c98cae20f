//! Products and their attribute keys.

use crate::ProductInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Well-known product attribute names.
pub mod product_attributes {
    pub const HOST_LIMITED: &str = "host_limited";
    pub const INSTANCE_MULTIPLIER: &str = "instance_multiplier";
    pub const MULTI_ENTITLEMENT: &str = "multi-entitlement";
    pub const STACKING_ID: &str = "stacking_id";
    pub const VIRT_LIMIT: &str = "virt_limit";
    pub const VIRT_ONLY: &str = "virt_only";
}

/// Reference from one entity to another by upstream id, plus the storage
/// uuid of the referenced version when it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, uuid: Option<String>) -> Self {
        Self {
            id: id.into(),
            uuid,
        }
    }
}

/// Link between a product and a content set it provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductContent {
    pub content: EntityRef,
    pub enabled: bool,
}

/// A product in an owner's catalog.
///
/// Children (derived product, provided products, content) are held as
/// references. The refresh engine rewrites them when a child changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub dependent_product_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_product: Option<EntityRef>,
    #[serde(default)]
    pub provided_products: Vec<EntityRef>,
    #[serde(default)]
    pub product_content: Vec<ProductContent>,
    #[serde(default)]
    pub locked: bool,
    /// When the refresh engine first found this product unreferenced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_date: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            id: id.into(),
            name: Some(name.into()),
            multiplier: None,
            attributes: BTreeMap::new(),
            dependent_product_ids: BTreeSet::new(),
            derived_product: None,
            provided_products: Vec::new(),
            product_content: Vec::new(),
            locked: false,
            orphaned_date: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.uuid.clone())
    }

    /// Builds a new, upstream-locked product from imported data. Child
    /// references are left empty for the caller to resolve.
    pub fn from_info(info: &ProductInfo) -> Self {
        let mut product = Self {
            name: None,
            ..Self::new(info.id.clone(), "")
        };
        product.apply(info);
        product.locked = true;
        product
    }

    /// True if `info` changes this product's own fields or the identity of
    /// its children. Changes inside a child are reported by the child.
    pub fn is_changed_by(&self, info: &ProductInfo) -> bool {
        if info.name.is_some() && info.name != self.name {
            return true;
        }
        if info.multiplier.is_some() && info.multiplier != self.multiplier {
            return true;
        }
        if info
            .attributes
            .as_ref()
            .is_some_and(|a| a != &self.attributes)
        {
            return true;
        }
        if info
            .dependent_product_ids
            .as_ref()
            .is_some_and(|d| d != &self.dependent_product_ids)
        {
            return true;
        }
        if let Some(derived) = &info.derived_product {
            if self.derived_product.as_ref().map(|r| r.id.as_str()) != Some(derived.id.as_str()) {
                return true;
            }
        }
        if let Some(provided) = &info.provided_products {
            let current: BTreeSet<&str> =
                self.provided_products.iter().map(|r| r.id.as_str()).collect();
            let update: BTreeSet<&str> = provided.iter().map(|p| p.id.as_str()).collect();
            if current != update {
                return true;
            }
        }
        if let Some(content) = &info.product_content {
            let current: BTreeSet<(&str, bool)> = self
                .product_content
                .iter()
                .map(|pc| (pc.content.id.as_str(), pc.enabled))
                .collect();
            let update: BTreeSet<(&str, bool)> = content
                .iter()
                .map(|pc| (pc.content.id.as_str(), pc.enabled))
                .collect();
            if current != update {
                return true;
            }
        }
        false
    }

    /// Copies the scalar fields `info` specifies onto this product.
    pub fn apply(&mut self, info: &ProductInfo) {
        if info.name.is_some() {
            self.name.clone_from(&info.name);
        }
        if info.multiplier.is_some() {
            self.multiplier = info.multiplier;
        }
        if let Some(attributes) = &info.attributes {
            self.attributes.clone_from(attributes);
        }
        if let Some(ids) = &info.dependent_product_ids {
            self.dependent_product_ids.clone_from(ids);
        }
    }
}
