//! Imported upstream data.
//!
//! These mirror what an upstream source (a manifest or a subscription
//! service) reports. An unset optional field means "not specified" and leaves
//! the local value alone; it never clears it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub gpg_url: Option<String>,
    #[serde(default)]
    pub arches: Option<String>,
    #[serde(default)]
    pub required_tags: Option<String>,
    #[serde(default)]
    pub release_version: Option<String>,
    #[serde(default)]
    pub metadata_expiration: Option<i64>,
    #[serde(default)]
    pub modified_product_ids: Option<BTreeSet<String>>,
}

impl ContentInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductContentInfo {
    pub content: ContentInfo,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub multiplier: Option<i64>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub dependent_product_ids: Option<BTreeSet<String>>,
    #[serde(default)]
    pub derived_product: Option<Box<ProductInfo>>,
    #[serde(default)]
    pub provided_products: Option<Vec<ProductInfo>>,
    #[serde(default)]
    pub product_content: Option<Vec<ProductContentInfo>>,
}

impl ProductInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_content(mut self, content: ContentInfo, enabled: bool) -> Self {
        self.product_content
            .get_or_insert_with(Vec::new)
            .push(ProductContentInfo { content, enabled });
        self
    }

    pub fn with_provided_product(mut self, product: ProductInfo) -> Self {
        self.provided_products
            .get_or_insert_with(Vec::new)
            .push(product);
        self
    }

    pub fn with_derived_product(mut self, product: ProductInfo) -> Self {
        self.derived_product = Some(Box::new(product));
        self
    }

    /// Every nested product: derived first, then provided.
    pub fn child_products(&self) -> impl Iterator<Item = &ProductInfo> {
        self.derived_product
            .as_deref()
            .into_iter()
            .chain(self.provided_products.iter().flatten())
    }

    pub fn child_content(&self) -> impl Iterator<Item = &ContentInfo> {
        self.product_content.iter().flatten().map(|pc| &pc.content)
    }
}

/// An upstream subscription. Each maps to one pool per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub product: ProductInfo,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub upstream_pool_id: Option<String>,
}

impl SubscriptionInfo {
    pub fn new(id: impl Into<String>, product: ProductInfo, quantity: i64) -> Self {
        Self {
            id: id.into(),
            product,
            quantity: Some(quantity),
            start_date: None,
            end_date: None,
            contract_number: None,
            account_number: None,
            order_number: None,
            upstream_pool_id: None,
        }
    }

    /// Pool quantity this subscription yields: the subscribed quantity
    /// scaled by the product multiplier. Unlimited stays unlimited.
    pub fn pool_quantity(&self, fallback_multiplier: Option<i64>) -> Option<i64> {
        let quantity = self.quantity?;
        if quantity < 0 {
            return Some(-1);
        }
        let multiplier = self
            .product
            .multiplier
            .or(fallback_multiplier)
            .filter(|m| *m > 0)
            .unwrap_or(1);
        Some(quantity.saturating_mul(multiplier))
    }
}
