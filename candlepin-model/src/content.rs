//! Content sets delivered by products.

use crate::{ContentInfo, EntityRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A content set (repository) delivered by one or more products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Storage identity. `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Upstream id.
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub label: String,
    pub name: String,
    pub vendor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_expiration: Option<i64>,
    #[serde(default)]
    pub modified_product_ids: BTreeSet<String>,
    /// Upstream-managed content cannot be edited locally and may be pruned
    /// once nothing references it.
    #[serde(default)]
    pub locked: bool,
}

impl Content {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        content_type: impl Into<String>,
        label: impl Into<String>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            uuid: None,
            id: id.into(),
            content_type: content_type.into(),
            label: label.into(),
            name: name.into(),
            vendor: vendor.into(),
            content_url: None,
            gpg_url: None,
            arches: None,
            required_tags: None,
            release_version: None,
            metadata_expiration: None,
            modified_product_ids: BTreeSet::new(),
            locked: false,
        }
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.uuid.clone())
    }

    /// Builds a new, upstream-locked content entity from imported data.
    /// Fields the import leaves unspecified become empty.
    pub fn from_info(info: &ContentInfo) -> Self {
        let mut content = Self::new(info.id.clone(), "", "", "", "");
        content.apply(info);
        content.locked = true;
        content
    }

    /// True if applying `info` would change any field of this content.
    pub fn is_changed_by(&self, info: &ContentInfo) -> bool {
        fn differs<T: PartialEq>(current: &T, update: &Option<T>) -> bool {
            update.as_ref().is_some_and(|u| u != current)
        }
        fn differs_opt<T: PartialEq>(current: &Option<T>, update: &Option<T>) -> bool {
            update.is_some() && update != current
        }

        differs(&self.name, &info.name)
            || differs(&self.content_type, &info.content_type)
            || differs(&self.label, &info.label)
            || differs(&self.vendor, &info.vendor)
            || differs_opt(&self.content_url, &info.content_url)
            || differs_opt(&self.gpg_url, &info.gpg_url)
            || differs_opt(&self.arches, &info.arches)
            || differs_opt(&self.required_tags, &info.required_tags)
            || differs_opt(&self.release_version, &info.release_version)
            || differs_opt(&self.metadata_expiration, &info.metadata_expiration)
            || differs(&self.modified_product_ids, &info.modified_product_ids)
    }

    /// Copies every field `info` specifies onto this content.
    pub fn apply(&mut self, info: &ContentInfo) {
        if let Some(name) = &info.name {
            self.name.clone_from(name);
        }
        if let Some(content_type) = &info.content_type {
            self.content_type.clone_from(content_type);
        }
        if let Some(label) = &info.label {
            self.label.clone_from(label);
        }
        if let Some(vendor) = &info.vendor {
            self.vendor.clone_from(vendor);
        }
        if info.content_url.is_some() {
            self.content_url.clone_from(&info.content_url);
        }
        if info.gpg_url.is_some() {
            self.gpg_url.clone_from(&info.gpg_url);
        }
        if info.arches.is_some() {
            self.arches.clone_from(&info.arches);
        }
        if info.required_tags.is_some() {
            self.required_tags.clone_from(&info.required_tags);
        }
        if info.release_version.is_some() {
            self.release_version.clone_from(&info.release_version);
        }
        if info.metadata_expiration.is_some() {
            self.metadata_expiration = info.metadata_expiration;
        }
        if let Some(ids) = &info.modified_product_ids {
            self.modified_product_ids.clone_from(ids);
        }
    }
}
