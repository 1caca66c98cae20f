//! Existing-versus-imported entity maps.

use crate::{RefreshError, Result};
use candlepin_model::{Content, ContentInfo, Pool, Product, ProductInfo, SubscriptionInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How an [`EntityMapper`] identifies and compares one kind of entity.
pub trait EntityStrategy {
    /// The persisted form.
    type Existing: Clone + fmt::Debug;
    /// The upstream form.
    type Imported: Clone + fmt::Debug;

    /// Mapping id of a persisted entity, if it has one.
    fn existing_id(entity: &Self::Existing) -> Option<String>;

    fn imported_id(entity: &Self::Imported) -> String;

    fn existing_eq(lhs: &Self::Existing, rhs: &Self::Existing) -> bool;

    fn imported_eq(lhs: &Self::Imported, rhs: &Self::Imported) -> bool;
}

/// Two keyed maps, existing and imported, for one entity kind.
///
/// Mapping a second, different entity under an id already in use keeps the
/// newer one and marks the id dirty. Re-mapping an equal entity does not.
pub struct EntityMapper<S: EntityStrategy> {
    existing: BTreeMap<String, S::Existing>,
    imported: BTreeMap<String, S::Imported>,
    dirty: BTreeSet<String>,
}

impl<S: EntityStrategy> Default for EntityMapper<S> {
    fn default() -> Self {
        Self {
            existing: BTreeMap::new(),
            imported: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }
}

impl<S: EntityStrategy> fmt::Debug for EntityMapper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapper")
            .field("existing", &self.existing.len())
            .field("imported", &self.imported.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn checked_id(id: Option<String>) -> Result<String> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(RefreshError::InvalidArgument("entity has a null or empty id".into())),
    }
}

impl<S: EntityStrategy> EntityMapper<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing_entity(&self, id: &str) -> Option<&S::Existing> {
        self.existing.get(id)
    }

    pub fn imported_entity(&self, id: &str) -> Option<&S::Imported> {
        self.imported.get(id)
    }

    pub fn existing_entities(&self) -> impl Iterator<Item = (&str, &S::Existing)> {
        self.existing.iter().map(|(id, e)| (id.as_str(), e))
    }

    pub fn imported_entities(&self) -> impl Iterator<Item = (&str, &S::Imported)> {
        self.imported.iter().map(|(id, e)| (id.as_str(), e))
    }

    /// True if either map holds `id`.
    pub fn has_entity(&self, id: &str) -> bool {
        self.existing.contains_key(id) || self.imported.contains_key(id)
    }

    /// Every mapped id, existing or imported, in order.
    pub fn entity_ids(&self) -> BTreeSet<&str> {
        self.existing
            .keys()
            .chain(self.imported.keys())
            .map(String::as_str)
            .collect()
    }

    /// Maps a persisted entity. Returns true if the map changed.
    pub fn add_existing_entity(&mut self, entity: S::Existing) -> Result<bool> {
        let id = checked_id(S::existing_id(&entity))?;
        match self.existing.get(&id) {
            Some(current) if S::existing_eq(current, &entity) => Ok(false),
            Some(_) => {
                self.dirty.insert(id.clone());
                self.existing.insert(id, entity);
                Ok(true)
            }
            None => {
                self.existing.insert(id, entity);
                Ok(true)
            }
        }
    }

    pub fn add_existing_entities<It>(&mut self, entities: It) -> Result<bool>
    where
        It: IntoIterator<Item = S::Existing>,
    {
        let mut changed = false;
        for entity in entities {
            changed |= self.add_existing_entity(entity)?;
        }
        Ok(changed)
    }

    /// Maps an upstream entity. Returns true if the map changed.
    pub fn add_imported_entity(&mut self, entity: S::Imported) -> Result<bool> {
        let id = checked_id(Some(S::imported_id(&entity)))?;
        match self.imported.get(&id) {
            Some(current) if S::imported_eq(current, &entity) => Ok(false),
            Some(_) => {
                self.dirty.insert(id.clone());
                self.imported.insert(id, entity);
                Ok(true)
            }
            None => {
                self.imported.insert(id, entity);
                Ok(true)
            }
        }
    }

    pub fn add_imported_entities<It>(&mut self, entities: It) -> Result<bool>
    where
        It: IntoIterator<Item = S::Imported>,
    {
        let mut changed = false;
        for entity in entities {
            changed |= self.add_imported_entity(entity)?;
        }
        Ok(changed)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_dirty_id(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Marks dirty every existing id not in `valid_ids`. Returns true if any
    /// id was outside the set.
    pub fn validate_existing_entities<'a, It>(&mut self, valid_ids: It) -> bool
    where
        It: IntoIterator<Item = &'a str>,
    {
        let valid: BTreeSet<&str> = valid_ids.into_iter().collect();
        let invalid: Vec<String> = self
            .existing
            .keys()
            .filter(|id| !valid.contains(id.as_str()))
            .cloned()
            .collect();
        let found = !invalid.is_empty();
        self.dirty.extend(invalid);
        found
    }

    /// True if every existing id is in `ids`. Never marks anything dirty.
    pub fn contains_only_existing_entities<'a, It>(&self, ids: It) -> bool
    where
        It: IntoIterator<Item = &'a str>,
    {
        let ids: BTreeSet<&str> = ids.into_iter().collect();
        self.existing.keys().all(|id| ids.contains(id.as_str()))
    }

    pub fn clear_existing_entities(&mut self) {
        self.existing.clear();
    }

    /// Drops every mapping and dirty mark.
    pub fn clear(&mut self) {
        self.existing.clear();
        self.imported.clear();
        self.dirty.clear();
    }
}

/// Compares by uuid when both sides have one, else by value.
fn uuid_or_value_eq<T: PartialEq>(lhs: &T, lhs_uuid: Option<&str>, rhs: &T, rhs_uuid: Option<&str>) -> bool {
    match (lhs_uuid, rhs_uuid) {
        (Some(l), Some(r)) => l == r,
        _ => lhs == rhs,
    }
}

// ── Strategies ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct ContentStrategy;

impl EntityStrategy for ContentStrategy {
    type Existing = Content;
    type Imported = ContentInfo;

    fn existing_id(entity: &Content) -> Option<String> {
        Some(entity.id.clone())
    }

    fn imported_id(entity: &ContentInfo) -> String {
        entity.id.clone()
    }

    fn existing_eq(lhs: &Content, rhs: &Content) -> bool {
        uuid_or_value_eq(lhs, lhs.uuid.as_deref(), rhs, rhs.uuid.as_deref())
    }

    fn imported_eq(lhs: &ContentInfo, rhs: &ContentInfo) -> bool {
        lhs == rhs
    }
}

#[derive(Debug)]
pub struct ProductStrategy;

impl EntityStrategy for ProductStrategy {
    type Existing = Product;
    type Imported = ProductInfo;

    fn existing_id(entity: &Product) -> Option<String> {
        Some(entity.id.clone())
    }

    fn imported_id(entity: &ProductInfo) -> String {
        entity.id.clone()
    }

    fn existing_eq(lhs: &Product, rhs: &Product) -> bool {
        uuid_or_value_eq(lhs, lhs.uuid.as_deref(), rhs, rhs.uuid.as_deref())
    }

    fn imported_eq(lhs: &ProductInfo, rhs: &ProductInfo) -> bool {
        lhs == rhs
    }
}

/// Pools are keyed by their upstream subscription, falling back to the
/// local pool id for pools with no subscription.
#[derive(Debug)]
pub struct PoolStrategy;

impl EntityStrategy for PoolStrategy {
    type Existing = Pool;
    type Imported = SubscriptionInfo;

    fn existing_id(entity: &Pool) -> Option<String> {
        entity
            .subscription_id()
            .map(str::to_owned)
            .or_else(|| entity.id.map(|id| id.to_string()))
    }

    fn imported_id(entity: &SubscriptionInfo) -> String {
        entity.id.clone()
    }

    fn existing_eq(lhs: &Pool, rhs: &Pool) -> bool {
        match (lhs.id, rhs.id) {
            (Some(l), Some(r)) => l == r,
            _ => lhs == rhs,
        }
    }

    fn imported_eq(lhs: &SubscriptionInfo, rhs: &SubscriptionInfo) -> bool {
        lhs == rhs
    }
}

pub type ContentMapper = EntityMapper<ContentStrategy>;
pub type ProductMapper = EntityMapper<ProductStrategy>;
pub type PoolMapper = EntityMapper<PoolStrategy>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_imported_id_is_rejected() {
        let mut mapper = ContentMapper::new();
        let err = mapper.add_imported_entity(ContentInfo::new("")).unwrap_err();
        assert!(matches!(err, RefreshError::InvalidArgument(_)));
        assert!(mapper.entity_ids().is_empty());
    }

    #[test]
    fn uuid_comparison_ignores_other_fields() {
        let mut a = Product::new("p1", "One");
        a.uuid = Some("u1".into());
        let b = Product {
            name: Some("Renamed".into()),
            ..a.clone()
        };
        assert!(ProductStrategy::existing_eq(&a, &b));

        let c = Product { uuid: None, ..b };
        assert!(!ProductStrategy::existing_eq(&a, &c));
    }
}
