//! Per-entity outcomes of a refresh.

use crate::{EntityKind, NodeKey};
use std::collections::BTreeMap;

/// Reported outcome for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

/// Outcome of a refresh, per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshResult {
    entities: BTreeMap<NodeKey, EntityState>,
}

impl RefreshResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: NodeKey, state: EntityState) {
        self.entities.insert(key, state);
    }

    pub fn state(&self, kind: EntityKind, id: &str) -> Option<EntityState> {
        self.entities.get(&NodeKey::new(kind, id)).copied()
    }

    /// Ids of `kind` that ended in `state`, in id order.
    pub fn ids(&self, kind: EntityKind, state: EntityState) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|(key, s)| key.kind == kind && **s == state)
            .map(|(key, _)| key.id.as_str())
            .collect()
    }

    pub fn count(&self, state: EntityState) -> usize {
        self.entities.values().filter(|s| **s == state).count()
    }

    pub fn entities(&self) -> impl Iterator<Item = (&NodeKey, EntityState)> {
        self.entities.iter().map(|(k, s)| (k, *s))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
