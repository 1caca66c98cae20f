//! Audit events emitted by the entitlement engine.
//!
//! Events are immutable records of inventory changes. The engine only builds
//! them; delivery to a message bus is the job of an event sink supplied by
//! the host.

use crate::OwnerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventTarget {
    Pool,
    Entitlement,
    Consumer,
    Product,
    Content,
}

/// What happened to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    Modified,
    Deleted,
}

/// An event describing a change to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,

    pub target: EventTarget,

    pub event_type: EventType,

    /// Identifier of the changed entity, rendered as a string.
    pub entity_id: String,

    /// Owner the entity belongs to, when it is owner-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,

    /// When this event was created.
    pub timestamp: DateTime<Utc>,

    /// JSON snapshot of the entity after the change. Empty for deletions.
    #[serde(default)]
    pub new_entity: String,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(
        target: EventTarget,
        event_type: EventType,
        entity_id: impl Into<String>,
        owner_id: Option<OwnerId>,
        new_entity: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            target,
            event_type,
            entity_id: entity_id.into(),
            owner_id,
            timestamp: Utc::now(),
            new_entity: new_entity.into(),
        }
    }

    /// Creates a pool-created event.
    #[must_use]
    pub fn pool_created(
        pool_id: impl Into<String>,
        owner_id: OwnerId,
        json_data: impl Into<String>,
    ) -> Self {
        Self::new(
            EventTarget::Pool,
            EventType::Created,
            pool_id,
            Some(owner_id),
            json_data,
        )
    }

    /// Serializes this event to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an event from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
