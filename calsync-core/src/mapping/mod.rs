//! Persistent links between local entities and remote events.
//!
//! A mapping is keyed by `(entity_type, entity_id, feed_id)` and holds the
//! remote event id. There is at most one mapping per key: setting an id for
//! a key that already has one replaces it.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;

use crate::error::SyncResult;

/// Identifies one entity's event within one feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub entity_type: String,
    pub entity_id: String,
    pub feed_id: String,
}

impl MappingKey {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        feed_id: impl Into<String>,
    ) -> Self {
        MappingKey {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            feed_id: feed_id.into(),
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} in {}", self.entity_type, self.entity_id, self.feed_id)
    }
}

/// A stored mapping record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapping {
    pub entity_type: String,
    pub entity_id: String,
    pub feed_id: String,
    pub event_id: String,
}

impl EventMapping {
    pub fn new(key: &MappingKey, event_id: impl Into<String>) -> Self {
        EventMapping {
            entity_type: key.entity_type.clone(),
            entity_id: key.entity_id.clone(),
            feed_id: key.feed_id.clone(),
            event_id: event_id.into(),
        }
    }
}

impl fmt::Display for EventMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}: ({}, {})",
            self.entity_type, self.entity_id, self.feed_id, self.event_id
        )
    }
}

/// Storage for [`EventMapping`]s.
///
/// Implementations must be safe to share between threads. Writes to the
/// same key are last-writer-wins.
pub trait MappingStore: Send + Sync {
    fn get_event_id(&self, key: &MappingKey) -> SyncResult<Option<String>>;

    /// Creates the mapping, or overwrites the event id of an existing one.
    fn set_event_id(&self, key: &MappingKey, event_id: &str) -> SyncResult<EventMapping>;

    /// Removes the mapping. Returns how many records were removed (0 or 1).
    fn delete_event_id(&self, key: &MappingKey) -> SyncResult<usize>;
}
