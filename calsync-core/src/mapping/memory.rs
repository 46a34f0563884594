use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{SyncError, SyncResult};
use crate::mapping::{EventMapping, MappingKey, MappingStore};

/// In-process mapping store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    mappings: RwLock<HashMap<MappingKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored mappings, read through a poisoned lock.
    pub fn len(&self) -> usize {
        self.mappings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> SyncError {
    SyncError::Store("mapping store lock poisoned".into())
}

impl MappingStore for MemoryStore {
    fn get_event_id(&self, key: &MappingKey) -> SyncResult<Option<String>> {
        let mappings = self.mappings.read().map_err(poisoned)?;
        Ok(mappings.get(key).cloned())
    }

    fn set_event_id(&self, key: &MappingKey, event_id: &str) -> SyncResult<EventMapping> {
        let mut mappings = self.mappings.write().map_err(poisoned)?;
        mappings.insert(key.clone(), event_id.to_string());
        Ok(EventMapping::new(key, event_id))
    }

    fn delete_event_id(&self, key: &MappingKey) -> SyncResult<usize> {
        let mut mappings = self.mappings.write().map_err(poisoned)?;
        Ok(usize::from(mappings.remove(key).is_some()))
    }
}
