//! SQLite-backed mapping store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::mapping::{EventMapping, MappingKey, MappingStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating the schema if needed.
    pub fn open(path: &Path) -> SyncResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Store(format!("Could not create {}: {e}", parent.display()))
            })?;
        }

        debug!(path = %path.display(), "opening mapping database");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SyncResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SyncResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS event_mappings (
                entity_type TEXT NOT NULL,
                entity_id   TEXT NOT NULL,
                feed_id     TEXT NOT NULL,
                event_id    TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE (entity_type, entity_id, feed_id)
            );",
        )?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> SyncResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Store("mapping database lock poisoned".into()))
    }
}

impl MappingStore for SqliteStore {
    fn get_event_id(&self, key: &MappingKey) -> SyncResult<Option<String>> {
        let conn = self.conn()?;
        let event_id = conn
            .query_row(
                "SELECT event_id FROM event_mappings
                 WHERE entity_type = ?1 AND entity_id = ?2 AND feed_id = ?3",
                params![key.entity_type, key.entity_id, key.feed_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(event_id)
    }

    fn set_event_id(&self, key: &MappingKey, event_id: &str) -> SyncResult<EventMapping> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO event_mappings (entity_type, entity_id, feed_id, event_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (entity_type, entity_id, feed_id)
             DO UPDATE SET event_id = excluded.event_id, updated_at = excluded.updated_at",
            params![
                key.entity_type,
                key.entity_id,
                key.feed_id,
                event_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(EventMapping::new(key, event_id))
    }

    fn delete_event_id(&self, key: &MappingKey) -> SyncResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM event_mappings
             WHERE entity_type = ?1 AND entity_id = ?2 AND feed_id = ?3",
            params![key.entity_type, key.entity_id, key.feed_id],
        )?;
        Ok(removed)
    }
}
