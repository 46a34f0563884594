//! Error types for calsync.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur while reconciling an entity with its calendar event.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No adapter registered for entity type '{0}'")]
    UnknownEntityType(String),

    #[error("No calendar feed configured for entity type '{0}'")]
    NoFeedConfigured(String),

    #[error("Adapter for '{0}' does not provide event data")]
    NotImplemented(String),

    #[error("Could not read remote event {event_id}: {source}")]
    RemoteReadFailed {
        event_id: String,
        #[source]
        source: RemoteError,
    },

    #[error("Could not write remote event: {0}")]
    RemoteWriteFailed(#[source] RemoteError),

    #[error("Could not delete remote event {event_id}: {source}")]
    RemoteDeleteFailed {
        event_id: String,
        #[source]
        source: RemoteError,
    },

    #[error("Authentication failed: {0}")]
    AuthFailed(#[source] RemoteError),

    #[error("Invalid local time: {0}")]
    InvalidTime(String),

    #[error("Mapping store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::Store(e.to_string())
    }
}

/// Result type alias for calsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
