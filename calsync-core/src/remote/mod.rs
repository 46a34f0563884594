//! Contract for the remote calendar service.
//!
//! The reconciler only ever talks to the remote calendar through
//! [`RemoteCalendar`], and only ever obtains one through a [`Connector`].
//! Provider crates (e.g. `calsync-provider-google`) implement both.

mod payload;

pub use payload::RemotePayload;

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a remote calendar client.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Event not found")]
    NotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

/// Authenticated access to the events of one or more calendar feeds.
///
/// Payloads are full-replacement objects: whatever is passed to
/// `update_event` becomes the whole remote event.
#[async_trait]
pub trait RemoteCalendar: Send + Sync {
    async fn get_event(&self, feed: &str, event_id: &str) -> Result<RemotePayload, RemoteError>;

    /// Creates an event. The returned payload carries the id assigned by the service.
    async fn insert_event(
        &self,
        feed: &str,
        payload: &RemotePayload,
        notify: bool,
    ) -> Result<RemotePayload, RemoteError>;

    async fn update_event(
        &self,
        feed: &str,
        event_id: &str,
        payload: &RemotePayload,
        notify: bool,
    ) -> Result<RemotePayload, RemoteError>;

    async fn delete_event(&self, feed: &str, event_id: &str, notify: bool)
    -> Result<(), RemoteError>;
}

/// Produces an authenticated [`RemoteCalendar`].
///
/// Called lazily by the observer the first time a reconciliation needs the
/// remote, and again after the cached client is dropped.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: RemoteCalendar + 'static;

    async fn connect(&self) -> Result<Self::Client, RemoteError>;
}
