//! Per-entity-type sync policy.

use crate::error::{SyncError, SyncResult};
use crate::event_data::EventData;

/// A local record that can be mirrored into a calendar.
pub trait Entity: Send + Sync {
    /// Stable identifier of this instance within its entity type.
    fn entity_id(&self) -> String;
}

/// Decides whether and how instances of one entity type appear in a calendar.
///
/// Adapters are strategy objects: they hold no per-instance state, and every
/// method receives the instance it is asked about. Only [`Adapter::event_data`]
/// needs overriding; the rest have sensible defaults.
pub trait Adapter<E>: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether the instance should be created or updated remotely.
    fn can_save(&self, _instance: &E) -> bool {
        true
    }

    /// Whether the remote event should be deleted along with the instance.
    fn can_delete(&self, _instance: &E) -> bool {
        true
    }

    /// Whether attendees should be notified about remote changes.
    fn can_notify(&self, _instance: &E) -> bool {
        false
    }

    fn event_data(&self, _instance: &E) -> SyncResult<EventData> {
        Err(SyncError::NotImplemented(self.name().to_string()))
    }

    /// Calendar feed for the instance. `None` falls back to the observer's
    /// default feed.
    fn feed_id(&self, _instance: &E) -> Option<String> {
        None
    }
}
