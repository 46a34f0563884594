//! Core of calsync: keeps calendar events in step with application records.
//!
//! This crate is provider-agnostic:
//! - [`Adapter`] describes how one kind of record maps onto an event
//! - [`EventData`] is what an adapter asks to be written
//! - [`MappingStore`] remembers which remote event belongs to which record
//! - [`CalendarObserver`] reacts to record changes and reconciles the remote
//! - [`remote`] defines the client contract that providers implement

pub mod adapter;
pub mod config;
pub mod error;
pub mod event_data;
pub mod mapping;
pub mod observer;
pub mod remote;
pub mod signal;

pub use adapter::{Adapter, Entity};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use event_data::{
    CalendarEventData, EventData, EventZone, RawEventData, Reminder, ReminderMethod, When,
    format_datetime,
};
pub use mapping::{EventMapping, MappingKey, MappingStore, MemoryStore, SqliteStore};
pub use observer::{CalendarObserver, Selector, UpdateOutcome};
pub use remote::{Connector, RemoteCalendar, RemoteError, RemotePayload};
pub use signal::EntityEvent;
