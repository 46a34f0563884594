//! Google Calendar provider for calsync.
//!
//! [`GoogleConnector`] trades a stored OAuth refresh token for an access
//! token and hands the observer a [`GoogleCalendar`] client:
//!
//! ```no_run
//! use calsync_core::{CalendarObserver, SyncConfig};
//! use calsync_provider_google::GoogleConnector;
//!
//! # struct Appointment;
//! # impl calsync_core::Entity for Appointment {
//! #     fn entity_id(&self) -> String { String::new() }
//! # }
//! # fn main() -> anyhow::Result<()> {
//! let connector = GoogleConnector::from_app_config()?;
//! let _observer: CalendarObserver<Appointment, _> =
//!     CalendarObserver::from_config(connector, &SyncConfig::load()?)?;
//! # Ok(())
//! # }
//! ```

pub mod app_config;
pub mod client;
pub mod session;

pub use app_config::AppConfig;
pub use client::GoogleCalendar;
pub use session::{GoogleConnector, Session};
