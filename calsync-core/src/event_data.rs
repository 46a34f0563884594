//! What an adapter wants written into a remote event.
//!
//! [`EventData`] comes in two flavours:
//! - [`CalendarEventData`]: the common fields (times, title, attendees,
//!   a reminder), converted into the remote representation for you
//! - [`RawEventData`]: remote-native values written verbatim, for adapters
//!   that need fields calsync has no builder for
//!
//! Either way, the data is merged *onto* the current remote payload, so
//! fields the adapter does not set survive the write.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{SyncError, SyncResult};
use crate::remote::RemotePayload;

/// Serializes a UTC instant the way the remote expects it:
/// ISO-8601 with millisecond precision and a literal `Z`.
pub fn format_datetime(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The time zone a structured event's naive start/end are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum EventZone {
    /// The zone of the machine running the reconciler.
    #[default]
    Local,
    Fixed(FixedOffset),
    Named(Tz),
}

impl EventZone {
    /// Converts a local wall-clock time into UTC.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earlier instant;
    /// times skipped by a DST jump are rejected.
    pub fn to_utc(self, local: NaiveDateTime) -> SyncResult<DateTime<Utc>> {
        let resolved = match self {
            EventZone::Local => chrono::Local
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            EventZone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            EventZone::Named(tz) => tz
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };

        resolved.ok_or_else(|| {
            SyncError::InvalidTime(format!("{} does not exist in zone {:?}", local, self))
        })
    }
}

/// How a reminder is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    #[default]
    Popup,
    Email,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderMethod::Popup => "popup",
            ReminderMethod::Email => "email",
        }
    }
}

/// A single reminder override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    /// Minutes before the event start
    pub minutes: u32,
    pub method: ReminderMethod,
}

/// Structured description of an event built from plain Rust values.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventData {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub zone: EventZone,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Attendee email addresses
    pub attendees: Vec<String>,
    pub reminder: Option<Reminder>,
}

impl CalendarEventData {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        CalendarEventData {
            start,
            end,
            zone: EventZone::default(),
            title: String::new(),
            description: None,
            location: None,
            attendees: Vec::new(),
            reminder: None,
        }
    }

    pub fn zone(mut self, zone: EventZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn attendee(mut self, email: impl Into<String>) -> Self {
        self.attendees.push(email.into());
        self
    }

    pub fn reminder(mut self, minutes: u32, method: ReminderMethod) -> Self {
        self.reminder = Some(Reminder { minutes, method });
        self
    }

    pub fn populate(&self, mut payload: RemotePayload) -> SyncResult<RemotePayload> {
        let start = format_datetime(self.zone.to_utc(self.start)?);
        let end = format_datetime(self.zone.to_utc(self.end)?);

        // An unset description or location clears the remote value
        payload.set("summary", json!(self.title));
        payload.set("description", json!(self.description));
        payload.set("location", json!(self.location));
        payload.set("start", json!({ "dateTime": start }));
        payload.set("end", json!({ "dateTime": end }));

        if !self.attendees.is_empty() {
            let merged = merge_attendees(payload.get("attendees"), &self.attendees);
            payload.set("attendees", merged);
        }

        if let Some(reminder) = &self.reminder {
            payload.set(
                "reminders",
                json!({
                    "useDefault": false,
                    "overrides": [{
                        "method": reminder.method.as_str(),
                        "minutes": reminder.minutes,
                    }],
                }),
            );
        }

        Ok(payload)
    }
}

/// Keeps existing attendee entries (and their response status) for emails
/// still on the list, and appends bare entries for new ones.
fn merge_attendees(existing: Option<&Value>, emails: &[String]) -> Value {
    let existing: &[Value] = existing
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let merged = emails
        .iter()
        .map(|email| {
            existing
                .iter()
                .find(|attendee| {
                    attendee
                        .get("email")
                        .and_then(Value::as_str)
                        .is_some_and(|e| e.eq_ignore_ascii_case(email))
                })
                .cloned()
                .unwrap_or_else(|| json!({ "email": email }))
        })
        .collect();

    Value::Array(merged)
}

/// Start and end of an event, in the remote's own representation.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    pub start: Value,
    pub end: Value,
}

impl When {
    pub fn new(start: Value, end: Value) -> Self {
        When { start, end }
    }

    pub fn date_time(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        When {
            start: json!({ "dateTime": format_datetime(start) }),
            end: json!({ "dateTime": format_datetime(end) }),
        }
    }

    /// An all-day event. `end` is exclusive.
    pub fn all_day(start: NaiveDate, end: NaiveDate) -> Self {
        When {
            start: json!({ "date": start.format("%Y-%m-%d").to_string() }),
            end: json!({ "date": end.format("%Y-%m-%d").to_string() }),
        }
    }
}

/// Remote-native event fields, applied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventData {
    pub when: When,
    pub fields: Map<String, Value>,
}

impl RawEventData {
    pub fn new(when: When) -> Self {
        RawEventData {
            when,
            fields: Map::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn populate(&self, mut payload: RemotePayload) -> RemotePayload {
        payload.set("start", self.when.start.clone());
        payload.set("end", self.when.end.clone());
        for (name, value) in &self.fields {
            payload.set(name.clone(), value.clone());
        }
        payload
    }
}

/// Event data returned by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Structured(CalendarEventData),
    Raw(RawEventData),
}

impl EventData {
    /// Merges this data onto `payload`, returning the payload to write.
    pub fn populate(&self, payload: RemotePayload) -> SyncResult<RemotePayload> {
        match self {
            EventData::Structured(data) => data.populate(payload),
            EventData::Raw(data) => Ok(data.populate(payload)),
        }
    }
}

impl From<CalendarEventData> for EventData {
    fn from(data: CalendarEventData) -> Self {
        EventData::Structured(data)
    }
}

impl From<RawEventData> for EventData {
    fn from(data: RawEventData) -> Self {
        EventData::Raw(data)
    }
}
