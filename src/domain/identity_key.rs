//! Null-safe composite identity of an event.
//!
//! Two records are the same logical event iff all eight identity columns
//! are equal after each `NULL` is replaced by a per-column sentinel:
//!
//! | column                          | sentinel for `NULL`        |
//! |---------------------------------|----------------------------|
//! | `user_site_id`, `client_type`, `event_type` | `-1`           |
//! | `status`                        | `""`                       |
//! | `created_date`, `updated_date`  | current date, `00:00:00`   |
//!
//! Consequently a `NULL` matches the sentinel itself: a `user_site_id` of
//! `-1` is the same identity as a missing one, and a missing timestamp is
//! the same identity as midnight of the comparison day. The date sentinel
//! is fixed once per comparison pass through [`Sentinels`], so both sides
//! of a comparison always substitute the same value.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use super::EventRecord;

/// Sentinel for missing integer columns.
pub const NULL_INTEGER: i32 = -1;

/// Sentinel for a missing `status`.
pub const NULL_STATUS: &str = "";

/// Substitution values for one comparison pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    timestamp: NaiveDateTime,
}

impl Sentinels {
    /// Sentinels using midnight of `date` for missing timestamps.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            timestamp: date.and_time(NaiveTime::MIN),
        }
    }

    /// Sentinels for the current local date.
    #[must_use]
    pub fn today() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// Substitute for a missing timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// The eight identity columns with sentinels substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    event_uuid: String,
    user_guid: String,
    user_site_id: i32,
    client_type: i32,
    event_type: i32,
    status: String,
    created_date: NaiveDateTime,
    updated_date: NaiveDateTime,
}

impl IdentityKey {
    /// Builds the key of `record`.
    #[must_use]
    pub fn new(record: &EventRecord, sentinels: &Sentinels) -> Self {
        Self {
            event_uuid: record.event_uuid.clone(),
            user_guid: record.user_guid.clone(),
            user_site_id: record.user_site_id.unwrap_or(NULL_INTEGER),
            client_type: record.client_type.unwrap_or(NULL_INTEGER),
            event_type: record.event_type.unwrap_or(NULL_INTEGER),
            status: record
                .status
                .clone()
                .unwrap_or_else(|| NULL_STATUS.to_string()),
            created_date: record.created_date.unwrap_or(sentinels.timestamp),
            updated_date: record.updated_date.unwrap_or(sentinels.timestamp),
        }
    }

    /// The `event_uuid` component.
    #[must_use]
    pub fn event_uuid(&self) -> &str {
        &self.event_uuid
    }
}
