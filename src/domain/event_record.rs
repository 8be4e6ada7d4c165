//! The event record: one row of `event_staging` or `event`.

use chrono::NaiveDateTime;

use super::identity_key::{IdentityKey, Sentinels};
use super::timestamp::render_timestamp;
use crate::warehouse::{Row, Value, WarehouseError, WarehouseResult};

/// One event row, fields in table column order.
///
/// Equality and hashing cover all ten columns, which is what the
/// transformer's full-row dedup needs. Logical identity is different;
/// see [`EventRecord::identity_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventRecord {
    /// Event identifier (not unique on its own).
    pub event_uuid: String,
    /// User identifier.
    pub user_guid: String,
    /// Linked site, if any.
    pub user_site_id: Option<i32>,
    /// Client type code.
    pub client_type: Option<i32>,
    /// Event type code.
    pub event_type: Option<i32>,
    /// Status code rendered as text.
    pub status: Option<String>,
    /// Creation time.
    pub created_date: Option<NaiveDateTime>,
    /// Last update time.
    pub updated_date: Option<NaiveDateTime>,
    /// Display name for `client_type`.
    pub client_type_value: Option<String>,
    /// Display name for `event_type`.
    pub event_type_value: Option<String>,
}

impl EventRecord {
    /// Null-safe identity of this record under `sentinels`.
    #[must_use]
    pub fn identity_key(&self, sentinels: &Sentinels) -> IdentityKey {
        IdentityKey::new(self, sentinels)
    }

    /// Columns as text, `None` for `NULL`, in table order.
    #[must_use]
    pub fn text_fields(&self) -> [Option<String>; 10] {
        [
            Some(self.event_uuid.clone()),
            Some(self.user_guid.clone()),
            self.user_site_id.map(|v| v.to_string()),
            self.client_type.map(|v| v.to_string()),
            self.event_type.map(|v| v.to_string()),
            self.status.clone(),
            self.created_date.as_ref().map(render_timestamp),
            self.updated_date.as_ref().map(render_timestamp),
            self.client_type_value.clone(),
            self.event_type_value.clone(),
        ]
    }

    /// Columns as warehouse values, in table order.
    #[must_use]
    pub fn to_row(&self) -> Row {
        let int = |v: Option<i32>| v.map_or(Value::Null, |n| Value::Integer(n.into()));
        let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
        let ts = |v: Option<NaiveDateTime>| v.map_or(Value::Null, Value::Timestamp);
        vec![
            Value::Text(self.event_uuid.clone()),
            Value::Text(self.user_guid.clone()),
            int(self.user_site_id),
            int(self.client_type),
            int(self.event_type),
            text(&self.status),
            ts(self.created_date),
            ts(self.updated_date),
            text(&self.client_type_value),
            text(&self.event_type_value),
        ]
    }
}

impl TryFrom<Row> for EventRecord {
    type Error = WarehouseError;

    /// Decodes a row selected in table column order.
    fn try_from(row: Row) -> WarehouseResult<Self> {
        if row.len() != 10 {
            return Err(WarehouseError::Decode(format!(
                "event row has {} columns, expected 10",
                row.len()
            )));
        }
        let mut values = row.into_iter();
        let mut next = |column: &'static str| {
            values
                .next()
                .map(|value| (column, value))
                .ok_or_else(|| WarehouseError::Decode(format!("missing column {column}")))
        };

        Ok(Self {
            event_uuid: required_text(next("event_uuid")?)?,
            user_guid: required_text(next("user_guid")?)?,
            user_site_id: integer(next("user_site_id")?)?,
            client_type: integer(next("client_type")?)?,
            event_type: integer(next("event_type")?)?,
            status: text(next("status")?)?,
            created_date: timestamp(next("created_date")?)?,
            updated_date: timestamp(next("updated_date")?)?,
            client_type_value: text(next("client_type_value")?)?,
            event_type_value: text(next("event_type_value")?)?,
        })
    }
}

fn mismatch(column: &str, expected: &str, value: &Value) -> WarehouseError {
    WarehouseError::Decode(format!("{column}: expected {expected}, got {value:?}"))
}

fn required_text((column, value): (&str, Value)) -> WarehouseResult<String> {
    text((column, value))?.ok_or_else(|| WarehouseError::Decode(format!("{column} is NULL")))
}

fn text((column, value): (&str, Value)) -> WarehouseResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(mismatch(column, "text", &other)),
    }
}

fn integer((column, value): (&str, Value)) -> WarehouseResult<Option<i32>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(n) => i32::try_from(n)
            .map(Some)
            .map_err(|_| WarehouseError::Decode(format!("{column}: {n} out of range"))),
        other => Err(mismatch(column, "integer", &other)),
    }
}

fn timestamp((column, value): (&str, Value)) -> WarehouseResult<Option<NaiveDateTime>> {
    match value {
        Value::Null => Ok(None),
        Value::Timestamp(ts) => Ok(Some(ts)),
        other => Err(mismatch(column, "timestamp", &other)),
    }
}
