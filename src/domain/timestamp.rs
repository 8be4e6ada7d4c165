//! Parsing and rendering of `timestamp without time zone` values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Textual form used in scratch files: `YYYY-MM-DD HH:MM:SS[.ffffff]`.
pub const RENDER_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parses a timestamp as found in event exports.
///
/// Accepts a space or `T` separated date-time with optional fraction,
/// RFC 3339 (the offset is dropped and the wall-clock time kept, as a
/// `timestamp without time zone` column does), or a bare date at
/// midnight.
///
/// # Errors
///
/// Returns the parse error of the last attempted format (bare date).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let raw = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_local());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
}

/// Renders `ts` in [`RENDER_FORMAT`].
#[must_use]
pub fn render_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(RENDER_FORMAT).to_string()
}

/// `serde` adapter for optional timestamp columns in CSV input.
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {value:?}: {e}"))),
    }
}
