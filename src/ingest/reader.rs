//! Reading event export files.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::domain::timestamp;
use crate::error::IngestError;

/// One row of an event export, before enrichment.
///
/// Columns are matched by header name; unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
    /// Event identifier.
    pub event_uuid: String,
    /// User identifier.
    pub user_guid: String,
    /// Linked site, if any.
    pub user_site_id: Option<i32>,
    /// Client type code.
    pub client_type: i32,
    /// Event type code.
    pub event_type: i32,
    /// Status code.
    pub status: i32,
    /// Creation time.
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_date: Option<NaiveDateTime>,
    /// Last update time.
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub updated_date: Option<NaiveDateTime>,
}

/// Reads one export file.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be opened and
/// [`IngestError::InvalidInput`] for a row that does not parse.
pub fn read_file(path: &Path) -> Result<Vec<RawEvent>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let rows = reader
        .deserialize::<RawEvent>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| csv_error(path, e))?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "event file read");
    Ok(rows)
}

/// Reads every file and unions the rows in file order.
///
/// # Errors
///
/// Fails on the first file that [`read_file`] rejects.
pub fn read_all(paths: &[PathBuf]) -> Result<Vec<RawEvent>, IngestError> {
    let mut rows = Vec::new();
    for path in paths {
        rows.extend(read_file(path)?);
    }
    tracing::info!(files = paths.len(), rows = rows.len(), "event files read");
    Ok(rows)
}

fn csv_error(path: &Path, e: csv::Error) -> IngestError {
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => IngestError::io(path, source),
        _ => IngestError::InvalidInput {
            path: path.to_path_buf(),
            reason,
        },
    }
}
