//! Bulk loading records through a scratch delimited file.
//!
//! The scratch file has no header and no column list is passed to the
//! load, so fields are written in exact table column order
//! ([`EventRecord::text_fields`]). Reordering columns breaks the load.

use std::path::{Path, PathBuf};

use crate::domain::EventRecord;
use crate::error::IngestError;
use crate::warehouse::Warehouse;

/// Field separator of scratch files.
pub const SEPARATOR: u8 = b',';

/// Field value that loads as `NULL`.
pub const NULL_TOKEN: &str = "";

/// Writes records to a scratch file and bulk-loads them into a table.
#[derive(Debug, Clone)]
pub struct BulkLoader {
    scratch_path: PathBuf,
}

impl BulkLoader {
    /// Creates a loader using `scratch_path` for its intermediate file.
    #[must_use]
    pub fn new(scratch_path: impl Into<PathBuf>) -> Self {
        Self {
            scratch_path: scratch_path.into(),
        }
    }

    /// Scratch file location.
    #[must_use]
    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Loads `records` into `table` and returns the rows loaded.
    ///
    /// The scratch file is removed before returning, whether or not the
    /// load succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`] if the scratch file cannot be written
    /// and [`IngestError::BulkLoad`] if the warehouse rejects the load.
    pub async fn load<W>(
        &self,
        warehouse: &mut W,
        table: &str,
        records: &[EventRecord],
    ) -> Result<u64, IngestError>
    where
        W: Warehouse + ?Sized,
    {
        let scratch = ScratchFile::new(&self.scratch_path);
        write_scratch(scratch.path(), records)?;

        let loaded = warehouse
            .bulk_load(table, scratch.path(), char::from(SEPARATOR), NULL_TOKEN)
            .await
            .map_err(|source| IngestError::BulkLoad {
                table: table.to_string(),
                source,
            })?;

        tracing::info!(table, rows = loaded, "bulk load complete");
        Ok(loaded)
    }
}

/// Writes `records` without a header, `NULL` as [`NULL_TOKEN`].
///
/// # Errors
///
/// Returns [`IngestError::Io`] on any write failure.
pub fn write_scratch(path: &Path, records: &[EventRecord]) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
    }

    let to_io = |e: csv::Error| IngestError::io(path, std::io::Error::from(e));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(SEPARATOR)
        .from_path(path)
        .map_err(to_io)?;

    for record in records {
        let fields = record.text_fields();
        writer
            .write_record(fields.iter().map(|f| f.as_deref().unwrap_or(NULL_TOKEN)))
            .map_err(to_io)?;
    }
    writer.flush().map_err(|e| IngestError::io(path, e))
}

/// Removes the scratch file when dropped.
struct ScratchFile<'a> {
    path: &'a Path,
}

impl<'a> ScratchFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        self.path
    }
}

impl Drop for ScratchFile<'_> {
    fn drop(&mut self) {
        match std::fs::remove_file(self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "scratch file not removed"),
        }
    }
}
