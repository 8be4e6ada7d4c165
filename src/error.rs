//! Ingestion error types.
//!
//! [`IngestError`] is the central error type for an ingestion run. None of
//! its variants are caught internally: every failure propagates to `main`
//! and terminates the run with a non-zero exit.

use std::path::PathBuf;

use crate::warehouse::WarehouseError;

/// Failure of an ingestion run.
///
/// # Variants by stage
///
/// | Stage              | Variant                          |
/// |--------------------|----------------------------------|
/// | Configuration      | [`ConfigLoad`](Self::ConfigLoad)   |
/// | File discovery     | [`NoFilesFound`](Self::NoFilesFound) |
/// | Reading CSV input  | [`InvalidInput`](Self::InvalidInput), [`Io`](Self::Io) |
/// | Staging load       | [`BulkLoad`](Self::BulkLoad)       |
/// | Reconciliation     | [`Merge`](Self::Merge)             |
/// | Connection, DDL    | [`Warehouse`](Self::Warehouse)     |
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// No source file matched the file name pattern.
    #[error("no event files found, search pattern: [{pattern}]")]
    NoFilesFound {
        /// Pattern the file names were matched against.
        pattern: String,
    },

    /// Reference data or settings could not be loaded.
    #[error("config load error: {0}")]
    ConfigLoad(String),

    /// A source row could not be parsed.
    #[error("invalid input in {}: {reason}", path.display())]
    InvalidInput {
        /// File containing the offending row.
        path: PathBuf,
        /// Parser message, including the position when known.
        reason: String,
    },

    /// The warehouse rejected a bulk load.
    #[error("bulk load into {table} failed: {source}")]
    BulkLoad {
        /// Target table.
        table: String,
        /// Underlying warehouse failure.
        #[source]
        source: WarehouseError,
    },

    /// The staging-to-permanent reconciliation failed.
    #[error("merge failed: {0}")]
    Merge(#[source] WarehouseError),

    /// Connection or schema bootstrap failure.
    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Local file system failure.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Builds an [`IngestError::Io`] for `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
