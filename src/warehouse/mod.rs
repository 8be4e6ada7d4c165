//! Warehouse collaborator: the database connection seen by the pipeline.
//!
//! The pipeline never talks to a driver directly. It sees a [`Warehouse`]
//! with three operations (execute, streaming query, bulk load) and the
//! statement builders in [`schema`]. [`postgres::PgWarehouse`] is the
//! production backend.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;
pub mod schema;

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;

pub use postgres::PgWarehouse;
pub use schema::WarehouseSchema;

/// Error raised by a warehouse backend.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Could not open or close the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The database rejected a statement.
    #[error("statement failed: {0}")]
    Statement(String),

    /// A result value did not have the expected shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Reading a bulk-load file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// A single column value as returned by [`Warehouse::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Any integer column, widened to `i64`.
    Integer(i64),
    /// Any character column.
    Text(String),
    /// `timestamp without time zone`.
    Timestamp(NaiveDateTime),
}

/// One result row, values in select-list order.
pub type Row = Vec<Value>;

/// Lazy, single-pass stream of result rows.
pub type RowStream<'a> = BoxStream<'a, WarehouseResult<Row>>;

/// Database connection used by an ingestion run.
///
/// Statements are auto-committed as they execute; there is no explicit
/// transaction control. Implementations hold one connection and run
/// statements strictly in call order.
#[async_trait]
pub trait Warehouse: Send {
    /// Runs `statement` (possibly several `;`-separated statements) and
    /// returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Statement`] if the database rejects it.
    async fn execute(&mut self, statement: &str) -> WarehouseResult<u64>;

    /// Runs `statement` and streams its rows.
    ///
    /// The stream borrows the connection; it must be dropped before the
    /// next statement is issued.
    fn query<'a>(&'a mut self, statement: &'a str) -> RowStream<'a>;

    /// Loads the delimited file at `path` into `table`, bypassing
    /// row-by-row inserts. Fields equal to `null_token` load as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Io`] if the file cannot be read and
    /// [`WarehouseError::Statement`] if the database rejects the data.
    async fn bulk_load(
        &mut self,
        table: &str,
        path: &Path,
        separator: char,
        null_token: &str,
    ) -> WarehouseResult<u64>;
}

/// Runs a `SELECT COUNT(*)` style statement and returns the single value.
///
/// # Errors
///
/// Propagates query failures, and returns [`WarehouseError::Decode`] if
/// the first column of the first row is not a non-negative integer.
pub async fn query_count<W>(warehouse: &mut W, statement: &str) -> WarehouseResult<u64>
where
    W: Warehouse + ?Sized,
{
    let mut rows = warehouse.query(statement);
    let Some(row) = rows.try_next().await? else {
        return Err(WarehouseError::Decode(format!(
            "count query returned no rows: {statement}"
        )));
    };
    match row.first() {
        Some(Value::Integer(n)) => u64::try_from(*n)
            .map_err(|_| WarehouseError::Decode(format!("negative count {n}"))),
        other => Err(WarehouseError::Decode(format!(
            "expected integer count, got {other:?}"
        ))),
    }
}
