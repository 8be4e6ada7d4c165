//! PostgreSQL implementation of the warehouse collaborator.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_util::StreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row as _, TypeInfo};

use super::{Row, RowStream, Value, Warehouse, WarehouseError, WarehouseResult};
use crate::config::WarehouseSettings;

/// Single PostgreSQL connection held for the duration of a run.
///
/// Opened with [`PgWarehouse::connect`] and released with
/// [`PgWarehouse::close`]. Dropping the handle without closing it still
/// tears the socket down, just without the graceful terminate message.
#[derive(Debug)]
pub struct PgWarehouse {
    conn: PgConnection,
}

impl PgWarehouse {
    /// Opens a connection from the five connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Connection`] if the server is unreachable
    /// or rejects the credentials.
    pub async fn connect(settings: &WarehouseSettings) -> WarehouseResult<Self> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(settings.password());

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "connected to warehouse"
        );
        Ok(Self { conn })
    }

    /// Opens a connection from a `postgres://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Connection`] on failure.
    pub async fn connect_url(url: &str) -> WarehouseResult<Self> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Closes the connection gracefully.
    ///
    /// A failure here is logged rather than returned: the run's own
    /// outcome has already been decided when the handle is released.
    pub async fn close(self) {
        match self.conn.close().await {
            Ok(()) => tracing::debug!("warehouse connection closed"),
            Err(e) => tracing::warn!(error = %e, "closing warehouse connection failed"),
        }
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&mut self, statement: &str) -> WarehouseResult<u64> {
        let conn: &mut PgConnection = &mut self.conn;
        let result = sqlx::Executor::execute(conn, sqlx::raw_sql(statement))
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    fn query<'a>(&'a mut self, statement: &'a str) -> RowStream<'a> {
        sqlx::query(statement)
            .fetch(&mut self.conn)
            .map(|row| row.map_err(statement_error).and_then(|row| decode_row(&row)))
            .boxed()
    }

    async fn bulk_load(
        &mut self,
        table: &str,
        path: &Path,
        separator: char,
        null_token: &str,
    ) -> WarehouseResult<u64> {
        let data = tokio::fs::read(path).await?;
        let statement = copy_statement(table, separator, null_token);

        let mut copy = self
            .conn
            .copy_in_raw(&statement)
            .await
            .map_err(statement_error)?;

        let sent = copy.send(data).await.map(|_| ());
        if let Err(e) = sent {
            if let Err(abort) = copy.abort(e.to_string()).await {
                tracing::debug!(error = %abort, "copy abort reported an error");
            }
            return Err(statement_error(e));
        }

        let loaded = copy.finish().await.map_err(statement_error)?;
        tracing::debug!(table, rows = loaded, "copy finished");
        Ok(loaded)
    }
}

fn statement_error(e: sqlx::Error) -> WarehouseError {
    WarehouseError::Statement(e.to_string())
}

/// `COPY ... FROM STDIN` in CSV format, so quoted fields may carry the
/// separator.
fn copy_statement(table: &str, separator: char, null_token: &str) -> String {
    format!(
        "COPY {table} FROM STDIN WITH (FORMAT csv, DELIMITER {}, NULL {})",
        quote_literal(&separator.to_string()),
        quote_literal(null_token),
    )
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn decode_row(row: &PgRow) -> WarehouseResult<Row> {
    row.columns()
        .iter()
        .map(|column| decode_value(row, column.ordinal(), column.type_info().name()))
        .collect()
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> WarehouseResult<Value> {
    let value = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|n| Value::Integer(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|n| Value::Integer(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(Value::Integer)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::Text)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(Value::Timestamp)),
        other => {
            return Err(WarehouseError::Decode(format!(
                "unsupported column type {other} at position {idx}"
            )));
        }
    };
    value
        .map(|v| v.unwrap_or(Value::Null))
        .map_err(|e| WarehouseError::Decode(e.to_string()))
}
