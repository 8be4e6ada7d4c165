//! In-memory warehouse for tests.
//!
//! Understands exactly the statements built by [`WarehouseSchema`] and
//! enforces the permanent table's uniqueness constraint with PostgreSQL
//! semantics: rows conflict only when all eight identity columns are
//! non-null and equal.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use super::{RowStream, Value, Warehouse, WarehouseError, WarehouseResult, WarehouseSchema};
use crate::domain::EventRecord;
use crate::domain::timestamp::parse_timestamp;

#[derive(Debug)]
pub(crate) struct MemoryWarehouse {
    schema: WarehouseSchema,
    staging: Vec<EventRecord>,
    permanent: Vec<EventRecord>,
    log: Vec<String>,
    reject_bulk_loads: bool,
}

impl MemoryWarehouse {
    pub(crate) fn new(schema: WarehouseSchema) -> Self {
        Self {
            schema,
            staging: Vec::new(),
            permanent: Vec::new(),
            log: Vec::new(),
            reject_bulk_loads: false,
        }
    }

    pub(crate) fn staging(&self) -> &[EventRecord] {
        &self.staging
    }

    pub(crate) fn permanent(&self) -> &[EventRecord] {
        &self.permanent
    }

    /// Statements in execution order; bulk loads appear as `COPY <table>`.
    pub(crate) fn log(&self) -> &[String] {
        &self.log
    }

    pub(crate) fn seed_staging(&mut self, records: impl IntoIterator<Item = EventRecord>) {
        self.staging.extend(records);
    }

    pub(crate) fn seed_permanent(&mut self, records: impl IntoIterator<Item = EventRecord>) {
        self.permanent.extend(records);
    }

    pub(crate) fn reject_bulk_loads(&mut self) {
        self.reject_bulk_loads = true;
    }

    fn insert_permanent(&mut self, records: Vec<EventRecord>) -> WarehouseResult<()> {
        for (i, record) in records.iter().enumerate() {
            let earlier = records.iter().take(i);
            if self.permanent.iter().chain(earlier).any(|r| unique_conflict(r, record)) {
                return Err(WarehouseError::Statement(format!(
                    "duplicate key value violates unique constraint on {}",
                    self.schema.permanent_table()
                )));
            }
        }
        self.permanent.extend(records);
        Ok(())
    }
}

fn unique_conflict(a: &EventRecord, b: &EventRecord) -> bool {
    let all_present = |r: &EventRecord| {
        r.user_site_id.is_some()
            && r.client_type.is_some()
            && r.event_type.is_some()
            && r.status.is_some()
            && r.created_date.is_some()
            && r.updated_date.is_some()
    };
    all_present(a)
        && all_present(b)
        && a.event_uuid == b.event_uuid
        && a.user_guid == b.user_guid
        && a.user_site_id == b.user_site_id
        && a.client_type == b.client_type
        && a.event_type == b.event_type
        && a.status == b.status
        && a.created_date == b.created_date
        && a.updated_date == b.updated_date
}

fn decode_fields(record: &csv::StringRecord, null_token: &str) -> WarehouseResult<EventRecord> {
    let field = |i: usize| record.get(i).filter(|v| *v != null_token);
    let bad = |i: usize, e: &dyn std::fmt::Display| {
        WarehouseError::Statement(format!("invalid input for column {i}: {e}"))
    };
    let int = |i: usize| {
        field(i)
            .map(|v| v.parse::<i32>().map_err(|e| bad(i, &e)))
            .transpose()
    };
    let ts = |i: usize| {
        field(i)
            .map(|v| parse_timestamp(v).map_err(|e| bad(i, &e)))
            .transpose()
    };
    let text = |i: usize| field(i).map(str::to_string);
    let required = |i: usize| {
        text(i).ok_or_else(|| WarehouseError::Statement(format!("null value in column {i}")))
    };

    if record.len() != 10 {
        return Err(WarehouseError::Statement(format!(
            "extra or missing data: {} fields",
            record.len()
        )));
    }
    Ok(EventRecord {
        event_uuid: required(0)?,
        user_guid: required(1)?,
        user_site_id: int(2)?,
        client_type: int(3)?,
        event_type: int(4)?,
        status: text(5),
        created_date: ts(6)?,
        updated_date: ts(7)?,
        client_type_value: text(8),
        event_type_value: text(9),
    })
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&mut self, statement: &str) -> WarehouseResult<u64> {
        self.log.push(statement.to_string());
        if statement == self.schema.clear_staging() {
            let removed = self.staging.len() as u64;
            self.staging.clear();
            Ok(removed)
        } else if statement == self.schema.create_ddl() {
            Ok(0)
        } else {
            Err(WarehouseError::Statement(format!("unsupported statement: {statement}")))
        }
    }

    fn query<'a>(&'a mut self, statement: &'a str) -> RowStream<'a> {
        self.log.push(statement.to_string());
        let schema = &self.schema;

        let rows: WarehouseResult<Vec<_>> = if statement == schema.count_rows(schema.staging_table()) {
            Ok(vec![vec![Value::Integer(self.staging.len() as i64)]])
        } else if statement == schema.count_rows(schema.permanent_table()) {
            Ok(vec![vec![Value::Integer(self.permanent.len() as i64)]])
        } else if statement == schema.select_staging() {
            Ok(self.staging.iter().map(EventRecord::to_row).collect())
        } else if statement == schema.select_merge_candidates() {
            Ok(self
                .permanent
                .iter()
                .filter(|p| self.staging.iter().any(|s| s.event_uuid == p.event_uuid))
                .map(EventRecord::to_row)
                .collect())
        } else {
            Err(WarehouseError::Statement(format!("unsupported query: {statement}")))
        };

        match rows {
            Ok(rows) => stream::iter(rows.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn bulk_load(
        &mut self,
        table: &str,
        path: &Path,
        separator: char,
        null_token: &str,
    ) -> WarehouseResult<u64> {
        self.log.push(format!("COPY {table}"));
        if self.reject_bulk_loads {
            return Err(WarehouseError::Statement("bulk load rejected".to_string()));
        }

        let mut delimiter = [0u8; 4];
        let delimiter = separator.encode_utf8(&mut delimiter).as_bytes();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter.first().copied().unwrap_or(b','))
            .from_path(path)
            .map_err(|e| WarehouseError::Io(std::io::Error::from(e)))?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| WarehouseError::Statement(e.to_string()))?;
            records.push(decode_fields(&row, null_token)?);
        }
        let loaded = records.len() as u64;

        if table == self.schema.staging_table() {
            self.staging.extend(records);
        } else if table == self.schema.permanent_table() {
            self.insert_permanent(records)?;
        } else {
            return Err(WarehouseError::Statement(format!(
                "relation \"{table}\" does not exist"
            )));
        }
        Ok(loaded)
    }
}
