//! Table layout and the SQL statements issued by the pipeline.
//!
//! Both tables share one ordinal column layout ([`EVENT_COLUMNS`]). Bulk
//! loads rely on it: delimited files carry no header and no column list,
//! so the field order of every scratch file must match the DDL below.

/// Default schema holding both event tables.
pub const DEFAULT_SCHEMA: &str = "personal_capital";

/// Transient landing table.
pub const STAGING_TABLE: &str = "event_staging";

/// Permanent, append-only event log.
pub const PERMANENT_TABLE: &str = "event";

/// Column order of both tables.
pub const EVENT_COLUMNS: [&str; 10] = [
    "event_uuid",
    "user_guid",
    "user_site_id",
    "client_type",
    "event_type",
    "status",
    "created_date",
    "updated_date",
    "client_type_value",
    "event_type_value",
];

/// Columns whose combined value defines logical record equality.
pub const IDENTITY_COLUMNS: [&str; 8] = [
    "event_uuid",
    "user_guid",
    "user_site_id",
    "client_type",
    "event_type",
    "status",
    "created_date",
    "updated_date",
];

/// Qualified table names and statement builders for one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSchema {
    name: String,
    staging: String,
    permanent: String,
}

impl WarehouseSchema {
    /// Creates the layout for `schema`.
    ///
    /// The name is interpolated into SQL unquoted; callers validate it
    /// (see [`is_identifier`]).
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        let name = schema.into();
        Self {
            staging: format!("{name}.{STAGING_TABLE}"),
            permanent: format!("{name}.{PERMANENT_TABLE}"),
            name,
        }
    }

    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified staging table name.
    #[must_use]
    pub fn staging_table(&self) -> &str {
        &self.staging
    }

    /// Qualified permanent table name.
    #[must_use]
    pub fn permanent_table(&self) -> &str {
        &self.permanent
    }

    /// Idempotent bootstrap of the schema and both tables.
    #[must_use]
    pub fn create_ddl(&self) -> String {
        let columns = "\
    event_uuid varchar(100) NOT NULL,
    user_guid varchar(100) NOT NULL,
    user_site_id integer,
    client_type integer,
    event_type integer,
    status varchar(100),
    created_date timestamp without time zone,
    updated_date timestamp without time zone,
    client_type_value varchar(100),
    event_type_value varchar(100)";
        format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};\n\
             CREATE TABLE IF NOT EXISTS {staging} (\n{columns}\n);\n\
             CREATE TABLE IF NOT EXISTS {permanent} (\n{columns},\n    UNIQUE ({identity})\n);",
            schema = self.name,
            staging = self.staging,
            permanent = self.permanent,
            identity = IDENTITY_COLUMNS.join(", "),
        )
    }

    /// `SELECT COUNT(*)` over `table`.
    #[must_use]
    pub fn count_rows(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {table}")
    }

    /// Every staging row, columns in [`EVENT_COLUMNS`] order.
    #[must_use]
    pub fn select_staging(&self) -> String {
        format!("SELECT {} FROM {}", EVENT_COLUMNS.join(", "), self.staging)
    }

    /// Permanent rows sharing an `event_uuid` with staging.
    ///
    /// Narrows the comparison set only; matching still uses the full
    /// identity key.
    #[must_use]
    pub fn select_merge_candidates(&self) -> String {
        let columns: Vec<String> = EVENT_COLUMNS.iter().map(|c| format!("e.{c}")).collect();
        format!(
            "SELECT {} FROM {} AS e WHERE e.event_uuid IN (SELECT DISTINCT event_uuid FROM {})",
            columns.join(", "),
            self.permanent,
            self.staging,
        )
    }

    /// Removes every staging row.
    #[must_use]
    pub fn clear_staging(&self) -> String {
        format!("DELETE FROM {}", self.staging)
    }
}

impl Default for WarehouseSchema {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

/// Returns `true` if `name` is a plain unquoted SQL identifier.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
