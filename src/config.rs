//! Ingestion configuration loaded from environment variables.
//!
//! Connection credentials come from a local `.env` file (via `dotenvy`)
//! or the process environment, never from the command line. Pipeline
//! paths have defaults and can be overridden the same way.

use std::fmt;
use std::path::PathBuf;

use crate::error::IngestError;
use crate::warehouse::schema::{self, DEFAULT_SCHEMA, WarehouseSchema};

/// Default client-type reference file.
pub const DEFAULT_CLIENT_TYPES: &str = "data/ClientType.json";

/// Default event-type reference file.
pub const DEFAULT_EVENT_TYPES: &str = "data/EventType.json";

/// Default source file name pattern.
pub const DEFAULT_FILE_PATTERN: &str = r"event_\d{10}\.csv";

/// Default scratch file for bulk loads.
pub const DEFAULT_SCRATCH_FILE: &str = "data/event_staging_temp.csv";

/// Top-level configuration.
///
/// Loaded once at startup via [`IngestConfig::from_env`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Database connection parameters.
    pub warehouse: WarehouseSettings,
    /// File locations and table layout for the pipeline.
    pub pipeline: PipelineSettings,
}

/// The five connection parameters.
#[derive(Clone)]
pub struct WarehouseSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Login role.
    pub user: String,
    password: String,
}

impl WarehouseSettings {
    /// Creates settings from explicit values.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for WarehouseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

/// Settings consumed by [`crate::ingest::IngestPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Client-type reference JSON.
    pub client_types_path: PathBuf,
    /// Event-type reference JSON.
    pub event_types_path: PathBuf,
    /// Regular expression a source file name must match in full.
    pub file_pattern: String,
    /// Scratch file written before each bulk load and removed after it.
    pub scratch_path: PathBuf,
    /// Table layout.
    pub schema: WarehouseSchema,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            client_types_path: PathBuf::from(DEFAULT_CLIENT_TYPES),
            event_types_path: PathBuf::from(DEFAULT_EVENT_TYPES),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            scratch_path: PathBuf::from(DEFAULT_SCRATCH_FILE),
            schema: WarehouseSchema::new(DEFAULT_SCHEMA),
        }
    }
}

impl IngestConfig {
    /// Loads configuration from the environment.
    ///
    /// Calls `dotenvy::dotenv().ok()` first so a `.env` file in the
    /// working directory is picked up when present.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ConfigLoad`] if a connection parameter is
    /// missing, the port is not a valid `u16`, or the schema name is not
    /// a plain identifier.
    pub fn from_env() -> Result<Self, IngestError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`IngestConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| IngestError::ConfigLoad(format!("missing environment variable {key}")))
        };

        let port = required("WAREHOUSE_PORT")?;
        let port: u16 = port
            .parse()
            .map_err(|_| IngestError::ConfigLoad(format!("WAREHOUSE_PORT is not a port: {port}")))?;

        let warehouse = WarehouseSettings {
            host: required("WAREHOUSE_HOST")?,
            port,
            database: required("WAREHOUSE_DATABASE")?,
            user: required("WAREHOUSE_USER")?,
            password: required("WAREHOUSE_PASSWORD")?,
        };

        let schema_name = lookup("WAREHOUSE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        if !schema::is_identifier(&schema_name) {
            return Err(IngestError::ConfigLoad(format!(
                "WAREHOUSE_SCHEMA is not a plain identifier: {schema_name}"
            )));
        }

        let path_or = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        let pipeline = PipelineSettings {
            client_types_path: path_or("INGEST_CLIENT_TYPES", DEFAULT_CLIENT_TYPES),
            event_types_path: path_or("INGEST_EVENT_TYPES", DEFAULT_EVENT_TYPES),
            file_pattern: lookup("INGEST_FILE_PATTERN")
                .unwrap_or_else(|| DEFAULT_FILE_PATTERN.to_string()),
            scratch_path: path_or("INGEST_SCRATCH_FILE", DEFAULT_SCRATCH_FILE),
            schema: WarehouseSchema::new(schema_name),
        };

        Ok(Self {
            warehouse,
            pipeline,
        })
    }
}
