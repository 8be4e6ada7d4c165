//! # event-ingest
//!
//! Staging-merge ingestion of CSV event exports into a PostgreSQL
//! warehouse.
//!
//! Each run reads every matching export file, enriches the rows with
//! client-type and event-type display names, bulk-loads them into a
//! staging table, and appends to the permanent `event` table only the rows
//! whose eight-column identity is not already stored. Nulls take part in
//! that comparison through fixed sentinels, so re-ingesting the same files
//! inserts nothing.
//!
//! ## Architecture
//!
//! ```text
//! CLI (main.rs)
//!     │
//!     ├── IngestConfig (config)
//!     │
//!     ├── IngestPipeline (ingest/)
//!     │     ├── discovery → reader → transform
//!     │     ├── BulkLoader ── staging table
//!     │     └── MergeReconciler ── event table
//!     │
//!     ├── EventRecord, IdentityKey, ReferenceData (domain/)
//!     │
//!     └── Warehouse trait (warehouse/)
//!           └── PgWarehouse (sqlx, COPY FROM STDIN)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod warehouse;
