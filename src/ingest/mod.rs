//! The staging-merge ingestion pipeline.
//!
//! Stages run in order: [`discovery`] finds the export files, [`reader`]
//! parses them, [`transform`] enriches and deduplicates the rows,
//! [`staging`] bulk-loads them into the staging table, and [`merge`]
//! appends the novel ones to the permanent table. [`pipeline`] wires the
//! stages into a single run.

pub mod discovery;
pub mod merge;
pub mod pipeline;
pub mod reader;
pub mod staging;
pub mod transform;

pub use discovery::{FilePattern, discover};
pub use merge::{MergeReconciler, MergeReport};
pub use pipeline::{IngestPipeline, IngestReport};
pub use reader::RawEvent;
pub use staging::BulkLoader;
pub use transform::Transformer;
