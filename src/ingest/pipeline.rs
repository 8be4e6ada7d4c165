//! One ingestion run, end to end.

use std::fmt;
use std::path::{Path, PathBuf};

use super::discovery::{self, FilePattern};
use super::merge::{MergeReconciler, MergeReport};
use super::reader;
use super::staging::BulkLoader;
use super::transform::Transformer;
use crate::config::PipelineSettings;
use crate::domain::ReferenceData;
use crate::error::IngestError;
use crate::warehouse::{Warehouse, WarehouseSchema};

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Source files read.
    pub files: usize,
    /// Rows read across all files.
    pub rows_read: usize,
    /// Rows bulk-loaded into staging after dedup.
    pub rows_staged: u64,
    /// Reconciliation counts.
    pub merge: MergeReport,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.merge, f)
    }
}

/// Discovery → read → transform → stage → merge.
///
/// Built with [`IngestPipeline::prepare`], which resolves the input files
/// and reference data up front so configuration errors surface before a
/// connection is opened.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    files: Vec<PathBuf>,
    schema: WarehouseSchema,
    transformer: Transformer,
    loader: BulkLoader,
    reconciler: MergeReconciler,
}

impl IngestPipeline {
    /// Discovers files under `source` and loads reference data.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NoFilesFound`] if nothing matches and
    /// [`IngestError::ConfigLoad`] for a bad pattern or reference file.
    pub fn prepare(source: &Path, settings: &PipelineSettings) -> Result<Self, IngestError> {
        let pattern = FilePattern::new(&settings.file_pattern)?;
        let files = discovery::discover(source, &pattern)?;
        let reference =
            ReferenceData::load(&settings.client_types_path, &settings.event_types_path)?;
        Ok(Self::new(files, reference, settings))
    }

    /// Assembles a pipeline from already-resolved inputs.
    #[must_use]
    pub fn new(files: Vec<PathBuf>, reference: ReferenceData, settings: &PipelineSettings) -> Self {
        let loader = BulkLoader::new(&settings.scratch_path);
        Self {
            files,
            schema: settings.schema.clone(),
            transformer: Transformer::new(reference),
            reconciler: MergeReconciler::new(settings.schema.clone(), loader.clone()),
            loader,
        }
    }

    /// Files this run will read.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Executes the run against `warehouse`.
    ///
    /// Input files are parsed before any statement is issued. The schema
    /// bootstrap runs next, then the staging load and the merge.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of any stage; nothing is retried.
    pub async fn run<W>(&self, warehouse: &mut W) -> Result<IngestReport, IngestError>
    where
        W: Warehouse + ?Sized,
    {
        let raw = reader::read_all(&self.files)?;
        let rows_read = raw.len();
        let records = self.transformer.transform(raw);

        warehouse.execute(&self.schema.create_ddl()).await?;

        let rows_staged = self
            .loader
            .load(warehouse, self.schema.staging_table(), &records)
            .await?;
        let merge = self.reconciler.reconcile(warehouse).await?;

        Ok(IngestReport {
            files: self.files.len(),
            rows_read,
            rows_staged,
            merge,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::warehouse::memory::MemoryWarehouse;

    const HEADER: &str =
        "event_uuid,user_guid,user_site_id,client_type,event_type,status,created_date,updated_date";
    const SCENARIO_ROW: &str = "E1,U1,,1,1,100,2024-01-01T00:00:00,";

    struct Workspace {
        dir: tempfile::TempDir,
        settings: PipelineSettings,
    }

    impl Workspace {
        fn new() -> Self {
            let Ok(dir) = tempfile::tempdir() else {
                panic!("tempdir");
            };
            let clients = dir.path().join("ClientType.json");
            let events = dir.path().join("EventType.json");
            write(&clients, r#"[{"ordinal": 1, "name": "Desktop"}]"#);
            write(&events, r#"[{"ordinal": 1, "name": "Account_Linked"}]"#);
            let settings = PipelineSettings {
                client_types_path: clients,
                event_types_path: events,
                scratch_path: dir.path().join("event_staging_temp.csv"),
                ..PipelineSettings::default()
            };
            if let Err(e) = std::fs::create_dir(dir.path().join("exports")) {
                panic!("mkdir: {e}");
            }
            Self { dir, settings }
        }

        fn exports(&self) -> PathBuf {
            self.dir.path().join("exports")
        }

        fn export(&self, name: &str, rows: &[&str]) -> PathBuf {
            let path = self.exports().join(name);
            let mut body = String::from(HEADER);
            for row in rows {
                body.push('\n');
                body.push_str(row);
            }
            write(&path, &body);
            path
        }

        fn pipeline(&self, source: &Path) -> IngestPipeline {
            match IngestPipeline::prepare(source, &self.settings) {
                Ok(p) => p,
                Err(e) => panic!("prepare failed: {e}"),
            }
        }
    }

    fn write(path: &Path, body: &str) {
        if let Err(e) = std::fs::write(path, body) {
            panic!("write {}: {e}", path.display());
        }
    }

    async fn run(pipeline: &IngestPipeline, warehouse: &mut MemoryWarehouse) -> IngestReport {
        match pipeline.run(warehouse).await {
            Ok(report) => report,
            Err(e) => panic!("run failed: {e}"),
        }
    }

    #[tokio::test]
    async fn scenario_inserts_once_then_nothing() {
        let ws = Workspace::new();
        let file = ws.export("event_1700000000.csv", &[SCENARIO_ROW]);
        let pipeline = ws.pipeline(&file);
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());

        let first = run(&pipeline, &mut warehouse).await;
        assert_eq!(first.merge, MergeReport { staging_count: 1, inserted: 1 });
        assert_eq!(
            first.to_string(),
            "1 records loaded into staging. 1 inserted into event table."
        );

        let Some(stored) = warehouse.permanent().first() else {
            panic!("one stored row expected");
        };
        assert_eq!(stored.client_type_value.as_deref(), Some("Desktop"));
        assert_eq!(stored.event_type_value.as_deref(), Some("Account Linked"));
        assert_eq!(stored.user_site_id, None);
        assert_eq!(stored.updated_date, None);

        let second = run(&pipeline, &mut warehouse).await;
        assert_eq!(second.merge, MergeReport { staging_count: 1, inserted: 0 });
        assert_eq!(warehouse.permanent().len(), 1);
        assert!(!ws.settings.scratch_path.exists());
    }

    #[tokio::test]
    async fn reingesting_a_directory_is_idempotent() {
        let ws = Workspace::new();
        ws.export(
            "event_1700000000.csv",
            &[SCENARIO_ROW, "E2,U2,4,2,3,200,2024-01-02 10:00:00,2024-01-03 11:30:00"],
        );
        ws.export(
            "event_1700000100.csv",
            &[SCENARIO_ROW, "E3,U3,,9,1,300,,"],
        );
        let pipeline = ws.pipeline(&ws.exports());
        assert_eq!(pipeline.files().len(), 2);
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());

        let first = run(&pipeline, &mut warehouse).await;
        assert_eq!(first.rows_read, 4);
        assert_eq!(first.rows_staged, 3);
        assert_eq!(first.merge.inserted, 3);

        let second = run(&pipeline, &mut warehouse).await;
        assert_eq!(second.merge.inserted, 0);
        assert_eq!(warehouse.permanent().len(), 3);

        let unmapped = warehouse.permanent().iter().find(|r| r.event_uuid == "E3");
        let Some(unmapped) = unmapped else {
            panic!("E3 stored");
        };
        assert_eq!(unmapped.client_type_value.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn updated_date_change_adds_a_second_row() {
        let ws = Workspace::new();
        let original = ws.export("event_1700000000.csv", &[SCENARIO_ROW]);
        let updated = ws.export(
            "event_1700000100.csv",
            &["E1,U1,,1,1,100,2024-01-01T00:00:00,2024-02-01T12:00:00"],
        );
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());

        let _ = run(&ws.pipeline(&original), &mut warehouse).await;
        let report = run(&ws.pipeline(&updated), &mut warehouse).await;
        assert_eq!(report.merge.inserted, 1);
        assert_eq!(warehouse.permanent().len(), 2);
    }

    #[tokio::test]
    async fn leftover_staging_is_reconciled_with_the_next_run() {
        let ws = Workspace::new();
        let file = ws.export("event_1700000000.csv", &[SCENARIO_ROW]);
        let pipeline = ws.pipeline(&file);
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());

        let _ = run(&pipeline, &mut warehouse).await;
        let Some(stored) = warehouse.permanent().first().cloned() else {
            panic!("one stored row expected");
        };
        warehouse.seed_staging([stored]);

        let report = run(&pipeline, &mut warehouse).await;
        assert_eq!(report.merge, MergeReport { staging_count: 2, inserted: 0 });
        assert!(warehouse.staging().is_empty());
    }

    #[tokio::test]
    async fn bad_input_fails_before_any_statement() {
        let ws = Workspace::new();
        let file = ws.export("event_1700000000.csv", &["E1,U1,,desktop,1,100,,"]);
        let pipeline = ws.pipeline(&file);
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());

        let result = pipeline.run(&mut warehouse).await;
        assert!(matches!(result, Err(IngestError::InvalidInput { .. })));
        assert!(warehouse.log().is_empty());
    }

    #[tokio::test]
    async fn rejected_staging_load_aborts_the_run() {
        let ws = Workspace::new();
        let file = ws.export("event_1700000000.csv", &[SCENARIO_ROW]);
        let pipeline = ws.pipeline(&file);
        let mut warehouse = MemoryWarehouse::new(ws.settings.schema.clone());
        warehouse.reject_bulk_loads();

        let result = pipeline.run(&mut warehouse).await;
        assert!(matches!(result, Err(IngestError::BulkLoad { .. })));
        assert!(warehouse.permanent().is_empty());
        assert!(!ws.settings.scratch_path.exists());
    }

    #[test]
    fn prepare_without_matches_is_no_files_found() {
        let ws = Workspace::new();
        ws.export("events.csv", &[SCENARIO_ROW]);
        let result = IngestPipeline::prepare(&ws.exports(), &ws.settings);
        assert!(matches!(result, Err(IngestError::NoFilesFound { .. })));
    }

    #[test]
    fn prepare_with_missing_reference_is_config_error() {
        let ws = Workspace::new();
        let file = ws.export("event_1700000000.csv", &[SCENARIO_ROW]);
        let settings = PipelineSettings {
            event_types_path: ws.dir.path().join("missing.json"),
            ..ws.settings.clone()
        };
        let result = IngestPipeline::prepare(&file, &settings);
        assert!(matches!(result, Err(IngestError::ConfigLoad(_))));
    }
}
