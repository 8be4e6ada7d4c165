//! event-ingest entry point.
//!
//! Ingests one export file, or every matching file in a directory, into
//! the warehouse and prints the merge summary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use event_ingest::config::IngestConfig;
use event_ingest::ingest::IngestPipeline;
use event_ingest::warehouse::PgWarehouse;

/// Load CSV event exports into the warehouse.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Export file, or directory scanned for export files.
    input_path: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = IngestConfig::from_env()?;

    let pipeline = IngestPipeline::prepare(&cli.input_path, &config.pipeline)?;
    tracing::info!(
        input = %cli.input_path.display(),
        files = pipeline.files().len(),
        "starting ingest"
    );

    let mut warehouse = PgWarehouse::connect(&config.warehouse)
        .await
        .context("opening warehouse connection")?;
    let outcome = pipeline.run(&mut warehouse).await;
    warehouse.close().await;

    let report = outcome?;
    println!("{report}");
    Ok(())
}
