//! Anti-join merge of staging into the permanent table.
//!
//! A staged row is inserted only if no permanent row shares its
//! [`IdentityKey`]. The comparison set is narrowed to permanent rows whose
//! `event_uuid` occurs in staging; since `event_uuid` is part of the key,
//! the outcome equals a comparison against the whole table.
//!
//! This is append-only, not an upsert: a staged row that differs from a
//! stored one in any identity column (a later `updated_date`, say) is a
//! new observation and becomes a new row.

use std::collections::HashSet;
use std::fmt;

use futures_util::TryStreamExt;

use super::staging::BulkLoader;
use crate::domain::{EventRecord, IdentityKey, Sentinels};
use crate::error::IngestError;
use crate::warehouse::{Warehouse, WarehouseResult, WarehouseSchema, query_count};

/// Counts reported by one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Rows in staging when the pass started.
    pub staging_count: u64,
    /// Growth of the permanent table over the pass.
    pub inserted: u64,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records loaded into staging. {} inserted into event table.",
            group_thousands(self.staging_count),
            group_thousands(self.inserted)
        )
    }
}

/// Moves new rows from staging into the permanent table.
#[derive(Debug, Clone)]
pub struct MergeReconciler {
    schema: WarehouseSchema,
    loader: BulkLoader,
}

impl MergeReconciler {
    /// Creates a reconciler for `schema`, inserting through `loader`.
    #[must_use]
    pub fn new(schema: WarehouseSchema, loader: BulkLoader) -> Self {
        Self { schema, loader }
    }

    /// Runs one pass with today's sentinels.
    ///
    /// # Errors
    ///
    /// See [`MergeReconciler::reconcile_with`].
    pub async fn reconcile<W>(&self, warehouse: &mut W) -> Result<MergeReport, IngestError>
    where
        W: Warehouse + ?Sized,
    {
        self.reconcile_with(warehouse, Sentinels::today()).await
    }

    /// Runs one pass with explicit `sentinels`.
    ///
    /// Staging is cleared at the end of a successful pass, discarding the
    /// rows that were not inserted. A failure leaves staging as it was for
    /// the next run to re-evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Merge`] if any statement or the insert load
    /// fails, and [`IngestError::Io`] if the scratch file cannot be
    /// written.
    pub async fn reconcile_with<W>(
        &self,
        warehouse: &mut W,
        sentinels: Sentinels,
    ) -> Result<MergeReport, IngestError>
    where
        W: Warehouse + ?Sized,
    {
        let staging = self.schema.staging_table();
        let permanent = self.schema.permanent_table();

        let staging_count = query_count(warehouse, &self.schema.count_rows(staging))
            .await
            .map_err(IngestError::Merge)?;
        let before = query_count(warehouse, &self.schema.count_rows(permanent))
            .await
            .map_err(IngestError::Merge)?;

        let known = collect_keys(warehouse, &self.schema.select_merge_candidates(), &sentinels)
            .await
            .map_err(IngestError::Merge)?;
        let candidates = known.len();
        let novel = select_novel(warehouse, &self.schema.select_staging(), &sentinels, known)
            .await
            .map_err(IngestError::Merge)?;

        tracing::debug!(candidates, novel = novel.len(), "staging compared against event table");

        if !novel.is_empty() {
            self.loader
                .load(warehouse, permanent, &novel)
                .await
                .map_err(|e| match e {
                    IngestError::BulkLoad { source, .. } => IngestError::Merge(source),
                    other => other,
                })?;
        }

        warehouse
            .execute(&self.schema.clear_staging())
            .await
            .map_err(IngestError::Merge)?;

        let after = query_count(warehouse, &self.schema.count_rows(permanent))
            .await
            .map_err(IngestError::Merge)?;

        let report = MergeReport {
            staging_count,
            inserted: after.saturating_sub(before),
        };
        tracing::info!(
            staging = report.staging_count,
            inserted = report.inserted,
            "merge complete"
        );
        Ok(report)
    }
}

async fn collect_keys<W>(
    warehouse: &mut W,
    statement: &str,
    sentinels: &Sentinels,
) -> WarehouseResult<HashSet<IdentityKey>>
where
    W: Warehouse + ?Sized,
{
    let mut rows = warehouse.query(statement);
    let mut keys = HashSet::new();
    while let Some(row) = rows.try_next().await? {
        keys.insert(EventRecord::try_from(row)?.identity_key(sentinels));
    }
    Ok(keys)
}

/// Staged rows whose key is not in `known`. Each accepted key joins
/// `known`, so two staged rows with one identity yield a single insert.
async fn select_novel<W>(
    warehouse: &mut W,
    statement: &str,
    sentinels: &Sentinels,
    mut known: HashSet<IdentityKey>,
) -> WarehouseResult<Vec<EventRecord>>
where
    W: Warehouse + ?Sized,
{
    let mut rows = warehouse.query(statement);
    let mut novel = Vec::new();
    while let Some(row) = rows.try_next().await? {
        let record = EventRecord::try_from(row)?;
        if known.insert(record.identity_key(sentinels)) {
            novel.push(record);
        }
    }
    Ok(novel)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
