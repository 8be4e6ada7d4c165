//! Enrichment and full-row deduplication of raw events.

use std::collections::HashSet;

use super::reader::RawEvent;
use crate::domain::{EventRecord, ReferenceData};

/// Turns unioned raw rows into the records to stage.
#[derive(Debug, Clone)]
pub struct Transformer {
    reference: ReferenceData,
}

impl Transformer {
    /// Creates a transformer over `reference`.
    #[must_use]
    pub fn new(reference: ReferenceData) -> Self {
        Self { reference }
    }

    /// Adds `client_type_value` / `event_type_value` to every row.
    ///
    /// Unknown codes fall back to the code itself.
    #[must_use]
    pub fn enrich(&self, raw: RawEvent) -> EventRecord {
        EventRecord {
            client_type_value: Some(self.reference.client_type_name(raw.client_type)),
            event_type_value: Some(self.reference.event_type_name(raw.event_type)),
            event_uuid: raw.event_uuid,
            user_guid: raw.user_guid,
            user_site_id: raw.user_site_id,
            client_type: Some(raw.client_type),
            event_type: Some(raw.event_type),
            status: Some(raw.status.to_string()),
            created_date: raw.created_date,
            updated_date: raw.updated_date,
        }
    }

    /// Enriches `rows` and drops rows identical across all ten columns.
    ///
    /// The first occurrence of a duplicate is kept. Callers must not rely
    /// on the output order.
    #[must_use]
    pub fn transform(&self, rows: Vec<RawEvent>) -> Vec<EventRecord> {
        let input = rows.len();
        let mut seen = HashSet::with_capacity(input);
        let records: Vec<EventRecord> = rows
            .into_iter()
            .map(|raw| self.enrich(raw))
            .filter(|record| seen.insert(record.clone()))
            .collect();

        tracing::info!(
            input,
            output = records.len(),
            duplicates = input - records.len(),
            "rows transformed"
        );
        records
    }
}
