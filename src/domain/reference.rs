//! Lookup tables mapping client and event type codes to display names.
//!
//! Each table is a JSON array of `{ "ordinal": <int>, "name": <string> }`
//! records. Client type names are used verbatim; event type names are
//! normalised with [`display_name`].

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::IngestError;

#[derive(Debug, Deserialize)]
struct ReferenceEntry {
    ordinal: i32,
    name: String,
}

/// Client-type and event-type display names keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    client_types: HashMap<i32, String>,
    event_types: HashMap<i32, String>,
}

impl ReferenceData {
    /// Loads both tables from JSON files.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ConfigLoad`] if either file is missing or
    /// is not an array of `{ordinal, name}` records.
    pub fn load(client_types: &Path, event_types: &Path) -> Result<Self, IngestError> {
        let client_types = read_entries(client_types)?;
        let event_types = read_entries(event_types)?;
        let data = Self::from_entries(client_types, event_types);
        tracing::debug!(
            client_types = data.client_types.len(),
            event_types = data.event_types.len(),
            "reference data loaded"
        );
        Ok(data)
    }

    /// Builds the tables from `(ordinal, name)` pairs. Later duplicates
    /// of an ordinal replace earlier ones.
    pub fn from_entries<C, E>(client_types: C, event_types: E) -> Self
    where
        C: IntoIterator<Item = (i32, String)>,
        E: IntoIterator<Item = (i32, String)>,
    {
        Self {
            client_types: client_types.into_iter().collect(),
            event_types: event_types
                .into_iter()
                .map(|(ordinal, name)| (ordinal, display_name(&name)))
                .collect(),
        }
    }

    /// Display name of a client type, or the code itself when unmapped.
    #[must_use]
    pub fn client_type_name(&self, code: i32) -> String {
        lookup_or_code(&self.client_types, code)
    }

    /// Display name of an event type, or the code itself when unmapped.
    #[must_use]
    pub fn event_type_name(&self, code: i32) -> String {
        lookup_or_code(&self.event_types, code)
    }
}

fn lookup_or_code(table: &HashMap<i32, String>, code: i32) -> String {
    table.get(&code).cloned().unwrap_or_else(|| code.to_string())
}

fn read_entries(path: &Path) -> Result<Vec<(i32, String)>, IngestError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        IngestError::ConfigLoad(format!("cannot read reference file {}: {e}", path.display()))
    })?;
    let entries: Vec<ReferenceEntry> = serde_json::from_str(&content).map_err(|e| {
        IngestError::ConfigLoad(format!("malformed reference file {}: {e}", path.display()))
    })?;
    Ok(entries.into_iter().map(|e| (e.ordinal, e.name)).collect())
}

/// Underscores become spaces and every word is title-cased:
/// `account_linked` → `Account Linked`.
///
/// A letter is upper-cased when it follows a non-letter (or starts the
/// string) and lower-cased otherwise.
#[must_use]
pub fn display_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut after_letter = false;
    for c in raw.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}
