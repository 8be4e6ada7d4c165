//! Source file discovery.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::IngestError;

/// File name filter for event exports.
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    regex: Regex,
}

impl FilePattern {
    /// Compiles `pattern`; a file name must match it in full.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ConfigLoad`] if `pattern` is not a valid
    /// regular expression.
    pub fn new(pattern: &str) -> Result<Self, IngestError> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| IngestError::ConfigLoad(format!("invalid file pattern {pattern:?}: {e}")))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the final component of `path` matches.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.regex.is_match(name))
    }
}

/// Resolves `source` into the files to ingest.
///
/// A directory yields its matching regular files (not recursive), sorted
/// by path. A file yields itself if its name matches.
///
/// # Errors
///
/// Returns [`IngestError::NoFilesFound`] if nothing matches, including
/// when `source` does not exist, and [`IngestError::Io`] if a directory
/// cannot be listed.
pub fn discover(source: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();

    if source.is_dir() {
        let entries = std::fs::read_dir(source).map_err(|e| IngestError::io(source, e))?;
        for entry in entries {
            let path = entry.map_err(|e| IngestError::io(source, e))?.path();
            if path.is_file() && pattern.matches(&path) {
                files.push(path);
            }
        }
        files.sort();
    } else if source.is_file() && pattern.matches(source) {
        files.push(source.to_path_buf());
    }

    if files.is_empty() {
        return Err(IngestError::NoFilesFound {
            pattern: pattern.as_str().to_string(),
        });
    }

    tracing::info!(source = %source.display(), files = files.len(), "event files discovered");
    Ok(files)
}
