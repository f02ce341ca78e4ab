//! Run results: the path/version mapping, produced outputs, rewrite
//! bookkeeping, and non-fatal warnings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;

/// A condition that did not stop the run but needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A placeholder token was used because the digest was unusable.
    DummiedVersion {
        /// Output path relative to the distribution root.
        output: String,
        /// Source path relative to the source root.
        source: String,
    },
    /// A reference had no assigned version.
    UnmappedReference {
        /// File containing the reference.
        file: PathBuf,
        /// The matched reference text.
        reference: String,
    },
}

/// Accumulator for one run, owned by the caller and filled by
/// [`crate::version`] and [`crate::replace`].
///
/// Every field describes exactly what the run did; after an error the fields
/// reflect the work completed before the failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunInfo {
    /// Rewritten files whose content already referenced current versions.
    pub checked_file_paths: Vec<PathBuf>,
    /// Pattern used by the rewriter to find references.
    pub pattern: String,
    /// Bare path (relative to the distribution root) → current token.
    pub path_versions: BTreeMap<String, String>,
    /// Total references replaced across all updated files.
    pub total_source_replaces: usize,
    /// Files the rewriter wrote back.
    pub updated_file_paths: Vec<PathBuf>,
    /// Output paths produced by versioning, relative to the distribution root.
    pub versioned_files: Vec<String>,
    /// Non-fatal conditions recorded during the run.
    pub warnings: Vec<Warning>,
}

impl RunInfo {
    /// Whether versioning has populated the mapping the rewriter needs.
    pub fn is_versioned(&self) -> bool {
        return !self.path_versions.is_empty() && !self.versioned_files.is_empty();
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: Warning) {
        match &warning {
            Warning::DummiedVersion { source, output } => {
                log::warn!("placeholder version used for {source} -> {output}");
            },
            Warning::UnmappedReference { file, reference } => {
                log::warn!("no version for reference `{reference}` in {}", file.display());
            },
        }
        self.warnings.push(warning);
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Write the JSON report to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut content = self.to_json()?;
        content.push('\n');
        std::fs::write(path, content).map_err(Error::io(path))?;
        return Ok(());
    }
}
