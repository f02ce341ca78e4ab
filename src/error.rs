//! Crate-level error types for filever runs.

use std::path::PathBuf;

/// Every error that aborts a run. Each variant names the path, pattern, or
/// value it concerns so a diagnostic can be rendered without a debugger.
///
/// Non-fatal conditions (placeholder tokens, unresolved references) are not
/// errors; they are recorded as [`crate::report::Warning`] values instead.
#[allow(clippy::error_impl_error, reason = "crate-level error type re-exported from lib")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A config file named explicitly on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// Two source files strip to the same bare output path in a single run.
    #[error("duplicate logical file: `{bare}` is produced by more than one source file")]
    DuplicateLogicalFile {
        /// Bare (unversioned) path relative to the distribution root.
        bare: String,
    },

    /// Configuration rejected before any filesystem work started.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Why the configuration cannot be used.
        reason: String,
    },

    /// A generated or caller-supplied pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The pattern text that failed to compile.
        pattern: String,
        /// The underlying regex error.
        source: regex::Error,
    },

    /// Read, write, create, list, or remove failure on a named path.
    #[error("io: {}: {source}", path.display())]
    Io {
        /// Path the failing operation was applied to.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// Report serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The rewriter was invoked before the version mapping was populated.
    #[error("run info missing: `version` must populate the path/version map before `replace`")]
    MissingRunInfo,

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Directory traversal failed part-way through a tree.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped traversal error.
        #[from]
        walkdir::Error,
    ),
}

impl Error {
    /// Attach a path to an I/O error. Used as `.map_err(Error::io(path))`.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        return move |source| return Self::Io { path, source };
    }
}
