use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hasher::HashAlg;

/// Default delimiter between a name and its version token.
pub const DEFAULT_DELIMITER: &str = "?fv=";

/// Default number of digest characters in a version token.
pub const DEFAULT_VERSION_SIZE: usize = 8;

/// File name of the optional project config, looked up in the working root.
pub const CONFIG_FILE_NAME: &str = ".filever.toml";

/// Where the version token goes in a file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// After the full name: `app.min.js?fv=TOKEN`.
    #[default]
    End,
    /// Between the base name and its extension: `app?fv=TOKEN.min.js`.
    Mid,
}

/// How the rewriter recognizes references when no explicit pattern is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Match any plausible versioned path; looser, may flag untracked names.
    Generic,
    /// One alternation clause per versioned output; precise.
    #[default]
    Tracked,
}

/// What to do with a reference whose bare path has no assigned version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Keep the matched text as it was.
    Leave,
    /// Rewrite the token to the all-zero placeholder.
    #[default]
    Placeholder,
}

/// Run parameters. Built once per run and read-only while it executes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the distribution tree.
    pub dist: PathBuf,
    /// Delimiter inserted before a version token.
    pub delimiter: String,
    /// Path prefixes (relative to `dist`) excluded from the rewrite walk.
    pub exclude: Vec<String>,
    /// Digest used for content addressing.
    pub hash_alg: HashAlg,
    /// Path prefixes (relative to `dist`) the rewrite walk is limited to.
    pub include: Vec<String>,
    /// Reference recognition when `pattern` is unset.
    pub match_mode: MatchMode,
    /// Caller-supplied rewrite pattern. Overrides `match_mode`.
    pub pattern: Option<String>,
    /// Token placement in output names.
    pub placement: Placement,
    /// Root of the source tree.
    pub src: PathBuf,
    /// Explicit source files relative to `src`. Discovered by scanning when unset.
    pub src_files: Option<Vec<PathBuf>>,
    /// Policy for references with no mapping.
    pub unmapped: UnmappedPolicy,
    /// Number of digest characters in a token.
    pub version_size: usize,
}

/// Raw TOML structure for `.filever.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileverTomlConfig {
    delimiter: Option<String>,
    dist: Option<PathBuf>,
    exclude: Vec<String>,
    hash_alg: Option<HashAlg>,
    include: Vec<String>,
    match_mode: Option<MatchMode>,
    pattern: Option<String>,
    placement: Option<Placement>,
    src: Option<PathBuf>,
    src_files: Option<Vec<PathBuf>>,
    unmapped: Option<UnmappedPolicy>,
    version_size: Option<usize>,
}

impl Config {
    /// Load config from `.filever.toml` in the given root directory.
    /// Returns defaults rooted at `root` if the file doesn't exist.
    /// A file that exists but is malformed is an error; the loader never
    /// silently falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new(root.join("src"), root.join("dist")));
            },
            Err(source) => return Err(Error::Io { path, source }),
            Ok(c) => c,
        };
        return Self::parse(root, &content);
    }

    /// Load config from an explicitly named file. Relative `src`/`dist`
    /// entries resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file does not exist,
    /// `Error::Io` for other read failures, or `Error::TomlDe` if malformed.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(source) => return Err(Error::Io { path: path.to_path_buf(), source }),
            Ok(c) => c,
        };
        let root = path.parent().unwrap_or_else(|| return Path::new(""));
        return Self::parse(root, &content);
    }

    /// Config with every option at its default.
    pub fn new(src: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
        return Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            dist: dist.into(),
            exclude: Vec::new(),
            hash_alg: HashAlg::default(),
            include: Vec::new(),
            match_mode: MatchMode::default(),
            pattern: None,
            placement: Placement::default(),
            src: src.into(),
            src_files: None,
            unmapped: UnmappedPolicy::default(),
            version_size: DEFAULT_VERSION_SIZE,
        };
    }

    /// Parse TOML content, resolving relative roots against `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid config TOML.
    pub fn parse(root: &Path, content: &str) -> Result<Self, Error> {
        let raw: FileverTomlConfig = toml::from_str(content)?;
        let defaults = Self::new(root.join("src"), root.join("dist"));

        return Ok(Self {
            delimiter: raw.delimiter.unwrap_or(defaults.delimiter),
            dist: raw.dist.map_or(defaults.dist, |d| return root.join(d)),
            exclude: raw.exclude,
            hash_alg: raw.hash_alg.unwrap_or(defaults.hash_alg),
            include: raw.include,
            match_mode: raw.match_mode.unwrap_or(defaults.match_mode),
            pattern: raw.pattern,
            placement: raw.placement.unwrap_or(defaults.placement),
            src: raw.src.map_or(defaults.src, |s| return root.join(s)),
            src_files: raw.src_files,
            unmapped: raw.unmapped.unwrap_or(defaults.unmapped),
            version_size: raw.version_size.unwrap_or(defaults.version_size),
        });
    }

    /// Check whether a distribution file should be scanned by the rewriter.
    ///
    /// A path is included if no include prefixes are set, or if it starts with
    /// at least one of them. An included path is then excluded if it starts
    /// with any exclude prefix.
    pub fn should_rewrite(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Reject configurations that would produce unparseable names.
    ///
    /// The delimiter may not contain `.` or `/`, since decomposition splits on
    /// both, and may not consist only of token characters, since the end of a
    /// token would then be ambiguous.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.delimiter.is_empty() {
            return Err(invalid("delimiter is empty"));
        }
        if self.delimiter.contains(['.', '/', '\\']) {
            return Err(invalid(&format!(
                "delimiter `{}` contains a path or extension separator",
                self.delimiter
            )));
        }
        if self.delimiter.chars().all(crate::codec::is_token_char) {
            return Err(invalid(&format!(
                "delimiter `{}` is made only of token characters",
                self.delimiter
            )));
        }
        if self.version_size == 0 {
            return Err(invalid("version_size must be at least 1"));
        }
        if self.src.as_os_str().is_empty() && self.src_files.is_none() {
            return Err(invalid("no source root configured"));
        }
        if self.dist.as_os_str().is_empty() {
            return Err(invalid("no distribution root configured"));
        }
        return Ok(());
    }
}

/// Shorthand for an `InvalidConfig` error.
fn invalid(reason: &str) -> Error {
    return Error::InvalidConfig { reason: reason.to_string() };
}
