//! Batch versioner: resolve the working set of source files, publish each,
//! and build the bare path → token mapping the rewriter consults.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::codec::VersionCodec;
use crate::config::Config;
use crate::error::Error;
use crate::path_parts::{PathParts, slash_path};
use crate::publish::publish;
use crate::report::{RunInfo, Warning};

/// Find every file under `src` whose name carries a token of exactly the
/// configured size (the placeholder convention, e.g. `app.js?fv=00000000`).
///
/// Directory entries are visited sorted by file name, so the result is in
/// lexical order per directory level. Paths are relative to `src`.
///
/// # Errors
///
/// Returns `Error::Walk` if the tree cannot be traversed.
pub fn discover(src: &Path, codec: &VersionCodec) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !codec.has_fixed_token(name) {
            continue;
        }
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        found.push(relative.to_path_buf());
    }
    return Ok(found);
}

/// Version every source file and populate `info`.
///
/// `info` is reset first. Sources come from `config.src_files` when set,
/// otherwise from [`discover`]. On error, `info` holds the outputs produced
/// before the failure; files already copied into the distribution tree are
/// not rolled back.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` for a rejected config,
/// `Error::DuplicateLogicalFile` if two sources share a bare path,
/// or any error from discovery or publishing.
pub fn version(config: &Config, info: &mut RunInfo) -> Result<(), Error> {
    *info = RunInfo::default();
    let codec = VersionCodec::new(config)?;

    let sources = match &config.src_files {
        Some(files) => files.clone(),
        None => discover(&config.src, &codec)?,
    };
    log::debug!("versioning {} source files from {}", sources.len(), config.src.display());

    for source in &sources {
        version_one(source, config, &codec, info)?;
    }

    return Ok(());
}

/// Publish one source and record its output and token.
///
/// # Errors
///
/// Returns `Error::DuplicateLogicalFile` or any publishing error.
fn version_one(
    source: &Path,
    config: &Config,
    codec: &VersionCodec,
    info: &mut RunInfo,
) -> Result<(), Error> {
    // Checked before publishing: a second source with the same bare path
    // would delete the first one's output as stale.
    let expected_bare = PathParts::decompose(&slash_path(source), codec).bare_path;
    if info.path_versions.contains_key(&expected_bare) {
        return Err(Error::DuplicateLogicalFile { bare: expected_bare });
    }

    let published = publish(source, config, codec)?;
    let parts = PathParts::decompose(&published.output, codec);

    if published.tagged.dummied {
        info.warn(Warning::DummiedVersion {
            output: published.output.clone(),
            source: slash_path(source),
        });
    }

    info.path_versions.insert(parts.bare_path, parts.version);
    info.versioned_files.push(published.output);
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::Placement;
    use crate::hasher::{self, HashAlg};

    fn token_of(content: &str) -> String {
        return hasher::digest(HashAlg::Sha256, content.as_bytes()).chars().take(8).collect();
    }

    fn tree(files: &[(&str, &str)]) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().join("src"), dir.path().join("dist"));
        for (path, content) in files {
            let full = config.src.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        fs::create_dir_all(&config.src).unwrap();
        return (dir, config);
    }

    #[test]
    fn discovers_only_fixed_size_tokens_in_lexical_order() {
        let (_dir, config) = tree(&[
            ("test_2.js?fv=00000000", "2"),
            ("test_1.js?fv=00000000", "1"),
            ("unversioned_file.md", "md"),
            ("short.js?fv=000", "s"),
            ("test_folder/test_3.js?fv=00000000", "3"),
        ]);
        let codec = VersionCodec::new(&config).unwrap();

        let found = discover(&config.src, &codec).unwrap();
        assert_eq!(
            found,
            vec![
                PathBuf::from("test_1.js?fv=00000000"),
                PathBuf::from("test_2.js?fv=00000000"),
                PathBuf::from("test_folder/test_3.js?fv=00000000"),
            ]
        );
    }

    #[test]
    fn versions_discovered_files() {
        let (_dir, config) = tree(&[
            ("test_1.js?fv=00000000", "one"),
            ("test_folder/test_3.js?fv=00000000", "three"),
        ]);
        let mut info = RunInfo::default();
        version(&config, &mut info).unwrap();

        assert_eq!(
            info.versioned_files,
            vec![
                format!("test_1.js?fv={}", token_of("one")),
                format!("test_folder/test_3.js?fv={}", token_of("three")),
            ]
        );
        assert_eq!(info.path_versions.len(), 2);
        assert_eq!(info.path_versions["test_1.js"], token_of("one"));
        assert_eq!(info.path_versions["test_folder/test_3.js"], token_of("three"));
        assert!(info.warnings.is_empty());
    }

    #[test]
    fn explicit_source_list_overrides_discovery() {
        let (_dir, mut config) = tree(&[("a.js", "a"), ("b.js?fv=00000000", "b")]);
        config.src_files = Some(vec![PathBuf::from("a.js")]);
        config.placement = Placement::Mid;

        let mut info = RunInfo::default();
        version(&config, &mut info).unwrap();
        assert_eq!(info.versioned_files, vec![format!("a?fv={}.js", token_of("a"))]);
        assert_eq!(info.path_versions["a.js"], token_of("a"));
    }

    #[test]
    fn duplicate_bare_paths_abort() {
        let (_dir, mut config) = tree(&[("a.js?fv=00000000", "a"), ("a.js?fv=11111111", "b")]);
        config.src_files = Some(vec![
            PathBuf::from("a.js?fv=00000000"),
            PathBuf::from("a.js?fv=11111111"),
        ]);

        let mut info = RunInfo::default();
        let err = version(&config, &mut info).unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalFile { ref bare } if bare == "a.js"));
        assert_eq!(info.versioned_files.len(), 1, "partial results stay with the caller");
    }

    #[test]
    fn oversized_token_is_dummied_with_warning() {
        let (_dir, mut config) = tree(&[("a.js", "a")]);
        config.src_files = Some(vec![PathBuf::from("a.js")]);
        config.version_size = 50;

        let mut info = RunInfo::default();
        version(&config, &mut info).unwrap();
        assert_eq!(info.path_versions["a.js"], "0".repeat(50));
        assert!(matches!(info.warnings.as_slice(), [Warning::DummiedVersion { .. }]));
    }

    #[test]
    fn rerun_resets_info() {
        let (_dir, config) = tree(&[("a.js?fv=00000000", "a")]);
        let mut info = RunInfo::default();
        version(&config, &mut info).unwrap();
        version(&config, &mut info).unwrap();
        assert_eq!(info.versioned_files.len(), 1);
    }
}
