//! Content publisher: copy one source file into the distribution tree under
//! its content-versioned name and remove stale versions of it.

use std::path::{Component, Path, PathBuf};

use crate::codec::{Tagged, VersionCodec, compile};
use crate::config::Config;
use crate::error::Error;
use crate::hasher;
use crate::path_parts::slash_path;

/// Outcome of publishing one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// False when the current version already existed and nothing was written.
    pub copied: bool,
    /// Output path relative to the distribution root, `/`-separated.
    pub output: String,
    /// Stale versioned copies deleted from the destination directory.
    pub removed: Vec<PathBuf>,
    /// The versioned file name and its token.
    pub tagged: Tagged,
}

/// List the files (not directories) directly inside `dir`, sorted by name.
/// Names that are not valid UTF-8 are skipped; they can never match a
/// versioned name.
///
/// # Errors
///
/// Returns `Error::Io` if the directory cannot be read.
pub fn list_files(dir: &Path) -> Result<Vec<String>, Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(Error::io(dir))? {
        let entry = entry.map_err(Error::io(dir))?;
        let file_type = entry.file_type().map_err(Error::io(entry.path()))?;
        if file_type.is_dir() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            files.push(name);
        }
    }
    files.sort();
    return Ok(files);
}

/// Publish `source_rel` (relative to `config.src`) into `config.dist`.
///
/// The destination directory mirrors the source's relative directory. Any
/// other file there carrying the same bare name under any token is deleted;
/// if the current versioned name already exists the copy is skipped. After
/// success exactly one versioned output for this bare name remains.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` if `source_rel` escapes the source root,
/// or `Error::Io` on any read, create, list, remove, or write failure.
/// Stale copies deleted before a later failure stay deleted.
pub fn publish(source_rel: &Path, config: &Config, codec: &VersionCodec) -> Result<Published, Error> {
    reject_escaping_path(source_rel)?;

    let source_path = config.src.join(source_rel);
    let bytes = std::fs::read(&source_path).map_err(Error::io(&source_path))?;
    let digest = hasher::digest(config.hash_alg, &bytes);

    let file_name = source_rel
        .file_name()
        .map(|n| return n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bare = codec.strip_any(&file_name).into_owned();
    let tagged = codec.tag(&bare, &digest);

    let rel_dir = source_rel.parent().unwrap_or_else(|| return Path::new(""));
    let dist_dir = config.dist.join(rel_dir);
    std::fs::create_dir_all(&dist_dir).map_err(Error::io(&dist_dir))?;

    let output = slash_path(&rel_dir.join(&tagged.name));

    let any_version = compile(&format!("^{}$", codec.match_pattern(&bare)))?;
    let mut current_exists = false;
    let mut removed = Vec::new();

    // Keep scanning after a hit: errant duplicates may exist alongside the current version.
    for existing in list_files(&dist_dir)? {
        if existing == tagged.name {
            current_exists = true;
            continue;
        }
        if !any_version.is_match(&existing) {
            continue;
        }
        let stale = dist_dir.join(&existing);
        log::debug!("removing stale version {}", stale.display());
        std::fs::remove_file(&stale).map_err(Error::io(&stale))?;
        removed.push(stale);
    }

    if current_exists {
        log::debug!("{output} is current, not copying");
        return Ok(Published { copied: false, output, removed, tagged });
    }

    let destination = dist_dir.join(&tagged.name);
    log::debug!("copying {} -> {}", source_path.display(), destination.display());
    std::fs::write(&destination, &bytes).map_err(Error::io(&destination))?;

    return Ok(Published { copied: true, output, removed, tagged });
}

/// Source paths must stay inside the source root, or the mirrored
/// destination would escape the distribution root.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` for absolute paths or `..` components.
fn reject_escaping_path(source_rel: &Path) -> Result<(), Error> {
    let escapes = source_rel
        .components()
        .any(|c| return matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes || source_rel.file_name().is_none() {
        return Err(Error::InvalidConfig {
            reason: format!(
                "source file `{}` must be a file path relative to the source root",
                source_rel.display()
            ),
        });
    }
    return Ok(());
}
