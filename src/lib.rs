//! Content-addressed file versioning for static asset pipelines.
//!
//! Source files are copied into a distribution tree under names that carry
//! a short content digest (`app.js?fv=4mIbJJPq`), stale versions are removed,
//! and references to versioned files inside the distribution tree are
//! rewritten to point at the current version.
//!
//! ```no_run
//! let config = filever::Config::load(std::path::Path::new("."))?;
//! let mut info = filever::RunInfo::default();
//! filever::version_replace(&config, &mut info)?;
//! println!("{} files versioned", info.versioned_files.len());
//! # Ok::<(), filever::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod hasher;
pub mod path_parts;
pub mod publish;
pub mod report;
pub mod rewriter;
pub mod versioner;

pub use codec::VersionCodec;
pub use config::Config;
pub use error::Error;
pub use path_parts::PathParts;
pub use publish::{list_files, publish};
pub use report::{RunInfo, Warning};
pub use rewriter::replace;
pub use versioner::{discover, version};

/// Version every source file, then rewrite references in the distribution
/// tree. The rewrite step is skipped when nothing was versioned.
///
/// `info` is owned by the caller: after an error it holds the work completed
/// before the failure.
///
/// # Errors
///
/// Returns the first error from [`version`] or [`replace`].
pub fn version_replace(config: &Config, info: &mut RunInfo) -> Result<(), Error> {
    version(config, info)?;
    if !info.is_versioned() {
        log::debug!("nothing versioned, skipping rewrite");
        return Ok(());
    }
    return replace(config, info);
}
