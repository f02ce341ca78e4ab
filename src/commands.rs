//! CLI command bodies: run, version, discover, decompose.

use std::path::Path;
use std::process::ExitCode;

use filever::path_parts::slash_path;
use filever::{Config, Error, PathParts, RunInfo, VersionCodec};

use crate::diagnostics;

/// Decompose one path with the configured delimiter and placement and print
/// its parts as JSON.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` for a rejected config, or `Error::Json`.
pub fn decompose(config: &Config, path: &str) -> Result<ExitCode, Error> {
    let codec = VersionCodec::new(config)?;
    let parts = PathParts::decompose(path, &codec);
    println!("{}", serde_json::to_string_pretty(&parts)?);
    return Ok(ExitCode::SUCCESS);
}

/// List the source files that carry a placeholder token, one per line.
///
/// # Errors
///
/// Returns config validation or traversal errors.
pub fn discover(config: &Config) -> Result<ExitCode, Error> {
    let codec = VersionCodec::new(config)?;
    let found = filever::discover(&config.src, &codec)?;
    for path in &found {
        println!("{}", slash_path(path));
    }
    if found.is_empty() {
        eprintln!(
            "No files in {} carry a {}-character `{}` token.",
            config.src.display(),
            codec.size(),
            codec.delimiter()
        );
    }
    return Ok(ExitCode::SUCCESS);
}

/// Emit the run report: JSON on stdout or a summary, plus the optional file.
/// Exit code is 1 when the run recorded warnings.
///
/// # Errors
///
/// Returns `Error::Json` or `Error::Io` if the report cannot be produced.
fn finish(info: &RunInfo, json: bool, report: Option<&Path>) -> Result<ExitCode, Error> {
    if json {
        println!("{}", info.to_json()?);
    } else {
        print_summary(info);
        diagnostics::print_warnings(&info.warnings);
    }

    if let Some(path) = report {
        info.write(path)?;
    }

    if info.warnings.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// Print a short human-readable account of the run.
fn print_summary(info: &RunInfo) {
    if info.versioned_files.is_empty() {
        println!("Nothing to version.");
        return;
    }

    println!("Versioned {} files:", info.versioned_files.len());
    for output in &info.versioned_files {
        println!("  {output}");
    }

    if !info.updated_file_paths.is_empty() {
        println!(
            "Updated {} references in {} files.",
            info.total_source_replaces,
            info.updated_file_paths.len()
        );
    }
    if !info.checked_file_paths.is_empty() {
        println!("{} files already current.", info.checked_file_paths.len());
    }
    return;
}

/// Version and rewrite. A report file, when requested, is written even if
/// the run fails.
///
/// # Errors
///
/// Returns the first error from the run or from writing the report.
pub fn run(config: &Config, json: bool, report: Option<&Path>) -> Result<ExitCode, Error> {
    let mut info = RunInfo::default();
    if let Err(e) = filever::version_replace(config, &mut info) {
        write_partial_report(&info, report);
        return Err(e);
    }
    return finish(&info, json, report);
}

/// Version only; references in the distribution tree are left untouched.
///
/// # Errors
///
/// Returns the first error from versioning or from writing the report.
pub fn version(config: &Config, json: bool, report: Option<&Path>) -> Result<ExitCode, Error> {
    let mut info = RunInfo::default();
    if let Err(e) = filever::version(config, &mut info) {
        write_partial_report(&info, report);
        return Err(e);
    }
    return finish(&info, json, report);
}

/// Best-effort report write after a failed run. A failure here is logged,
/// not returned.
fn write_partial_report(info: &RunInfo, report: Option<&Path>) {
    let Some(path) = report else {
        return;
    };
    if let Err(e) = info.write(path) {
        log::error!("could not write partial report to {}: {e}", path.display());
    }
    return;
}
