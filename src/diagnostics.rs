use std::fmt::Write as _;

use filever::{Error, Warning};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print markdown to stderr with bold headings.
fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Render warnings as one markdown block and print to stderr. Prints nothing
/// when there are none.
pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    print_markdown(&render_warnings(warnings));
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::DuplicateLogicalFile { bare } => render_duplicate_logical_file(bare),
        Error::InvalidConfig { reason } => render_invalid_config(reason),
        Error::InvalidPattern { pattern, source } => render_invalid_pattern(pattern, &source.to_string()),
        Error::MissingRunInfo => render_missing_run_info(),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => format!("\
# Error: Config Not Found

`{}` does not exist.

## Fix

Check the `--config` path, or omit it to use `.filever.toml` in the
current directory.
", path.display()),

        Error::Io { path, source } => format!("\
# Error: I/O

`{}`: {source}
", path.display()),

        Error::Json(e) => format!("\
# Error: JSON

{e}
"),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.filever.toml` against the keys listed by:

    filever info
"),

        Error::Walk(e) => format!("\
# Error: Directory Walk

{e}
"),

        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_duplicate_logical_file(bare: &str) -> String {
    format!("\
# Error: Duplicate Logical File

More than one source file strips to `{bare}`. Each bare path may have only
one versioned output.

## Fix

Remove or rename one of the source files, for example an old
`{bare}?fv=...` copy left in the source tree.
")
}

fn render_invalid_config(reason: &str) -> String {
    format!("\
# Error: Invalid Config

{reason}

## Fix

Correct `.filever.toml` or the command-line override. Delimiters may not
contain `.` or `/` and need at least one non-token character, e.g. `?fv=`.
")
}

fn render_invalid_pattern(pattern: &str, reason: &str) -> String {
    format!("\
# Error: Invalid Pattern

    {pattern}

{reason}

## Fix

If the pattern comes from `pattern` in `.filever.toml`, correct it or remove
it to use the built-in matcher.
")
}

fn render_missing_run_info() -> String {
    "\
# Error: Missing Run Info

References can only be rewritten after versioning has produced the
path/version map.

## Fix

    filever run
"
    .to_string()
}

/// Render all warnings from a run as one markdown block.
pub fn render_warnings(warnings: &[Warning]) -> String {
    let mut dummied = Vec::new();
    let mut unmapped = Vec::new();
    for w in warnings {
        match w {
            Warning::DummiedVersion { output, source } => dummied.push(format!("- `{source}` -> `{output}`")),
            Warning::UnmappedReference { file, reference } => {
                unmapped.push(format!("- `{reference}` in `{}`", file.display()));
            },
        }
    }

    let mut out = format!("# Warnings ({})\n", warnings.len());

    if !dummied.is_empty() {
        out.push_str("\n## Placeholder versions\n\nNo usable digest; the all-zero token was used:\n\n");
        for line in &dummied {
            let _ = writeln!(out, "{line}");
        }
    }

    if !unmapped.is_empty() {
        out.push_str("\n## Unmapped references\n\nNo versioned file matches these references:\n\n");
        for line in &unmapped {
            let _ = writeln!(out, "{line}");
        }
    }

    out
}
