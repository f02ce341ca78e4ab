//! Reference rewriter: find versioned references in the distribution tree
//! and point them at the current version of each tracked file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::bytes::{Regex, RegexBuilder};
use walkdir::WalkDir;

use crate::codec::VersionCodec;
use crate::config::{Config, MatchMode, Placement, UnmappedPolicy};
use crate::error::Error;
use crate::path_parts::{PathParts, slash_path};
use crate::report::{RunInfo, Warning};

/// Compiled-size ceiling for the rewrite pattern. The tracked alternation
/// grows with every versioned file.
const PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Characters allowed in a path segment of a reference.
const SEGMENT_CLASS: &str = "[0-9A-Za-z_.~@%+-]";

/// Zero or more leading directory segments, including `.` and `..`.
const PREFIX: &str = "(?:[0-9A-Za-z_.~@%+-]+/)*";

/// Result of rewriting one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// Content after rewriting; equal to the input when nothing changed.
    pub content: Vec<u8>,
    /// References found (boundary-rejected matches are not counted).
    pub matches: usize,
    /// Matched references that had no assigned version.
    pub unmapped: Vec<String>,
}

/// Everything needed to rewrite references for one run.
pub struct Rewriter<'a> {
    /// Codec for stripping and re-tagging.
    codec: &'a VersionCodec,
    /// Bare path → token.
    path_versions: &'a BTreeMap<String, String>,
    /// Compiled reference pattern.
    regex: Regex,
    /// Policy for unresolved references.
    unmapped: UnmappedPolicy,
}

impl<'a> Rewriter<'a> {
    /// Compile `pattern` for rewriting against `info`'s mapping.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the pattern does not compile.
    pub fn new(
        pattern: &str,
        codec: &'a VersionCodec,
        info: &'a RunInfo,
        unmapped: UnmappedPolicy,
    ) -> Result<Self, Error> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|source| return Error::InvalidPattern { pattern: pattern.to_string(), source })?;
        return Ok(Self { codec, path_versions: &info.path_versions, regex, unmapped });
    }

    /// Look up the current token for a bare reference seen from `file_dir`.
    ///
    /// Tried in order: relative to the referencing file's directory, then
    /// relative to the distribution root. An `external` reference (one under
    /// a `//host/` authority) can only be tied to the tree by its file name,
    /// so it also resolves when exactly one tracked path has that name.
    fn lookup(&self, bare: &str, file_dir: &str, external: bool) -> Option<&'a str> {
        let from_file = normalize_reference(&format!("{file_dir}{bare}"));
        if let Some(token) = self.path_versions.get(&from_file) {
            return Some(token.as_str());
        }

        let from_root = normalize_reference(bare);
        if let Some(token) = self.path_versions.get(&from_root) {
            return Some(token.as_str());
        }

        if !external {
            return None;
        }

        let name = bare.rsplit('/').next().unwrap_or(bare);
        let mut by_name = self
            .path_versions
            .iter()
            .filter(|(path, _)| return path.rsplit('/').next() == Some(name));
        return match (by_name.next(), by_name.next()) {
            (Some((_, token)), None) => Some(token.as_str()),
            _ => None,
        };
    }

    /// Rewrite every reference in `content`. `file_rel` is the file's path
    /// relative to the distribution root, `/`-separated.
    pub fn rewrite(&self, content: &[u8], file_rel: &str) -> Rewritten {
        let file_dir = file_rel.rfind('/').map_or("", |i| return file_rel.get(..=i).unwrap_or(""));
        let mut out = Vec::with_capacity(content.len());
        let mut last = 0;
        let mut matches = 0_usize;
        let mut unmapped = Vec::new();

        for m in self.regex.find_iter(content) {
            if !is_reference_boundary(content, m.start(), m.end()) {
                continue;
            }
            let Ok(matched) = std::str::from_utf8(m.as_bytes()) else {
                continue;
            };
            matches = matches.saturating_add(1);

            let external = is_external_reference(content, m.start());
            let replacement = match self.rewrite_reference(matched, file_dir, external) {
                Some(r) => r,
                None => {
                    unmapped.push(matched.to_string());
                    match self.unmapped {
                        UnmappedPolicy::Leave => matched.to_string(),
                        UnmappedPolicy::Placeholder => self.retag(matched, ""),
                    }
                },
            };

            out.extend_from_slice(content.get(last..m.start()).unwrap_or_default());
            out.extend_from_slice(replacement.as_bytes());
            last = m.end();
        }
        out.extend_from_slice(content.get(last..).unwrap_or_default());

        return Rewritten { content: out, matches, unmapped };
    }

    /// The current form of one matched reference, or `None` if unmapped.
    fn rewrite_reference(&self, matched: &str, file_dir: &str, external: bool) -> Option<String> {
        let bare = self.codec.strip_any(matched);
        let token = self.lookup(&bare, file_dir, external)?;
        return Some(self.retag(matched, token));
    }

    /// Strip `matched` and re-tag its file name, keeping its directory
    /// prefix verbatim. An empty `token` yields the placeholder.
    fn retag(&self, matched: &str, token: &str) -> String {
        let bare = self.codec.strip_any(matched);
        let split = bare.rfind('/').map_or(0, |i| return i.saturating_add(1));
        let (prefix, name) = bare.split_at(split);
        return format!("{prefix}{}", self.codec.tag(name, token).name);
    }
}

/// Build the reference pattern for a run.
///
/// A caller-supplied pattern is used as-is. Tracked mode joins one
/// [`VersionCodec::match_pattern`] clause per distinct versioned file name,
/// longest first so `app.min.js.map` wins over `app.min.js`. Generic mode
/// matches any plausible versioned path.
pub fn build_pattern(config: &Config, codec: &VersionCodec, info: &RunInfo) -> String {
    if let Some(pattern) = &config.pattern {
        return pattern.clone();
    }

    let tokens = codec.token_run_pattern();
    return match config.match_mode {
        MatchMode::Generic => match codec.placement() {
            Placement::End => format!("{PREFIX}{SEGMENT_CLASS}+{tokens}"),
            Placement::Mid => format!("{PREFIX}\\.?[0-9A-Za-z_~@%+-]+{tokens}(?:\\.[0-9A-Za-z_~@%+-]+)*"),
        },
        MatchMode::Tracked => {
            let mut names: Vec<String> = info
                .versioned_files
                .iter()
                .map(|f| return PathParts::decompose(f, codec).bare_file)
                .collect();
            names.sort_by(|a, b| return b.len().cmp(&a.len()).then_with(|| return a.cmp(b)));
            names.dedup();
            let clauses: Vec<String> = names.iter().map(|n| return codec.match_pattern(n)).collect();
            format!("{PREFIX}(?:{})", clauses.join("|"))
        },
    };
}

/// Whether a byte can continue a file name.
const fn is_name_byte(b: u8) -> bool {
    return b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'~' | b'@' | b'%' | b'+' | b'-');
}

/// A match is a reference only if it is not glued to a longer name: the byte
/// before must not be a name byte, and the text after must not continue the
/// name (a single trailing `.` followed by a non-name byte is punctuation).
fn is_reference_boundary(content: &[u8], start: usize, end: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| return content.get(i)).copied();
    if before.is_some_and(is_name_byte) {
        return false;
    }

    return match content.get(end).copied() {
        Some(b'.') => !content.get(end.saturating_add(1)).copied().is_some_and(is_name_byte),
        Some(b) => !is_name_byte(b),
        None => true,
    };
}

/// Whether a byte ends the run of text a reference can be part of.
const fn is_run_break(b: u8) -> bool {
    return b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b'`' | b'(' | b')' | b'<' | b'>' | b'=' | b',');
}

/// Whether the match starting at `start` sits under a `//` authority in the
/// same run of text (`https://cdn.example.com/js/` or `//cdn/js/`), so it
/// points outside the distribution tree.
fn is_external_reference(content: &[u8], start: usize) -> bool {
    let before = content.get(..start).unwrap_or_default();
    let run_start = before.iter().rposition(|&b| return is_run_break(b)).map_or(0, |i| return i.saturating_add(1));
    let run = before.get(run_start..).unwrap_or_default();
    return run.windows(2).any(|w| return w == b"//");
}

/// Collapse `.` and `..` segments of a `/`-separated reference without
/// touching the filesystem. Leading `..` is preserved when there is nothing
/// left to pop; a leading `/` is dropped.
fn normalize_reference(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                let can_pop = segments.last().is_some_and(|s| return *s != "..");
                if can_pop {
                    segments.pop();
                } else {
                    segments.push(segment);
                }
            },
            other => segments.push(other),
        }
    }
    return segments.join("/");
}

/// Rewrite references throughout the distribution tree.
///
/// Requires `info` populated by [`crate::version`]. Rewrite bookkeeping in
/// `info` is reset first, so a second run against already-current references
/// records every matching file under `checked_file_paths` and writes nothing.
/// Files with no matches are neither written nor recorded.
///
/// # Errors
///
/// Returns `Error::MissingRunInfo` if the mapping is empty, `Error::InvalidPattern`
/// if the pattern does not compile, or `Error::Io`/`Error::Walk` on the first
/// filesystem failure. Files written before a failure stay written.
pub fn replace(config: &Config, info: &mut RunInfo) -> Result<(), Error> {
    if !info.is_versioned() {
        return Err(Error::MissingRunInfo);
    }
    let codec = VersionCodec::new(config)?;

    info.pattern = build_pattern(config, &codec, info);
    info.total_source_replaces = 0;
    info.updated_file_paths.clear();
    info.checked_file_paths.clear();
    info.warnings.retain(|w| return !matches!(w, Warning::UnmappedReference { .. }));
    log::debug!("rewrite pattern: {}", info.pattern);

    let snapshot = info.clone();
    let rewriter = Rewriter::new(&snapshot.pattern, &codec, &snapshot, config.unmapped)?;

    for entry in WalkDir::new(&config.dist).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = slash_path(entry.path().strip_prefix(&config.dist).unwrap_or(entry.path()));
        if !config.should_rewrite(&rel) {
            continue;
        }
        rewrite_file(&rewriter, entry.path(), &rel, info)?;
    }

    return Ok(());
}

/// Rewrite one file and record the outcome in `info`.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read or written.
fn rewrite_file(rewriter: &Rewriter<'_>, path: &Path, rel: &str, info: &mut RunInfo) -> Result<(), Error> {
    let original = std::fs::read(path).map_err(Error::io(path))?;
    let rewritten = rewriter.rewrite(&original, rel);

    for reference in rewritten.unmapped {
        info.warn(Warning::UnmappedReference { file: path.to_path_buf(), reference });
    }

    if rewritten.matches == 0 {
        return Ok(());
    }

    if rewritten.content == original {
        log::debug!("{} already current ({} references)", path.display(), rewritten.matches);
        info.checked_file_paths.push(PathBuf::from(path));
        return Ok(());
    }

    log::debug!("updating {} ({} references)", path.display(), rewritten.matches);
    std::fs::write(path, &rewritten.content).map_err(Error::io(path))?;
    info.total_source_replaces = info.total_source_replaces.saturating_add(rewritten.matches);
    info.updated_file_paths.push(PathBuf::from(path));
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn info(entries: &[(&str, &str, &str)]) -> RunInfo {
        let mut info = RunInfo::default();
        for (bare, token, output) in entries {
            info.path_versions.insert((*bare).to_string(), (*token).to_string());
            info.versioned_files.push((*output).to_string());
        }
        return info;
    }

    fn rewrite(config: &Config, info: &RunInfo, content: &str, file_rel: &str) -> (String, Rewritten) {
        let codec = VersionCodec::new(config).unwrap();
        let pattern = build_pattern(config, &codec, info);
        let rewriter = Rewriter::new(&pattern, &codec, info, config.unmapped).unwrap();
        let out = rewriter.rewrite(content.as_bytes(), file_rel);
        return (String::from_utf8(out.content.clone()).unwrap(), out);
    }

    fn end_info() -> RunInfo {
        return info(&[
            ("app.js", "BBBBBBBB", "app.js?fv=BBBBBBBB"),
            ("app.js.map", "MMMMMMMM", "app.js.map?fv=MMMMMMMM"),
            ("lib/util.js", "UUUUUUUU", "lib/util.js?fv=UUUUUUUU"),
        ]);
    }

    #[test]
    fn rewrites_relative_reference() {
        let config = Config::new("src", "dist");
        let (text, out) = rewrite(&config, &end_info(), "import a from './app.js?fv=00000000';", "index.js");
        assert_eq!(text, "import a from './app.js?fv=BBBBBBBB';");
        assert_eq!(out.matches, 1);
        assert!(out.unmapped.is_empty());
    }

    #[test]
    fn resolves_against_referencing_directory() {
        let config = Config::new("src", "dist");
        let content = "import u from './util.js?fv=0'; import a from '../app.js?fv=0';";
        let (text, out) = rewrite(&config, &end_info(), content, "lib/util.js?fv=UUUUUUUU");
        assert_eq!(
            text,
            "import u from './util.js?fv=UUUUUUUU'; import a from '../app.js?fv=BBBBBBBB';"
        );
        assert_eq!(out.matches, 2);
    }

    #[test]
    fn resolves_from_distribution_root() {
        let config = Config::new("src", "dist");
        let (text, _) = rewrite(&config, &end_info(), "<script src=\"/lib/util.js?fv=1\">", "a/b/page.html");
        assert_eq!(text, "<script src=\"/lib/util.js?fv=UUUUUUUU\">");
    }

    #[test]
    fn longer_names_are_not_confused_with_prefixes() {
        let config = Config::new("src", "dist");
        let (text, out) = rewrite(
            &config,
            &end_info(),
            "//# sourceMappingURL=app.js.map?fv=0\nmyapp.js?fv=0",
            "app.js?fv=BBBBBBBB",
        );
        assert_eq!(text, "//# sourceMappingURL=app.js.map?fv=MMMMMMMM\nmyapp.js?fv=0");
        assert_eq!(out.matches, 1);
    }

    #[test]
    fn current_references_are_unchanged_but_counted() {
        let config = Config::new("src", "dist");
        let content = "load('app.js?fv=BBBBBBBB')";
        let (text, out) = rewrite(&config, &end_info(), content, "index.js");
        assert_eq!(text, content);
        assert_eq!(out.matches, 1);
    }

    #[test]
    fn no_references_means_no_matches() {
        let config = Config::new("src", "dist");
        let (text, out) = rewrite(&config, &end_info(), "plain app.js text.", "readme.txt");
        assert_eq!(text, "plain app.js text.");
        assert_eq!(out.matches, 0);
    }

    #[test]
    fn mid_form_references() {
        let mut config = Config::new("src", "dist");
        config.placement = Placement::Mid;
        let info = info(&[("app.min.js", "BBBBBBBB", "app?fv=BBBBBBBB.min.js")]);
        let (text, out) = rewrite(&config, &info, "src=\"app?fv=00000000.min.js\".", "index.html");
        assert_eq!(text, "src=\"app?fv=BBBBBBBB.min.js\".");
        assert_eq!(out.matches, 1);
    }

    #[test]
    fn generic_mode_flags_untracked_references() {
        let mut config = Config::new("src", "dist");
        config.match_mode = MatchMode::Generic;
        let content = "a: ./app.js?fv=1 b: gone.js?fv=12345678";
        let (text, out) = rewrite(&config, &end_info(), content, "index.js");
        assert_eq!(text, "a: ./app.js?fv=BBBBBBBB b: gone.js?fv=00000000");
        assert_eq!(out.matches, 2);
        assert_eq!(out.unmapped, vec!["gone.js?fv=12345678".to_string()]);

        config.unmapped = UnmappedPolicy::Leave;
        let (text, _) = rewrite(&config, &end_info(), content, "index.js");
        assert_eq!(text, "a: ./app.js?fv=BBBBBBBB b: gone.js?fv=12345678");
    }

    #[test]
    fn unique_file_name_resolves_scheme_qualified_reference() {
        let mut config = Config::new("src", "dist");
        config.match_mode = MatchMode::Generic;
        let (text, _) = rewrite(&config, &end_info(), "https://cdn.example.com/x/util.js?fv=0", "index.html");
        assert_eq!(text, "https://cdn.example.com/x/util.js?fv=UUUUUUUU");
    }

    #[test]
    fn same_name_in_another_directory_is_unmapped() {
        let config = Config::new("src", "dist");
        let content = "<script src='vendor/app.js?fv=11111111'>";
        let (text, out) = rewrite(&config, &end_info(), content, "index.html");
        assert_eq!(text, "<script src='vendor/app.js?fv=00000000'>");
        assert_eq!(out.matches, 1);
        assert_eq!(out.unmapped, vec!["vendor/app.js?fv=11111111".to_string()]);

        let (text, out) = rewrite(&config, &end_info(), "<script src='lib/app.js?fv=1'>", "lib/index.html");
        assert_eq!(text, "<script src='lib/app.js?fv=00000000'>");
        assert_eq!(out.unmapped.len(), 1);
    }

    #[test]
    fn external_detection_stops_at_attribute_boundaries() {
        assert!(is_external_reference(b"src=\"//cdn/x/app.js", 13));
        assert!(is_external_reference(b"https://cdn.example.com/app.js", 24));
        assert!(!is_external_reference(b"// comment\nvendor/app.js", 11));
        assert!(!is_external_reference(b"<a href='//x'>vendor/app.js", 14));
    }

    #[test]
    fn concatenated_tokens_are_replaced_as_one() {
        let config = Config::new("src", "dist");
        let (text, out) = rewrite(&config, &end_info(), "load('app.js?fv=000?fv=111')", "index.js");
        assert_eq!(text, "load('app.js?fv=BBBBBBBB')");
        assert_eq!(out.matches, 1);

        let mut config = Config::new("src", "dist");
        config.match_mode = MatchMode::Generic;
        let (text, _) = rewrite(&config, &end_info(), "load('lib/util.js?fv=0?fv=1')", "index.js");
        assert_eq!(text, "load('lib/util.js?fv=UUUUUUUU')");
    }

    #[test]
    fn io_failure_stops_after_earlier_writes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "app.js?fv=0").unwrap();
        std::fs::write(dir.path().join("c.html"), "app.js?fv=0").unwrap();

        let config = Config::new("src", "dist");
        let codec = VersionCodec::new(&config).unwrap();
        let snapshot = end_info();
        let pattern = build_pattern(&config, &codec, &snapshot);
        let rewriter = Rewriter::new(&pattern, &codec, &snapshot, config.unmapped).unwrap();
        let mut info = end_info();

        let result = ["a.html", "b.html", "c.html"]
            .iter()
            .try_for_each(|rel| return rewrite_file(&rewriter, &dir.path().join(rel), rel, &mut info));

        let missing = dir.path().join("b.html");
        assert!(matches!(result, Err(Error::Io { ref path, .. }) if *path == missing));
        assert_eq!(info.updated_file_paths, vec![dir.path().join("a.html")]);
        assert_eq!(info.total_source_replaces, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.html")).unwrap(), "app.js?fv=BBBBBBBB");
        assert_eq!(std::fs::read_to_string(dir.path().join("c.html")).unwrap(), "app.js?fv=0");
    }

    #[test]
    fn tracked_pattern_orders_longest_first() {
        let config = Config::new("src", "dist");
        let codec = VersionCodec::new(&config).unwrap();
        let pattern = build_pattern(&config, &codec, &end_info());
        let map = pattern.find("app\\.js\\.map").unwrap();
        let app = pattern.find("(app\\.js(?:").unwrap();
        assert!(map < app, "{pattern}");
    }

    #[test]
    fn normalizes_references() {
        assert_eq!(normalize_reference("a/./b/../c.js"), "a/c.js");
        assert_eq!(normalize_reference("../../c.js"), "../../c.js");
        assert_eq!(normalize_reference("/c.js"), "c.js");
        assert_eq!(normalize_reference("x/../../c.js"), "../c.js");
    }

    #[test]
    fn replace_requires_versioned_info() {
        let config = Config::new("src", "dist");
        let mut info = RunInfo::default();
        assert!(matches!(replace(&config, &mut info), Err(Error::MissingRunInfo)));
    }
}
