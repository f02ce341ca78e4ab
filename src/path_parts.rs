//! Decomposition of a path string into directory, file, extension, and
//! version-token parts. Pure string parsing; never touches the filesystem.

use std::path::{Component, Path};

use serde::Serialize;

use crate::codec::{VersionCodec, split_compound_ext};

/// Parts of one path. Fields are empty when not applicable.
///
/// For `e/app?fv=4mIbJJPq.min.js`:
///
/// | field       | value                       |
/// |-------------|-----------------------------|
/// | `dir`       | `e/`                        |
/// | `file`      | `app?fv=4mIbJJPq.min.js`    |
/// | `base`      | `app?fv=4mIbJJPq`           |
/// | `ext`       | `.min.js`                   |
/// | `ext_base`  | `.js`                       |
/// | `delim_ver` | `?fv=4mIbJJPq`              |
/// | `version`   | `4mIbJJPq`                  |
/// | `bare_path` | `e/app.min.js`              |
/// | `bare_file` | `app.min.js`                |
/// | `bare`      | `app`                       |
///
/// Scheme-qualified input also fills the URL fields. For
/// `https://example.com:8081/bob/joe.txt?name=ferret#nose?name=bob`:
///
/// | field            | value                              |
/// |------------------|------------------------------------|
/// | `scheme`         | `https`                            |
/// | `authority`      | `example.com:8081`                 |
/// | `host`           | `example.com`                      |
/// | `port`           | `:8081`                            |
/// | `uri_path`       | `/bob/joe.txt`                     |
/// | `query`          | `name=ferret`                      |
/// | `fragment`       | `nose?name=bob`                    |
/// | `anchor`         | `nose`                             |
/// | `fragment_query` | `name=bob`                         |
/// | `quag`           | `?name=ferret#nose?name=bob`       |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathParts {
    /// Fragment up to its first `?`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub anchor: String,
    /// Authority of a scheme-qualified path, e.g. `example.com:8081`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub authority: String,
    /// File name without directory or extension, token included.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base: String,
    /// File name with every token and the extension removed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bare: String,
    /// File name with every token removed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bare_file: String,
    /// `dir` followed by `bare_file`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bare_path: String,
    /// Delimiter plus token of the first token in the file name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub delim_ver: String,
    /// Directory prefix including its trailing separator.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dir: String,
    /// Compound extension, e.g. `.min.js`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ext: String,
    /// Final extension segment, e.g. `.js`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ext_base: String,
    /// File name without directory.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// The file name, only when it carries a token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filever: String,
    /// Text after the first `#` of a scheme-qualified path.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fragment: String,
    /// Fragment after its first `?`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fragment_query: String,
    /// The path as given.
    pub full: String,
    /// Authority without user info or port.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Port with its leading `:`, e.g. `:8081`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    /// `?query` followed by `#fragment`, each only when present.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub quag: String,
    /// Text between the first `?` and the fragment, without the `?`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    /// Scheme of a scheme-qualified path, e.g. `https`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    /// Path component of a scheme-qualified path. Empty when it is just `/`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri_path: String,
    /// Token of the first token in the file name, without delimiter.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl PathParts {
    /// Decompose `full`. Never fails: malformed input degrades to empty fields.
    ///
    /// `dir + file == full` holds for every input except one made only of
    /// separators, which decomposes to all-empty parts.
    pub fn decompose(full: &str, codec: &VersionCodec) -> Self {
        let mut parts = Self { full: full.to_string(), ..Self::default() };
        if full.chars().all(is_separator) {
            return parts;
        }

        let Cut { authority, dir, file, rest, scheme } = cut_path(full);
        if !scheme.is_empty() {
            parts.scheme = scheme.to_string();
            parts.authority = authority.to_string();
            parts.fill_uri(rest);
        }
        parts.dir = dir.to_string();
        parts.file = file.to_string();

        parts.base = split_compound_ext(file).0.to_string();
        parts.bare_file = codec.strip_any(file).into_owned();
        parts.bare = codec.strip_any(&parts.base).into_owned();
        parts.bare_path = format!("{dir}{}", parts.bare_file);

        let (_, ext) = split_compound_ext(&parts.bare_file);
        parts.ext = ext.to_string();
        parts.ext_base = final_ext(&parts.bare_file).to_string();

        if let Some(delim_ver) = codec.find_delim_ver(file) {
            parts.delim_ver = delim_ver.to_string();
            parts.version = delim_ver.get(codec.delimiter().len()..).unwrap_or("").to_string();
            parts.filever = parts.file.clone();
        }

        return parts;
    }

    /// Fill the URL fields from `authority` and `rest`, the text after it.
    fn fill_uri(&mut self, rest: &str) {
        let (host, port) = split_host_port(&self.authority);
        self.host = host.to_string();
        self.port = port.to_string();

        let (before_fragment, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (uri_path, query) = before_fragment.split_once('?').unwrap_or((before_fragment, ""));
        if uri_path != "/" {
            self.uri_path = uri_path.to_string();
        }
        self.query = query.to_string();
        self.fragment = fragment.to_string();

        let (anchor, fragment_query) = fragment.split_once('?').unwrap_or((fragment, ""));
        self.anchor = anchor.to_string();
        self.fragment_query = fragment_query.to_string();

        if !query.is_empty() {
            self.quag = format!("?{query}");
        }
        if !fragment.is_empty() {
            self.quag.push('#');
            self.quag.push_str(fragment);
        }
    }
}

/// A path cut at its scheme, authority, and last directory separator.
struct Cut<'p> {
    authority: &'p str,
    dir: &'p str,
    file: &'p str,
    /// Everything after the authority.
    rest: &'p str,
    scheme: &'p str,
}

/// Split a path into scheme, authority, directory, and file name.
///
/// The directory keeps its trailing separator. A scheme-qualified path keeps
/// `scheme://authority` at the front of the directory, so
/// `https://host/js/app.js` has directory `https://host/js/`. Its query and
/// fragment stay in the file name, and separators inside them do not start a
/// new file name.
fn cut_path(path: &str) -> Cut<'_> {
    let (scheme, authority, path_start) = match split_scheme(path) {
        Some((scheme, rest_start)) => {
            let rest = path.get(rest_start..).unwrap_or("");
            let authority_len = rest.find(|c| return is_separator(c) || matches!(c, '?' | '#')).unwrap_or(rest.len());
            let authority = rest.get(..authority_len).unwrap_or("");
            (scheme, authority, rest_start.saturating_add(authority_len))
        },
        None => ("", "", 0),
    };

    let rest = path.get(path_start..).unwrap_or("");
    let local = if scheme.is_empty() {
        rest
    } else {
        rest.find(['?', '#']).and_then(|i| return rest.get(..i)).unwrap_or(rest)
    };
    let dir_end = local
        .rfind(is_separator)
        .map_or(path_start, |i| return path_start.saturating_add(i).saturating_add(1));

    let (dir, file) = path.split_at(dir_end);
    return Cut { authority, dir, file, rest, scheme };
}

/// Split an authority into host and `:port`, dropping any `user@` prefix.
/// A bracketed IPv6 host keeps its colons.
fn split_host_port(authority: &str) -> (&str, &str) {
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let search_from = host_port.rfind(']').unwrap_or(0);
    return match host_port.get(search_from..).and_then(|tail| return tail.find(':')) {
        Some(i) => host_port.split_at(search_from.saturating_add(i)),
        None => (host_port, ""),
    };
}

/// The final extension of `file`, from its last `.` (not counting a leading dot).
fn final_ext(file: &str) -> &str {
    return match file.rfind('.') {
        Some(i) if i > 0 => file.get(i..).unwrap_or(""),
        _ => "",
    };
}

/// Render a relative path with `/` separators regardless of platform, the
/// form references take inside text files.
pub fn slash_path(path: &Path) -> String {
    return path
        .components()
        .filter_map(|c| {
            return match c {
                Component::CurDir => None,
                other => Some(other.as_os_str().to_string_lossy()),
            };
        })
        .collect::<Vec<_>>()
        .join("/");
}

/// Whether `c` separates path segments.
const fn is_separator(c: char) -> bool {
    return c == '/' || c == '\\';
}

/// If `path` starts with `scheme://`, return the scheme and the byte offset
/// just past `://`. Scheme characters follow RFC 3986.
fn split_scheme(path: &str) -> Option<(&str, usize)> {
    let idx = path.find("://")?;
    let scheme = path.get(..idx)?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| return c.is_ascii_alphabetic())
        && chars.all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }
    return Some((scheme, idx.saturating_add(3)));
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::config::Placement;

    fn decompose(path: &str) -> PathParts {
        let codec = VersionCodec::from_parts("~fv=", 8, Placement::Mid).unwrap();
        return PathParts::decompose(path, &codec);
    }

    #[test]
    fn plain_names() {
        let p = decompose("app");
        assert_eq!((p.dir.as_str(), p.file.as_str(), p.base.as_str()), ("", "app", "app"));
        assert_eq!((p.ext.as_str(), p.ext_base.as_str()), ("", ""));
        assert_eq!((p.bare_path.as_str(), p.bare_file.as_str(), p.bare.as_str()), ("app", "app", "app"));
        assert!(p.version.is_empty() && p.filever.is_empty());

        let p = decompose("/a/e/app.min.js");
        assert_eq!(p.dir, "/a/e/");
        assert_eq!(p.file, "app.min.js");
        assert_eq!(p.base, "app");
        assert_eq!(p.ext, ".min.js");
        assert_eq!(p.ext_base, ".js");
        assert_eq!(p.bare_path, "/a/e/app.min.js");
    }

    #[test]
    fn mid_versioned_compound_extension() {
        let p = decompose("e/app~fv=4mIbJJPq.min.js");
        assert_eq!(p.dir, "e/");
        assert_eq!(p.file, "app~fv=4mIbJJPq.min.js");
        assert_eq!(p.base, "app~fv=4mIbJJPq");
        assert_eq!(p.ext, ".min.js");
        assert_eq!(p.ext_base, ".js");
        assert_eq!(p.filever, "app~fv=4mIbJJPq.min.js");
        assert_eq!(p.delim_ver, "~fv=4mIbJJPq");
        assert_eq!(p.version, "4mIbJJPq");
        assert_eq!(p.bare_path, "e/app.min.js");
        assert_eq!(p.bare_file, "app.min.js");
        assert_eq!(p.bare, "app");
        assert_eq!(format!("{}{}", p.dir, p.file), p.full);
    }

    #[test]
    fn end_versioned_name() {
        let p = decompose("e/app.min.js~fv=4mIbJJPq");
        assert_eq!(p.version, "4mIbJJPq");
        assert_eq!(p.bare_path, "e/app.min.js");
        assert_eq!(p.ext, ".min.js");
        assert_eq!(p.ext_base, ".js");
        assert_eq!(p.bare, "app");

        let p = decompose("e/app~fv=4mIbJJPq");
        assert_eq!(p.base, "app~fv=4mIbJJPq");
        assert_eq!(p.bare_path, "e/app");
        assert_eq!(p.bare, "app");
    }

    #[test]
    fn stray_tokens_are_all_stripped() {
        let p = decompose("test~fv=000~fv=JPq.txt");
        assert_eq!(p.bare_file, "test.txt");
        assert_eq!(p.version, "000");
    }

    #[test]
    fn empty_and_separator_only() {
        assert_eq!(decompose(""), PathParts::default());
        let p = decompose("/");
        assert_eq!(p.full, "/");
        assert!(p.dir.is_empty() && p.file.is_empty() && p.bare_path.is_empty());
    }

    #[test]
    fn trailing_separator_is_all_directory() {
        let p = decompose("a/b/");
        assert_eq!(p.dir, "a/b/");
        assert!(p.file.is_empty());
    }

    #[test]
    fn scheme_qualified_paths_keep_authority_in_dir() {
        let p = decompose("https://cdn.example.com:8081/js/app~fv=4mIbJJPq.js");
        assert_eq!(p.scheme, "https");
        assert_eq!(p.authority, "cdn.example.com:8081");
        assert_eq!(p.dir, "https://cdn.example.com:8081/js/");
        assert_eq!(p.file, "app~fv=4mIbJJPq.js");
        assert_eq!(p.bare_path, "https://cdn.example.com:8081/js/app.js");

        let p = decompose("https://localhost:8081");
        assert_eq!(p.dir, "https://localhost:8081");
        assert!(p.file.is_empty());
    }

    #[test]
    fn uri_fields_for_scheme_qualified_paths() {
        let p = decompose("https://cyphr.me/coze");
        assert_eq!(p.scheme, "https");
        assert_eq!(p.authority, "cyphr.me");
        assert_eq!(p.host, "cyphr.me");
        assert!(p.port.is_empty());
        assert_eq!(p.uri_path, "/coze");
        assert_eq!(p.dir, "https://cyphr.me/");
        assert_eq!(p.file, "coze");
        assert!(p.query.is_empty() && p.fragment.is_empty() && p.quag.is_empty());

        for full in ["https://localhost:8081", "https://localhost:8081/"] {
            let p = decompose(full);
            assert_eq!(p.authority, "localhost:8081");
            assert_eq!(p.host, "localhost");
            assert_eq!(p.port, ":8081");
            assert!(p.uri_path.is_empty(), "{full}");
        }

        let p = decompose("sftp://example.com/joe/bob/file.txt");
        assert_eq!(p.scheme, "sftp");
        assert_eq!(p.authority, "example.com");
        assert_eq!(p.host, "example.com");
        assert_eq!(p.uri_path, "/joe/bob/file.txt");
        assert_eq!(p.dir, "sftp://example.com/joe/bob/");
        assert_eq!(p.file, "file.txt");
        assert_eq!(p.ext, ".txt");
    }

    #[test]
    fn query_and_fragment_parts() {
        let p = decompose("https://example.com:8081/bob/joe.txt?name=ferret#nose?name=bob");
        assert_eq!(p.host, "example.com");
        assert_eq!(p.port, ":8081");
        assert_eq!(p.uri_path, "/bob/joe.txt");
        assert_eq!(p.query, "name=ferret");
        assert_eq!(p.fragment, "nose?name=bob");
        assert_eq!(p.anchor, "nose");
        assert_eq!(p.fragment_query, "name=bob");
        assert_eq!(p.quag, "?name=ferret#nose?name=bob");
        assert_eq!(p.dir, "https://example.com:8081/bob/");
        assert_eq!(format!("{}{}", p.dir, p.file), p.full);

        let p = decompose("https://user@[::1]:8443/a?next=/b/c");
        assert_eq!(p.host, "[::1]");
        assert_eq!(p.port, ":8443");
        assert_eq!(p.query, "next=/b/c");
        assert_eq!(p.quag, "?next=/b/c");
        assert_eq!(p.file, "a?next=/b/c");
    }

    #[test]
    fn local_paths_have_no_uri_fields() {
        let p = decompose("js/app.js?x=1#y");
        assert!(p.scheme.is_empty() && p.host.is_empty() && p.uri_path.is_empty());
        assert!(p.query.is_empty() && p.fragment.is_empty() && p.quag.is_empty());
    }

    #[test]
    fn slash_paths_drop_current_dir() {
        assert_eq!(slash_path(Path::new("./a/b/c.js")), "a/b/c.js");
        assert_eq!(slash_path(Path::new("c.js")), "c.js");
        assert_eq!(slash_path(Path::new("")), "");
    }

    #[test]
    fn hidden_files_have_no_extension() {
        let p = decompose("conf/.htaccess");
        assert_eq!(p.base, ".htaccess");
        assert!(p.ext.is_empty() && p.ext_base.is_empty());
    }
}
