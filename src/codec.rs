//! Version token codec: tagging names with tokens, stripping them, and
//! building the patterns that find them.

use std::borrow::Cow;

use regex::Regex;

use crate::config::{Config, Placement};
use crate::error::Error;

/// Character class of the token alphabet (base64url).
pub const TOKEN_CLASS: &str = "[0-9A-Za-z_-]";

/// Character used to fill placeholder tokens.
const PLACEHOLDER_CHAR: char = '0';

/// Whether `c` belongs to the token alphabet.
pub const fn is_token_char(c: char) -> bool {
    return c.is_ascii_alphanumeric() || c == '-' || c == '_';
}

/// A versioned name produced by [`VersionCodec::tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged {
    /// True when the digest was unusable and a placeholder token was used.
    pub dummied: bool,
    /// The versioned name.
    pub name: String,
    /// The token embedded in `name`, without the delimiter.
    pub token: String,
}

/// Encodes and decodes version tokens for one run.
///
/// Built from a [`Config`]; holds the compiled patterns so no state is shared
/// between runs.
#[derive(Debug, Clone)]
pub struct VersionCodec {
    /// Matches the delimiter plus a token of any length, including zero.
    any_size: Regex,
    /// Delimiter text, unescaped.
    delimiter: String,
    /// Matches the delimiter plus a token of exactly `size` characters.
    fixed_size: Regex,
    /// Token placement for [`Self::tag`].
    placement: Placement,
    /// Token length.
    size: usize,
}

impl VersionCodec {
    /// Any-size token pattern, e.g. `\?fv=[0-9A-Za-z_-]*`. Matches every
    /// token in a name that carries several, for sanitization.
    pub fn any_size_pattern(&self) -> String {
        return any_size_pattern(&self.delimiter);
    }

    /// The unescaped delimiter.
    pub fn delimiter(&self) -> &str {
        return &self.delimiter;
    }

    /// The delimiter plus token of the first token in `text`, e.g. `?fv=4mIbJJPq`.
    pub fn find_delim_ver<'t>(&self, text: &'t str) -> Option<&'t str> {
        return self.any_size.find(text).map(|m| return m.as_str());
    }

    /// The token (without delimiter) of the first token in `text`.
    pub fn find_token<'t>(&self, text: &'t str) -> Option<&'t str> {
        return self
            .find_delim_ver(text)
            .and_then(|dv| return dv.strip_prefix(self.delimiter.as_str()));
    }

    /// Fixed-size token pattern, e.g. `\?fv=[0-9A-Za-z_-]{8}`, required to end
    /// at a non-token character or the end of the text.
    pub fn fixed_size_pattern(&self) -> String {
        return fixed_size_pattern(&self.delimiter, self.size);
    }

    /// Build a codec from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the token patterns cannot be
    /// compiled. The delimiter is escaped, so in practice this only happens
    /// for a size beyond the regex engine's repetition limit.
    pub fn from_parts(delimiter: &str, size: usize, placement: Placement) -> Result<Self, Error> {
        return Ok(Self {
            any_size: compile(&any_size_pattern(delimiter))?,
            delimiter: delimiter.to_string(),
            fixed_size: compile(&fixed_size_pattern(delimiter, size))?,
            placement,
            size,
        });
    }

    /// Whether `name` carries a token of exactly the configured size, the
    /// convention for "this file wants to be versioned".
    pub fn has_fixed_token(&self, name: &str) -> bool {
        return self.fixed_size.is_match(name);
    }

    /// Pattern matching `bare_name` under any version token, parenthesized so
    /// several can be joined into one alternation. Stray concatenated tokens
    /// (`app.js?fv=000?fv=111`) are matched as one run. The compound extension
    /// is matched literally, so `app.min.js` never matches `app.min.js.map`
    /// outputs when anchored.
    pub fn match_pattern(&self, bare_name: &str) -> String {
        let any = self.token_run_pattern();
        return match self.placement {
            Placement::End => format!("({}{any})", regex::escape(bare_name)),
            Placement::Mid => {
                let (stem, ext) = split_compound_ext(bare_name);
                format!("({}{any}{})", regex::escape(stem), regex::escape(ext))
            },
        };
    }

    /// Build the codec for a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for a rejected config, or
    /// `Error::InvalidPattern` if the token patterns cannot be compiled.
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        return Self::from_parts(&config.delimiter, config.version_size, config.placement);
    }

    /// The all-zero placeholder token.
    pub fn placeholder(&self) -> String {
        return PLACEHOLDER_CHAR.to_string().repeat(self.size);
    }

    /// Token placement in effect.
    pub const fn placement(&self) -> Placement {
        return self.placement;
    }

    /// One or more consecutive any-size tokens, e.g.
    /// `(?:\?fv=[0-9A-Za-z_-]*)+`.
    pub fn token_run_pattern(&self) -> String {
        return format!("(?:{})+", self.any_size_pattern());
    }

    /// Configured token length.
    pub const fn size(&self) -> usize {
        return self.size;
    }

    /// Remove every delimiter+token occurrence from `text`, including stray
    /// concatenated tokens such as `test.txt?fv=000?fv=JPq`.
    pub fn strip_any<'t>(&self, text: &'t str) -> Cow<'t, str> {
        return self.any_size.replace_all(text, "");
    }

    /// Insert `delimiter + digest[..size]` into `bare_name`, after the whole
    /// name (end placement) or before its compound extension (mid placement).
    ///
    /// `digest` may be a full digest or an existing token. A digest shorter
    /// than the token size, or one with characters outside the token
    /// alphabet, is replaced by the placeholder and the result is flagged.
    pub fn tag(&self, bare_name: &str, digest: &str) -> Tagged {
        let (token, dummied) = match self.token_from_digest(digest) {
            Some(t) => (t.to_string(), false),
            None => (self.placeholder(), true),
        };

        let name = match self.placement {
            Placement::End => format!("{bare_name}{}{token}", self.delimiter),
            Placement::Mid => {
                let (stem, ext) = split_compound_ext(bare_name);
                format!("{stem}{}{token}{ext}", self.delimiter)
            },
        };

        return Tagged { dummied, name, token };
    }

    /// The first `size` characters of `digest`, if it has that many and
    /// they are all token characters.
    pub fn token_from_digest<'d>(&self, digest: &'d str) -> Option<&'d str> {
        let token = digest.get(..self.size)?;
        if token.chars().all(is_token_char) {
            return Some(token);
        }
        return None;
    }
}

/// See [`VersionCodec::any_size_pattern`].
fn any_size_pattern(delimiter: &str) -> String {
    return format!("{}{TOKEN_CLASS}*", regex::escape(delimiter));
}

/// See [`VersionCodec::fixed_size_pattern`].
fn fixed_size_pattern(delimiter: &str, size: usize) -> String {
    return format!("{}{TOKEN_CLASS}{{{size}}}(?:$|[^0-9A-Za-z_-])", regex::escape(delimiter));
}

/// Compile a pattern, attaching the pattern text to any failure.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if `pattern` does not compile.
pub fn compile(pattern: &str) -> Result<Regex, Error> {
    return Regex::new(pattern).map_err(|source| {
        return Error::InvalidPattern { pattern: pattern.to_string(), source };
    });
}

/// Split the last path segment of `name` at its first `.`, giving the stem
/// and the compound extension (`app.min.js` → `app`, `.min.js`). A leading
/// dot belongs to the stem, so `.htaccess` has no extension.
pub fn split_compound_ext(name: &str) -> (&str, &str) {
    let segment_start = name.rfind('/').map_or(0, |i| return i.saturating_add(1));
    let segment = name.get(segment_start..).unwrap_or("");
    let dot = segment
        .char_indices()
        .skip(1)
        .find(|&(_, c)| return c == '.')
        .map(|(i, _)| return segment_start.saturating_add(i));

    return match dot {
        Some(i) => name.split_at(i),
        None => (name, ""),
    };
}
