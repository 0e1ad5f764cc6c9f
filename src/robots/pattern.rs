//! Path pattern compilation for Allow/Disallow rules
//!
//! Patterns are classified once, at parse time, into the cheapest matcher that
//! implements their semantics:
//!
//! | Pattern shape            | Matcher                                       |
//! |--------------------------|-----------------------------------------------|
//! | ends with `/*`           | prefix match on the pattern without the `*`   |
//! | contains `*`, `?` or ends with `$` | anchored regex (`*` = any run, `?` = one char) |
//! | ends with `/`            | prefix match                                  |
//! | anything else            | exact match, or exact match followed by `?`   |
//!
//! A `*` pattern without `?` also accepts a trailing query string unless it ends
//! with `$`, which pins the match to the end of the path.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Compiled regex programs above this size are rejected
const MAX_REGEX_SIZE: usize = 1 << 16;

/// Reasons a rule pattern cannot be used
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern contains invalid character {0:?}")]
    InvalidCharacter(char),

    #[error("pattern too complex: {0}")]
    TooComplex(#[from] regex::Error),
}

/// A rule pattern compiled for matching against request paths
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Matches any path starting with the stored prefix
    Prefix(String),
    /// Matches when the anchored expression matches the whole path
    Wildcard(Regex),
    /// Matches the stored path exactly, with or without a query string
    Exact(String),
}

impl PathPattern {
    /// Compiles an already-normalized pattern (leading `/`, no whitespace)
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        if let Some(base) = pattern.strip_suffix('*') {
            if base.ends_with('/') {
                return Ok(Self::Prefix(base.to_string()));
            }
        }

        if pattern.contains(&['*', '?'][..]) || pattern.ends_with('$') {
            return Ok(Self::Wildcard(compile_wildcard(pattern)?));
        }

        if pattern.ends_with('/') {
            return Ok(Self::Prefix(pattern.to_string()));
        }

        Ok(Self::Exact(pattern.to_string()))
    }

    /// Returns true if `path` (path plus optional query) matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Wildcard(regex) => regex.is_match(path),
            Self::Exact(exact) => match path.strip_prefix(exact.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('?'),
                None => false,
            },
        }
    }
}

/// Normalizes a raw Allow/Disallow value into a rule pattern
///
/// Surrounding whitespace is trimmed and a leading `/` is added when missing.
/// Whitespace or control characters inside the pattern make it unusable.
pub fn normalize_pattern(raw: &str) -> Result<String, PatternError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PatternError::Empty);
    }

    if let Some(bad) = trimmed
        .chars()
        .find(|c| c.is_whitespace() || c.is_control())
    {
        return Err(PatternError::InvalidCharacter(bad));
    }

    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

fn compile_wildcard(pattern: &str) -> Result<Regex, regex::Error> {
    let (body, pinned_end) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let mut expr = String::with_capacity(body.len() * 2 + 16);
    expr.push('^');

    let mut literal = String::new();
    for c in body.chars() {
        match c {
            '*' | '?' => {
                expr.push_str(&regex::escape(&literal));
                literal.clear();
                expr.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    expr.push_str(&regex::escape(&literal));

    if !pinned_end && !body.contains('?') {
        expr.push_str(r"(\?.*)?");
    }
    expr.push('$');

    RegexBuilder::new(&expr)
        .size_limit(MAX_REGEX_SIZE)
        .build()
}
