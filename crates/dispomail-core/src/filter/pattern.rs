//! Single domain pattern compilation
//!
//! A pattern is matched case-insensitively anywhere inside the email
//! address. `*` stands for any run of characters (including none); every
//! other character is literal.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Wildcard token inside a domain pattern
pub const WILDCARD: char = '*';

/// Upper bound for the compiled program of one wildcard pattern
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A compiled domain pattern
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// No wildcard: lowercase substring search
    Literal(String),
    /// Contains `*`: unanchored case-insensitive regex
    Wildcard(Regex),
}

impl CompiledPattern {
    /// Compile a raw pattern.
    ///
    /// Returns `None` for empty patterns and for patterns the regex engine
    /// rejects; such entries never match.
    pub fn compile(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return None;
        }

        if !pattern.contains(WILDCARD) {
            return Some(CompiledPattern::Literal(pattern.to_lowercase()));
        }

        let source = wildcard_to_regex(pattern);
        match RegexBuilder::new(&source)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => Some(CompiledPattern::Wildcard(regex)),
            Err(e) => {
                warn!(pattern, error = %e, "Skipping pattern that does not compile");
                None
            }
        }
    }

    /// Match against an email whose lowercase form is already known.
    ///
    /// `email` is used for regex matching, `email_lower` for literal
    /// substring search.
    pub fn is_match_prepared(&self, email: &str, email_lower: &str) -> bool {
        match self {
            CompiledPattern::Literal(needle) => email_lower.contains(needle.as_str()),
            CompiledPattern::Wildcard(regex) => regex.is_match(email),
        }
    }

    /// Match against a raw email address
    pub fn is_match(&self, email: &str) -> bool {
        self.is_match_prepared(email, &email.to_lowercase())
    }
}

/// Translate a wildcard pattern into regex source.
///
/// Every literal run is escaped; each `*` becomes `.*`.
pub fn wildcard_to_regex(pattern: &str) -> String {
    pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

/// Check whether a single pattern matches an email address.
///
/// Pure function; malformed or empty patterns never match.
pub fn matches(pattern: &str, email: &str) -> bool {
    CompiledPattern::compile(pattern).is_some_and(|p| p.is_match(email))
}
