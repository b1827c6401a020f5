//! Compiled pattern list
//!
//! Holds every pattern of one snapshot, split into literal patterns and
//! wildcard patterns. Literal entries are checked with a lowercase
//! substring search; only wildcard entries pay for a regex.

use super::pattern::CompiledPattern;
use tracing::debug;

/// Compiled blocklist used on the query path
#[derive(Debug, Default)]
pub struct PatternList {
    /// Patterns without a wildcard, lowercased, with their source text
    literals: Vec<(String, String)>,
    /// Wildcard patterns with their source text
    wildcards: Vec<(CompiledPattern, String)>,
    /// Entries that were empty or failed to compile
    skipped: usize,
}

impl PatternList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a list of raw patterns, skipping the ones that cannot match
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for entry in entries {
            list.push(entry.as_ref());
        }

        debug!(
            literals = list.literals.len(),
            wildcards = list.wildcards.len(),
            skipped = list.skipped,
            "Compiled pattern list"
        );
        list
    }

    /// Add one raw pattern
    pub fn push(&mut self, raw: &str) {
        match CompiledPattern::compile(raw) {
            Some(CompiledPattern::Literal(needle)) => {
                self.literals.push((needle, raw.trim().to_string()));
            }
            Some(compiled @ CompiledPattern::Wildcard(_)) => {
                self.wildcards.push((compiled, raw.trim().to_string()));
            }
            None => self.skipped += 1,
        }
    }

    /// Check whether any pattern matches the email
    pub fn matches_any(&self, email: &str) -> bool {
        self.first_match(email).is_some()
    }

    /// Source text of the first matching pattern
    pub fn first_match(&self, email: &str) -> Option<&str> {
        let email = email.trim();
        if email.is_empty() {
            return None;
        }
        let email_lower = email.to_lowercase();

        if let Some((_, source)) = self
            .literals
            .iter()
            .find(|(needle, _)| email_lower.contains(needle.as_str()))
        {
            return Some(source);
        }

        self.wildcards
            .iter()
            .find(|(pattern, _)| pattern.is_match_prepared(email, &email_lower))
            .map(|(_, source)| source.as_str())
    }

    /// Number of usable patterns
    pub fn len(&self) -> usize {
        self.literals.len() + self.wildcards.len()
    }

    /// Check if the list has no usable pattern
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.wildcards.is_empty()
    }

    /// Number of wildcard patterns
    pub fn wildcard_count(&self) -> usize {
        self.wildcards.len()
    }

    /// Number of entries skipped during compilation
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
