//! Domain pattern matching
//!
//! Patterns come straight from the remote provider and may contain `*`
//! wildcards. The filter supports:
//! - Literal patterns, matched as case-insensitive substrings
//! - Wildcard patterns, where `*` matches any run of characters
//! - Fail-safe compilation: bad entries are skipped, never fatal

mod list;
mod pattern;

pub use list::PatternList;
pub use pattern::{matches, wildcard_to_regex, CompiledPattern, WILDCARD};
