//! Field-name filter with literal and prefix-wildcard entries.

use std::collections::HashSet;

/// Set-membership filter over field names.
///
/// Entries are either literal names or prefix wildcards ending in `*`
/// (`kubernetes.*` matches every field under that prefix; a bare `*`
/// matches everything). An empty filter matches nothing.
///
/// Literal lookups are expected O(1); wildcard lookups scan the wildcard
/// list, which stays short in practice.
#[derive(Debug, Default)]
pub struct FieldsFilter {
    literals: HashSet<String>,
    /// Wildcard prefixes, stored without the trailing `*`.
    wildcards: Vec<String>,
}

impl FieldsFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal name, or a `prefix*` wildcard.
    pub fn add(&mut self, pattern: &str) {
        match pattern.strip_suffix('*') {
            Some(prefix) => {
                if !self.wildcards.iter().any(|w| w == prefix) {
                    self.wildcards.push(prefix.to_string());
                }
            }
            None => {
                self.literals.insert(pattern.to_string());
            }
        }
    }

    /// Add every pattern in `patterns`.
    pub fn add_multi<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in patterns {
            self.add(p.as_ref());
        }
    }

    /// True if any literal equals `name` or any wildcard prefix is a prefix
    /// of `name`.
    pub fn matches(&self, name: &str) -> bool {
        if self.literals.contains(name) {
            return true;
        }
        self.wildcards.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Check whether the filter has no entries.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.wildcards.is_empty()
    }

    /// Clear both the literal and the wildcard sets.
    pub fn reset(&mut self) {
        self.literals.clear();
        self.wildcards.clear();
    }
}
