//! OAuth2 scope set - space-separated permission names, lower-cased.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered-insensitive set of scope strings, normalized to lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    /// Parse the wire form: scopes separated by single spaces. An empty
    /// string yields the empty set.
    pub fn parse(s: &str) -> Self {
        Self(
            s.split_whitespace()
                .map(|scope| scope.to_lowercase())
                .collect(),
        )
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, scope: &str) -> bool {
        let scope = scope.to_lowercase();
        self.0.iter().any(|s| *s == scope)
    }

    /// True iff every scope in `other` is present in this set. The empty
    /// set is contained by everything.
    pub fn contains_all(&self, other: &ScopeSet) -> bool {
        other.0.iter().all(|s| self.contains(s))
    }

    /// Symmetric set equality: each side contains all of the other.
    pub fn matches(&self, other: &ScopeSet) -> bool {
        self.contains_all(other) && other.contains_all(self)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_and_splits() {
        let scopes = ScopeSet::parse("Email  USER");
        assert!(scopes.contains("email"));
        assert!(scopes.contains("user"));
        assert!(!scopes.contains("admin"));
        assert_eq!(scopes.to_string(), "email user");
    }

    #[test]
    fn parse_empty_yields_empty_set() {
        assert!(ScopeSet::parse("").is_empty());
        assert!(ScopeSet::parse("   ").is_empty());
    }

    #[test]
    fn contains_all_is_subset_check() {
        let allow = ScopeSet::parse("email user admin");
        assert!(allow.contains_all(&ScopeSet::parse("email user")));
        assert!(allow.contains_all(&ScopeSet::parse("")));
        assert!(!ScopeSet::parse("email").contains_all(&allow));
    }

    #[test]
    fn matches_is_symmetric_equality() {
        let a = ScopeSet::parse("email user");
        let b = ScopeSet::parse("user email");
        assert!(a.matches(&b));
        assert!(b.matches(&a));
        assert!(!a.matches(&ScopeSet::parse("email")));
        assert!(!ScopeSet::parse("email").matches(&a));
    }
}
