//! Transient key definitions.
//!
//! Every cached filter result lives under `<prefix>_<term_id>`.

use std::fmt;

use crate::config::DEFAULT_CACHE_KEY_PREFIX;
use crate::domain::types::TermId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransientKey(String);

impl TransientKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds term keys under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn term(&self, term: TermId) -> TransientKey {
        TransientKey(format!("{}_{}", self.prefix, term))
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keyspace_matches_host_transient_names() {
        let key = Keyspace::default().term(TermId(5));
        assert_eq!(key.as_str(), "wc_layered_nav_query_post_ids_5");
        assert_eq!(key.to_string(), "wc_layered_nav_query_post_ids_5");
    }

    #[test]
    fn custom_prefix_is_kept_verbatim() {
        let keyspace = Keyspace::new("nav");
        assert_eq!(keyspace.prefix(), "nav");
        assert_eq!(keyspace.term(TermId(42)).as_str(), "nav_42");
    }

    #[test]
    fn distinct_terms_get_distinct_keys() {
        let keyspace = Keyspace::default();
        assert_ne!(keyspace.term(TermId(1)), keyspace.term(TermId(11)));
    }
}
