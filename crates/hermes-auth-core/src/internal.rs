//! Internal service key registry
//!
//! `INTERNAL_API_KEYS` is a comma-separated list. An entry of the form
//! `source:secret` scopes the bearer to users whose `source_service`
//! matches `source`; a bare entry is an unscoped legacy key.

use crate::crypto::constant_time_str_eq;

/// Resolved scope of an internal caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalScope {
    /// Legacy key: may operate on every source
    Global,
    /// Scoped key: may only operate on users of this source service
    Source(String),
}

impl InternalScope {
    /// Whether this scope may act on users of `source`
    pub fn allows_source(&self, source: &str) -> bool {
        match self {
            Self::Global => true,
            Self::Source(own) => own == source,
        }
    }

    /// The source filter this scope imposes on listings, if any
    pub fn source_filter(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Source(source) => Some(source.as_str()),
        }
    }
}

/// Parsed view of the configured internal keys
#[derive(Debug, Clone, Default)]
pub struct InternalKeyRegistry {
    entries: Vec<(Option<String>, String)>,
}

impl InternalKeyRegistry {
    /// Parse the comma-separated `INTERNAL_API_KEYS` value. Empty segments
    /// are skipped.
    pub fn from_config(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once(':') {
                Some((source, secret)) => {
                    (Some(source.trim().to_string()), secret.trim().to_string())
                }
                None => (None, entry.to_string()),
            })
            .collect();

        Self { entries }
    }

    /// Number of configured keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match a presented key against the registry.
    ///
    /// Every entry is compared in constant time; iteration does not stop
    /// at the first match so timing does not reveal entry order.
    pub fn resolve(&self, provided: &str) -> Option<InternalScope> {
        let mut matched: Option<InternalScope> = None;

        for (source, secret) in &self.entries {
            if constant_time_str_eq(secret, provided) && matched.is_none() {
                matched = Some(match source {
                    Some(source) => InternalScope::Source(source.clone()),
                    None => InternalScope::Global,
                });
            }
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_entries() {
        let registry = InternalKeyRegistry::from_config("billing:s3cret, legacy-key ,crm:other");
        assert_eq!(registry.len(), 3);

        assert_eq!(
            registry.resolve("s3cret"),
            Some(InternalScope::Source("billing".into()))
        );
        assert_eq!(registry.resolve("legacy-key"), Some(InternalScope::Global));
        assert_eq!(
            registry.resolve("other"),
            Some(InternalScope::Source("crm".into()))
        );
        assert_eq!(registry.resolve("nope"), None);
    }

    #[test]
    fn test_empty_config() {
        let registry = InternalKeyRegistry::from_config("");
        assert!(registry.is_empty());
        assert_eq!(registry.resolve("anything"), None);
    }

    #[test]
    fn test_scope_allows_source() {
        assert!(InternalScope::Global.allows_source("billing"));
        assert!(InternalScope::Source("billing".into()).allows_source("billing"));
        assert!(!InternalScope::Source("billing".into()).allows_source("crm"));
    }

    #[test]
    fn test_scope_source_filter() {
        assert_eq!(InternalScope::Global.source_filter(), None);
        assert_eq!(
            InternalScope::Source("crm".into()).source_filter(),
            Some("crm")
        );
    }

    #[test]
    fn test_colon_in_secret_splits_once() {
        let registry = InternalKeyRegistry::from_config("svc:sec:ret");
        assert_eq!(
            registry.resolve("sec:ret"),
            Some(InternalScope::Source("svc".into()))
        );
    }
}
