//! Rule Resolution Engine
//!
//! Resolution runs once per page: exceptions are collected first, then the
//! hostname and entity tables contribute candidates. An excepted index is
//! skipped at the moment it is proposed, so no table can reintroduce it.

use std::collections::BTreeSet;

use crate::hostname::{
    entity_windows, normalize_hostname, split_labels, walk_host_suffixes, EntityScope,
};
use crate::types::{RuleTable, RuleTables, WILDCARD_KEY};

/// Which table contributed a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchSource {
    /// Exact hostname-suffix key
    Hostname,
    /// The `*` key of the hostname table
    Wildcard,
    /// Entity key
    Entity,
}

/// One accepted (key, index) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub source: MatchSource,
    pub key: String,
    pub index: usize,
}

/// Result of resolving a hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Argument-set indices to apply
    pub indices: BTreeSet<usize>,
    /// Indices vetoed by the exception table
    pub excluded: BTreeSet<usize>,
    /// Accepted matches in discovery order (an index may appear once per source key)
    pub matches: Vec<RuleMatch>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    fn accept(&mut self, source: MatchSource, key: &str, table: &RuleTable) {
        let Some(indices) = table.get(key) else {
            return;
        };
        for index in indices.iter() {
            if self.excluded.contains(&index) {
                continue;
            }
            self.indices.insert(index);
            self.matches.push(RuleMatch {
                source,
                key: key.to_string(),
                index,
            });
        }
    }
}

/// Resolves hostnames against a set of rule tables.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    tables: &'a RuleTables,
    entity_scope: EntityScope,
}

impl<'a> Resolver<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self {
            tables,
            entity_scope: EntityScope::default(),
        }
    }

    pub fn with_entity_scope(mut self, scope: EntityScope) -> Self {
        self.entity_scope = scope;
        self
    }

    /// Resolve the argument-set indices that apply to `hostname`.
    pub fn resolve(&self, hostname: &str) -> Resolution {
        let mut resolution = Resolution::default();

        let host = normalize_hostname(hostname);
        if host.is_empty() || self.tables.is_empty() {
            return resolution;
        }

        self.collect_exceptions(&host, &mut resolution);
        self.collect_hostname_rules(&host, &mut resolution);
        self.collect_entity_rules(&host, &mut resolution);

        log::debug!(
            "resolved {host}: {} indices, {} excluded",
            resolution.indices.len(),
            resolution.excluded.len()
        );

        resolution
    }

    /// Gather vetoed indices from every suffix of the hostname.
    fn collect_exceptions(&self, host: &str, resolution: &mut Resolution) {
        let exceptions = &self.tables.exceptions;
        if exceptions.is_empty() {
            return;
        }
        for suffix in walk_host_suffixes(host) {
            if let Some(indices) = exceptions.get(suffix) {
                resolution.excluded.extend(indices.iter());
            }
        }
    }

    /// Match every suffix, then the wildcard key.
    fn collect_hostname_rules(&self, host: &str, resolution: &mut Resolution) {
        let hostnames = &self.tables.hostnames;
        if hostnames.is_empty() {
            return;
        }
        for suffix in walk_host_suffixes(host) {
            resolution.accept(MatchSource::Hostname, suffix, hostnames);
        }
        resolution.accept(MatchSource::Wildcard, WILDCARD_KEY, hostnames);
    }

    /// Match every entity window of the hostname.
    fn collect_entity_rules(&self, host: &str, resolution: &mut Resolution) {
        let entities = &self.tables.entities;
        if entities.is_empty() {
            return;
        }
        let labels = split_labels(host);
        for entity in entity_windows(&labels, self.entity_scope) {
            resolution.accept(MatchSource::Entity, &entity, entities);
        }
    }
}

/// Resolve with the default entity scope.
pub fn resolve(tables: &RuleTables, hostname: &str) -> Resolution {
    Resolver::new(tables).resolve(hostname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArgIndices;

    fn tables() -> RuleTables {
        let mut tables = RuleTables::default();
        tables.hostnames.insert("games.sacbee.com", 2);
        tables.hostnames.insert("skiplink.me", 0);
        tables.hostnames.insert("link-to.net", vec![0, 21, 22, 23]);
        tables.entities.insert("ouo", 3);
        tables.exceptions.insert("go.skiplink.me", vec![0]);
        tables
    }

    #[test]
    fn test_exact_hostname() {
        let tables = tables();
        let resolution = resolve(&tables, "games.sacbee.com");
        assert_eq!(resolution.indices, BTreeSet::from([2]));
        assert_eq!(
            resolution.matches,
            [RuleMatch {
                source: MatchSource::Hostname,
                key: "games.sacbee.com".to_string(),
                index: 2,
            }]
        );
    }

    #[test]
    fn test_suffix_match() {
        let tables = tables();
        let resolution = resolve(&tables, "www.skiplink.me");
        assert_eq!(resolution.indices, BTreeSet::from([0]));
    }

    #[test]
    fn test_exception_vetoes_suffix_match() {
        let tables = tables();
        let resolution = resolve(&tables, "go.skiplink.me");
        assert!(resolution.is_empty());
        assert_eq!(resolution.excluded, BTreeSet::from([0]));
    }

    #[test]
    fn test_multiple_indices() {
        let tables = tables();
        let resolution = resolve(&tables, "link-to.net");
        assert_eq!(resolution.indices, BTreeSet::from([0, 21, 22, 23]));
    }

    #[test]
    fn test_entity_match() {
        let tables = tables();
        assert!(resolve(&tables, "ouo.io").contains(3));
        assert!(resolve(&tables, "sub.ouo.press").contains(3));
        assert!(!resolve(&tables, "ouox.io").contains(3));
        assert_eq!(resolve(&tables, "ouo.io").matches[0].source, MatchSource::Entity);
    }

    #[test]
    fn test_wildcard() {
        let mut tables = tables();
        tables.hostnames.insert(WILDCARD_KEY, 7);
        assert!(resolve(&tables, "unrelated.org").contains(7));
        assert!(resolve(&tables, "localhost").contains(7));
        assert!(!resolve(&tables, "").contains(7));

        tables.exceptions.insert("unrelated.org", 7);
        assert!(!resolve(&tables, "unrelated.org").contains(7));
    }

    #[test]
    fn test_hostname_is_normalized() {
        let tables = tables();
        assert_eq!(resolve(&tables, "Games.SacBee.com.").indices, BTreeSet::from([2]));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(resolve(&RuleTables::default(), "games.sacbee.com").is_empty());
        assert!(resolve(&tables(), "").is_empty());
        assert!(resolve(&tables(), "   ").is_empty());
    }

    #[test]
    fn test_entity_scope() {
        let mut tables = RuleTables::default();
        tables.entities.insert("b.com", ArgIndices::One(5));

        assert!(Resolver::new(&tables).resolve("a.b.com").contains(5));
        assert!(!Resolver::new(&tables)
            .with_entity_scope(EntityScope::ExcludeLastLabel)
            .resolve("a.b.com")
            .contains(5));
    }

    #[test]
    fn test_resolver_is_reusable() {
        let tables = tables();
        let resolver = Resolver::new(&tables);
        let first = resolver.resolve("go.skiplink.me");
        let second = resolver.resolve("go.skiplink.me");
        assert_eq!(first, second);
        assert_eq!(resolver.resolve("skiplink.me").indices, BTreeSet::from([0]));
    }
}
