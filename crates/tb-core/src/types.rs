//! Core type definitions for TickBoost
//!
//! These types mirror the tables a generated `adjust-setInterval` scriptlet
//! carries: an argument list plus hostname, entity and exception maps whose
//! values point into that list.

use std::collections::HashMap;

/// Hostname table key that applies to every page.
pub const WILDCARD_KEY: &str = "*";

// =============================================================================
// Argument Indices
// =============================================================================

/// Argument-set indices associated with one table key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgIndices {
    One(usize),
    Many(Vec<usize>),
}

impl ArgIndices {
    /// Iterate over the indices in table order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let slice: &[usize] = match self {
            Self::One(index) => std::slice::from_ref(index),
            Self::Many(indices) => indices,
        };
        slice.iter().copied()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.iter().any(|i| i == index)
    }

    /// Collapse single-element lists back to `One`.
    pub fn compact(self) -> Self {
        match self {
            Self::Many(indices) if indices.len() == 1 => Self::One(indices[0]),
            other => other,
        }
    }
}

impl From<usize> for ArgIndices {
    fn from(index: usize) -> Self {
        Self::One(index)
    }
}

impl From<Vec<usize>> for ArgIndices {
    fn from(indices: Vec<usize>) -> Self {
        Self::Many(indices)
    }
}

// =============================================================================
// Rule Tables
// =============================================================================

/// Mapping from a lookup key to argument-set indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: HashMap<String, ArgIndices>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the indices it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        indices: impl Into<ArgIndices>,
    ) -> Option<ArgIndices> {
        self.entries.insert(key.into(), indices.into())
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&ArgIndices> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgIndices> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgIndices)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ArgIndices)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut ArgIndices) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    /// Keys in sorted order, for stable output.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<K: Into<String>, V: Into<ArgIndices>> FromIterator<(K, V)> for RuleTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, indices) in iter {
            table.insert(key, indices);
        }
        table
    }
}

/// The three lookup tables of a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTables {
    /// Exact hostname-suffix keys, plus the `*` wildcard
    pub hostnames: RuleTable,
    /// Entity keys (label runs without their TLD)
    pub entities: RuleTable,
    /// Hostname-suffix keys whose indices are vetoed
    pub exceptions: RuleTable,
}

impl RuleTables {
    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty() && self.entities.is_empty() && self.exceptions.is_empty()
    }
}

// =============================================================================
// Argument Sets
// =============================================================================

/// Raw scriptlet arguments: `(needle, delay, boost)`.
///
/// Positions the rule author omitted are empty strings, which is what the
/// normalizers treat as "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSet {
    pub needle: String,
    pub delay: String,
    pub boost: String,
}

impl ArgumentSet {
    pub fn new(
        needle: impl Into<String>,
        delay: impl Into<String>,
        boost: impl Into<String>,
    ) -> Self {
        Self {
            needle: needle.into(),
            delay: delay.into(),
            boost: boost.into(),
        }
    }

    /// Build from positional arguments; missing trailing values are empty.
    pub fn from_positional<S: AsRef<str>>(args: &[S]) -> Self {
        let at = |i: usize| args.get(i).map(|s| s.as_ref().to_string()).unwrap_or_default();
        Self {
            needle: at(0),
            delay: at(1),
            boost: at(2),
        }
    }

    /// Positional form with trailing empty values dropped.
    pub fn to_positional(&self) -> Vec<&str> {
        let mut args = vec![self.needle.as_str(), self.delay.as_str(), self.boost.as_str()];
        while args.last().is_some_and(|s| s.is_empty()) {
            args.pop();
        }
        args
    }
}

// =============================================================================
// Ruleset
// =============================================================================

/// A complete ruleset for one scriptlet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    pub name: String,
    pub args: Vec<ArgumentSet>,
    pub tables: RuleTables,
}

impl Ruleset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn argument_set(&self, index: usize) -> Option<&ArgumentSet> {
        self.args.get(index)
    }
}
