//! JSON ruleset document
//!
//! Tables are stored as `[key, indices]` pairs, the same shape as the
//! `new Map([...])` literals in generated scriptlets:
//!
//! ```json
//! {
//!   "name": "default",
//!   "scriptlet": "adjust-setInterval",
//!   "args": [[], ["generalTimeLeft", "*", "0.02"]],
//!   "hostnames": [["games.sacbee.com", 1], ["link-to.net", [0, 1]]],
//!   "entities": [["ouo", 0]],
//!   "exceptions": [["go.skiplink.me", [0]]]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tb_core::{ArgIndices, RuleTable, Ruleset};

/// Scriptlet name written to new documents.
pub const SCRIPTLET_NAME: &str = "adjust-setInterval";

/// Names this scriptlet is known by in filter lists.
pub const SCRIPTLET_ALIASES: &[&str] = &[
    "adjust-setInterval",
    "adjust-setInterval.js",
    "nano-setInterval-booster",
    "nano-setInterval-booster.js",
    "nano-sib",
    "nano-sib.js",
];

/// Which table a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Hostnames,
    Entities,
    Exceptions,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hostnames => "hostnames",
            Self::Entities => "entities",
            Self::Exceptions => "exceptions",
        })
    }
}

/// One index or a list of indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexSpec {
    One(usize),
    Many(Vec<usize>),
}

impl From<IndexSpec> for ArgIndices {
    fn from(spec: IndexSpec) -> Self {
        match spec {
            IndexSpec::One(index) => ArgIndices::One(index),
            IndexSpec::Many(indices) => ArgIndices::Many(indices),
        }
    }
}

impl From<&ArgIndices> for IndexSpec {
    fn from(indices: &ArgIndices) -> Self {
        match indices {
            ArgIndices::One(index) => IndexSpec::One(*index),
            ArgIndices::Many(list) => IndexSpec::Many(list.clone()),
        }
    }
}

fn default_scriptlet() -> String {
    SCRIPTLET_NAME.to_string()
}

/// Serialized form of a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesetDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_scriptlet")]
    pub scriptlet: String,
    /// Positional scriptlet arguments; strings or numbers
    #[serde(default)]
    pub args: Vec<Vec<Value>>,
    #[serde(default)]
    pub hostnames: Vec<(String, IndexSpec)>,
    #[serde(default)]
    pub entities: Vec<(String, IndexSpec)>,
    #[serde(default)]
    pub exceptions: Vec<(String, IndexSpec)>,
}

impl From<&Ruleset> for RulesetDocument {
    fn from(ruleset: &Ruleset) -> Self {
        let args = ruleset
            .args
            .iter()
            .map(|set| {
                set.to_positional()
                    .into_iter()
                    .map(|arg| Value::String(arg.to_string()))
                    .collect()
            })
            .collect();

        Self {
            name: ruleset.name.clone(),
            scriptlet: default_scriptlet(),
            args,
            hostnames: table_pairs(&ruleset.tables.hostnames),
            entities: table_pairs(&ruleset.tables.entities),
            exceptions: table_pairs(&ruleset.tables.exceptions),
        }
    }
}

/// Table entries as pairs, sorted by key for stable output.
fn table_pairs(table: &RuleTable) -> Vec<(String, IndexSpec)> {
    table
        .sorted_keys()
        .into_iter()
        .filter_map(|key| table.get(key).map(|indices| (key.to_string(), IndexSpec::from(indices))))
        .collect()
}
