use std::collections::{BTreeSet, HashSet};
use std::fmt;

use tb_core::{ArgIndices, RuleTable, Ruleset};

use crate::document::TableKind;

/// Counters from an optimization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub keys_before: usize,
    pub keys_after: usize,
    pub deduped_indices: usize,
    pub dropped_keys: usize,
}

/// A problem found in a loaded ruleset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesetIssue {
    /// Points past the end of the argument list; installing it would fail
    IndexOutOfRange { table: TableKind, key: String, index: usize },
    EmptyKey { table: TableKind },
    EmptyIndices { table: TableKind, key: String },
    /// Argument set no table refers to
    UnusedArgumentSet { index: usize },
    /// Exception for an index no hostname or entity rule proposes
    UnmatchedException { key: String, index: usize },
}

impl RulesetIssue {
    /// Issues that change what gets applied, as opposed to dead data.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }
}

impl fmt::Display for RulesetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { table, key, index } => {
                write!(f, "{table} key {key:?} refers to missing argument set {index}")
            }
            Self::EmptyKey { table } => write!(f, "{table} table has an empty key"),
            Self::EmptyIndices { table, key } => write!(f, "{table} key {key:?} has no indices"),
            Self::UnusedArgumentSet { index } => {
                write!(f, "argument set {index} is never referenced")
            }
            Self::UnmatchedException { key, index } => {
                write!(f, "exception {key:?} vetoes index {index}, which no rule proposes")
            }
        }
    }
}

/// Check a ruleset for dangling references and dead entries.
///
/// Issues are reported in a stable order: per table, by key.
pub fn validate_ruleset(ruleset: &Ruleset) -> Vec<RulesetIssue> {
    let mut issues = Vec::new();
    let arg_count = ruleset.args.len();
    let tables = [
        (TableKind::Hostnames, &ruleset.tables.hostnames),
        (TableKind::Entities, &ruleset.tables.entities),
        (TableKind::Exceptions, &ruleset.tables.exceptions),
    ];

    for (kind, table) in tables {
        for key in table.sorted_keys() {
            let Some(indices) = table.get(key) else { continue };
            if key.is_empty() {
                issues.push(RulesetIssue::EmptyKey { table: kind });
            }
            if indices.is_empty() {
                issues.push(RulesetIssue::EmptyIndices {
                    table: kind,
                    key: key.to_string(),
                });
            }
            for index in indices.iter() {
                if index >= arg_count {
                    issues.push(RulesetIssue::IndexOutOfRange {
                        table: kind,
                        key: key.to_string(),
                        index,
                    });
                }
            }
        }
    }

    let proposed: BTreeSet<usize> = [&ruleset.tables.hostnames, &ruleset.tables.entities]
        .into_iter()
        .flat_map(|table| table.iter().flat_map(|(_, indices)| indices.iter()))
        .collect();

    let exceptions = &ruleset.tables.exceptions;
    for key in exceptions.sorted_keys() {
        let Some(indices) = exceptions.get(key) else { continue };
        for index in indices.iter() {
            if !proposed.contains(&index) {
                issues.push(RulesetIssue::UnmatchedException {
                    key: key.to_string(),
                    index,
                });
            }
        }
    }

    for index in 0..arg_count {
        if !proposed.contains(&index) {
            issues.push(RulesetIssue::UnusedArgumentSet { index });
        }
    }

    issues
}

/// Remove duplicate indices per key and drop keys left with none.
pub fn optimize_ruleset(ruleset: &mut Ruleset) -> OptimizeStats {
    let mut stats = OptimizeStats::default();

    let tables = &mut ruleset.tables;
    for table in [&mut tables.hostnames, &mut tables.entities, &mut tables.exceptions] {
        stats.keys_before += table.len();
        optimize_table(table, &mut stats);
        stats.keys_after += table.len();
    }

    stats
}

fn optimize_table(table: &mut RuleTable, stats: &mut OptimizeStats) {
    table.retain(|_, indices| {
        if let ArgIndices::Many(list) = indices {
            let before = list.len();
            let mut seen = HashSet::new();
            list.retain(|index| seen.insert(*index));
            stats.deduped_indices += before - list.len();
            let deduped = std::mem::replace(indices, ArgIndices::Many(Vec::new()));
            *indices = deduped.compact();
        }
        if indices.is_empty() {
            stats.dropped_keys += 1;
            return false;
        }
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::ArgumentSet;

    fn ruleset() -> Ruleset {
        let mut ruleset = Ruleset::new("test");
        ruleset.args = vec![
            ArgumentSet::default(),
            ArgumentSet::new("timer", "*", ""),
            ArgumentSet::default(),
        ];
        ruleset.tables.hostnames.insert("a.com", vec![0, 0, 1]);
        ruleset.tables.hostnames.insert("b.com", vec![1]);
        ruleset.tables.hostnames.insert("c.com", Vec::<usize>::new());
        ruleset.tables.entities.insert("ouo", 7);
        ruleset.tables.exceptions.insert("go.a.com", 0);
        ruleset.tables.exceptions.insert("go.b.com", 2);
        ruleset
    }

    #[test]
    fn test_validate_ruleset() {
        let issues = validate_ruleset(&ruleset());
        assert_eq!(
            issues,
            vec![
                RulesetIssue::EmptyIndices {
                    table: TableKind::Hostnames,
                    key: "c.com".to_string(),
                },
                RulesetIssue::IndexOutOfRange {
                    table: TableKind::Entities,
                    key: "ouo".to_string(),
                    index: 7,
                },
                RulesetIssue::UnmatchedException {
                    key: "go.b.com".to_string(),
                    index: 2,
                },
                RulesetIssue::UnusedArgumentSet { index: 2 },
            ]
        );
        assert_eq!(issues.iter().filter(|i| i.is_error()).count(), 1);
    }

    #[test]
    fn test_optimize_ruleset() {
        let mut ruleset = ruleset();
        let stats = optimize_ruleset(&mut ruleset);

        assert_eq!(stats.keys_before, 6);
        assert_eq!(stats.keys_after, 5);
        assert_eq!(stats.deduped_indices, 1);
        assert_eq!(stats.dropped_keys, 1);

        let hostnames = &ruleset.tables.hostnames;
        assert_eq!(hostnames.get("a.com"), Some(&ArgIndices::Many(vec![0, 1])));
        assert_eq!(hostnames.get("b.com"), Some(&ArgIndices::One(1)));
        assert_eq!(hostnames.get("c.com"), None);
    }

    #[test]
    fn test_issue_display() {
        let issue = RulesetIssue::IndexOutOfRange {
            table: TableKind::Hostnames,
            key: "mage.si".to_string(),
            index: 200,
        };
        assert_eq!(
            issue.to_string(),
            "hostnames key \"mage.si\" refers to missing argument set 200"
        );
    }
}
