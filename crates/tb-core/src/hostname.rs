//! Hostname decomposition
//!
//! Rules are keyed either by a hostname suffix (`games.sacbee.com`,
//! `sacbee.com`, `com`) or by an entity, a run of labels that is looked up
//! regardless of the top-level domain that follows it (`ouo` matches
//! `ouo.io` and `ouo.press`).
//!
//! # Examples
//!
//! ```
//! use tb_core::hostname::{walk_host_suffixes, entity_windows, split_labels, EntityScope};
//!
//! let suffixes: Vec<&str> = walk_host_suffixes("games.sacbee.com").collect();
//! assert_eq!(suffixes, ["games.sacbee.com", "sacbee.com", "com"]);
//!
//! let labels = split_labels("a.b.c");
//! assert_eq!(entity_windows(&labels, EntityScope::Labels), ["a.b", "a", "b.c", "b"]);
//! ```

use std::borrow::Cow;

/// Which label ranges take part in entity matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityScope {
    /// Every contiguous label range except the full hostname and the last
    /// label alone. Windows ending in the last label (`b.com` for
    /// `a.b.com`) are scanned.
    #[default]
    Labels,
    /// The last label never takes part in any window. This is the range
    /// generated `adjust-setInterval` scriptlets scan.
    ExcludeLastLabel,
}

/// Normalize a hostname for table lookups.
///
/// Trims surrounding whitespace, strips a single trailing dot (FQDN form)
/// and lowercases ASCII. Borrows when nothing needs to change.
pub fn normalize_hostname(host: &str) -> Cow<'_, str> {
    let host = host.trim();
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    }
}

/// Split a hostname into its labels. An empty hostname has no labels.
pub fn split_labels(host: &str) -> Vec<&str> {
    if host.is_empty() {
        return Vec::new();
    }
    host.split('.').collect()
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    host.split_once('.').map(|(_, parent)| parent)
}

/// Iterator for suffix-walking a host from the full hostname down to its
/// last label.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> HostSuffixIter<'a> {
    pub fn new(host: &'a str) -> Self {
        Self {
            current: if host.is_empty() { None } else { Some(host) },
        }
    }
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter::new(host)
}

/// Build the entity candidates for a label sequence.
///
/// Order is deterministic: start label ascending, then window length
/// descending.
pub fn entity_windows(labels: &[&str], scope: EntityScope) -> Vec<String> {
    let n = labels.len();
    let mut windows = Vec::new();

    match scope {
        EntityScope::Labels => {
            for i in 0..n.saturating_sub(1) {
                for j in (i + 1..=n).rev() {
                    // Full hostname is a suffix, not an entity
                    if i == 0 && j == n {
                        continue;
                    }
                    windows.push(labels[i..j].join("."));
                }
            }
        }
        EntityScope::ExcludeLastLabel => {
            let end = n.saturating_sub(1);
            for i in 0..end {
                for j in (i + 1..=end).rev() {
                    windows.push(labels[i..j].join("."));
                }
            }
        }
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("Games.SacBee.com"), "games.sacbee.com");
        assert_eq!(normalize_hostname("example.com."), "example.com");
        assert_eq!(normalize_hostname("  example.com "), "example.com");
        assert!(matches!(normalize_hostname("example.com"), Cow::Borrowed(_)));
        assert_eq!(normalize_hostname(""), "");
    }

    #[test]
    fn test_split_labels() {
        assert_eq!(split_labels("a.b.c"), ["a", "b", "c"]);
        assert_eq!(split_labels("localhost"), ["localhost"]);
        assert!(split_labels("").is_empty());
    }

    #[test]
    fn test_get_parent_domain() {
        assert_eq!(get_parent_domain("sub.example.com"), Some("example.com"));
        assert_eq!(get_parent_domain("example.com"), Some("com"));
        assert_eq!(get_parent_domain("com"), None);
        assert_eq!(get_parent_domain(""), None);
    }

    #[test]
    fn test_walk_host_suffixes() {
        let suffixes: Vec<&str> = walk_host_suffixes("go.skiplink.me").collect();
        assert_eq!(suffixes, ["go.skiplink.me", "skiplink.me", "me"]);

        let single: Vec<&str> = walk_host_suffixes("localhost").collect();
        assert_eq!(single, ["localhost"]);

        assert_eq!(walk_host_suffixes("").count(), 0);
    }

    #[test]
    fn test_entity_windows_labels_scope() {
        let labels = split_labels("sub.ouo.io");
        assert_eq!(
            entity_windows(&labels, EntityScope::Labels),
            ["sub.ouo", "sub", "ouo.io", "ouo"]
        );
    }

    #[test]
    fn test_entity_windows_exclude_last_label() {
        let labels = split_labels("a.b.com");
        assert_eq!(
            entity_windows(&labels, EntityScope::ExcludeLastLabel),
            ["a.b", "a", "b"]
        );
    }

    #[test]
    fn test_entity_windows_short_hosts() {
        assert!(entity_windows(&[], EntityScope::Labels).is_empty());
        assert!(entity_windows(&["com"], EntityScope::Labels).is_empty());
        assert!(entity_windows(&["com"], EntityScope::ExcludeLastLabel).is_empty());
        assert_eq!(entity_windows(&["ouo", "io"], EntityScope::Labels), ["ouo"]);
        assert_eq!(entity_windows(&["ouo", "io"], EntityScope::ExcludeLastLabel), ["ouo"]);
    }
}
