//! TickBoost Core Library
//!
//! This crate provides the rule resolution engine behind the
//! `adjust-setInterval` scriptlet: given a page hostname it decides which
//! argument sets apply, then turns each selected argument set into an
//! interval adjustment that rescales matching `setInterval` delays.
//!
//! # Architecture
//!
//! A ruleset is three lookup tables (hostname suffixes, entities and
//! exceptions) plus a flat list of argument sets. Resolution walks the
//! hostname once, collects exceptions first, then gathers candidates from
//! the hostname and entity tables while skipping excepted indices. The
//! tables are never mutated, so a single ruleset can serve any number of
//! resolutions.
//!
//! # Modules
//!
//! - `hostname`: Hostname normalization, suffix walking and entity windows
//! - `types`: Rule tables, argument sets and rulesets
//! - `resolver`: Exception/hostname/entity resolution
//! - `pattern`: Needle pattern parsing (literal or `/regex/flags`)
//! - `params`: Delay threshold and boost normalization
//! - `scriptlet`: Applying a resolution through an `Installer`

pub mod hostname;
pub mod params;
pub mod pattern;
pub mod resolver;
pub mod scriptlet;
pub mod types;

// Re-export commonly used types
pub use hostname::{entity_windows, normalize_hostname, walk_host_suffixes, EntityScope};
pub use params::{DelayThreshold, IntervalAdjustment};
pub use pattern::NeedlePattern;
pub use resolver::{MatchSource, Resolution, Resolver, RuleMatch};
pub use scriptlet::{
    apply_resolution, run_scriptlet, ApplyError, ApplyFailure, ApplyReport, Installer,
    IntervalRegistry,
};
pub use types::{ArgIndices, ArgumentSet, RuleTable, RuleTables, Ruleset, WILDCARD_KEY};
