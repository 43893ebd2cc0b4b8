//! TickBoost Ruleset Loader
//!
//! This crate turns ruleset documents into `tb_core::Ruleset` values. Two
//! input formats are understood: a JSON document, and the literal tables of
//! a generated `adjust-setInterval` scriptlet.

pub mod document;
pub mod optimizer;
pub mod parser;
pub mod writer;

pub use document::{IndexSpec, RulesetDocument, TableKind};
pub use optimizer::{optimize_ruleset, validate_ruleset, OptimizeStats, RulesetIssue};
pub use parser::{parse_ruleset, parse_ruleset_json, parse_scriptlet_source, RulesetError};
pub use writer::to_json;
