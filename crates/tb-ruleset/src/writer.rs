use tb_core::Ruleset;

use crate::document::RulesetDocument;
use crate::parser::RulesetError;

/// Serialize a ruleset as a pretty-printed JSON document with sorted keys.
pub fn to_json(ruleset: &Ruleset) -> Result<String, RulesetError> {
    let doc = RulesetDocument::from(ruleset);
    Ok(serde_json::to_string_pretty(&doc)?)
}
