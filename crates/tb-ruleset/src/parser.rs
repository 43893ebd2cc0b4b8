use serde_json::Value;

use tb_core::{ArgumentSet, RuleTable, Ruleset};

use crate::document::{IndexSpec, RulesetDocument, TableKind, SCRIPTLET_ALIASES};

/// Positional arguments the scriptlet accepts.
const MAX_ARGS: usize = 3;

/// Error type for ruleset loading.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported scriptlet: {0}")]
    UnsupportedScriptlet(String),
    #[error("Invalid argument set {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },
    #[error("Duplicate key {key:?} in {table} table")]
    DuplicateKey { table: TableKind, key: String },
    #[error("Missing `{0}` in scriptlet source")]
    MissingTable(&'static str),
}

/// Parse either format, picking by the first non-blank character.
pub fn parse_ruleset(text: &str) -> Result<Ruleset, RulesetError> {
    if text.trim_start().starts_with('{') {
        parse_ruleset_json(text)
    } else {
        parse_scriptlet_source(text)
    }
}

/// Parse a JSON ruleset document.
pub fn parse_ruleset_json(text: &str) -> Result<Ruleset, RulesetError> {
    let doc: RulesetDocument = serde_json::from_str(text)?;
    build_ruleset(doc)
}

/// Import the tables baked into a generated `adjust-setInterval` scriptlet.
///
/// Each table is a single `const` line:
///
/// ```text
/// const argsList = [[],["generalTimeLeft","*","0.02"]];
/// const hostnamesMap = new Map([["games.sacbee.com",1]]);
/// const entitiesMap = new Map([["ouo",0]]);
/// const exceptionsMap = new Map([]);
/// ```
///
/// The ruleset name comes from the `// ruleset: <name>` marker. Only
/// `argsList` is required.
pub fn parse_scriptlet_source(source: &str) -> Result<Ruleset, RulesetError> {
    let args_literal =
        extract_const(source, "argsList").ok_or(RulesetError::MissingTable("argsList"))?;
    let args: Vec<Vec<Value>> = serde_json::from_str(args_literal)?;

    let table = |binding: &str| -> Result<Vec<(String, IndexSpec)>, RulesetError> {
        match extract_const(source, binding) {
            Some(literal) => Ok(serde_json::from_str(literal)?),
            None => Ok(Vec::new()),
        }
    };

    let doc = RulesetDocument {
        name: ruleset_name(source).unwrap_or_default().to_string(),
        scriptlet: crate::document::SCRIPTLET_NAME.to_string(),
        args,
        hostnames: table("hostnamesMap")?,
        entities: table("entitiesMap")?,
        exceptions: table("exceptionsMap")?,
    };

    build_ruleset(doc)
}

fn build_ruleset(doc: RulesetDocument) -> Result<Ruleset, RulesetError> {
    if !SCRIPTLET_ALIASES.contains(&doc.scriptlet.as_str()) {
        return Err(RulesetError::UnsupportedScriptlet(doc.scriptlet));
    }

    let mut ruleset = Ruleset::new(doc.name);

    for (index, raw) in doc.args.iter().enumerate() {
        ruleset.args.push(parse_argument_set(index, raw)?);
    }

    ruleset.tables.hostnames = build_table(TableKind::Hostnames, doc.hostnames)?;
    ruleset.tables.entities = build_table(TableKind::Entities, doc.entities)?;
    ruleset.tables.exceptions = build_table(TableKind::Exceptions, doc.exceptions)?;

    log::debug!(
        "loaded ruleset {:?}: {} argument sets, {} hostnames, {} entities, {} exceptions",
        ruleset.name,
        ruleset.args.len(),
        ruleset.tables.hostnames.len(),
        ruleset.tables.entities.len(),
        ruleset.tables.exceptions.len()
    );

    Ok(ruleset)
}

fn parse_argument_set(index: usize, raw: &[Value]) -> Result<ArgumentSet, RulesetError> {
    if raw.len() > MAX_ARGS {
        return Err(RulesetError::InvalidArgument {
            index,
            reason: format!("expected at most {MAX_ARGS} arguments, got {}", raw.len()),
        });
    }

    let mut args = Vec::with_capacity(raw.len());
    for value in raw {
        let arg = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(RulesetError::InvalidArgument {
                    index,
                    reason: format!("arguments must be strings or numbers, got {other}"),
                })
            }
        };
        args.push(arg);
    }

    Ok(ArgumentSet::from_positional(&args))
}

fn build_table(
    kind: TableKind,
    pairs: Vec<(String, IndexSpec)>,
) -> Result<RuleTable, RulesetError> {
    let mut table = RuleTable::new();
    for (key, spec) in pairs {
        if table.get(&key).is_some() {
            return Err(RulesetError::DuplicateKey { table: kind, key });
        }
        table.insert(key, spec);
    }
    Ok(table)
}

/// Find `const <binding> = <literal>;` and return the literal, unwrapping
/// `new Map(...)`.
fn extract_const<'a>(source: &'a str, binding: &str) -> Option<&'a str> {
    let prefix = format!("const {binding} = ");
    source.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(prefix.as_str())?;
        let rest = rest.strip_suffix(';').unwrap_or(rest);
        Some(
            rest.strip_prefix("new Map(")
                .and_then(|inner| inner.strip_suffix(')'))
                .unwrap_or(rest),
        )
    })
}

fn ruleset_name(source: &str) -> Option<&str> {
    source
        .lines()
        .find_map(|line| line.trim().strip_prefix("// ruleset:"))
        .map(str::trim)
}
