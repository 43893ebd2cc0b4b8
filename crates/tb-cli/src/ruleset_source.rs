use std::fs;
use std::path::Path;

use tb_core::Ruleset;
use tb_ruleset::parse_ruleset;

/// Ruleset shipped with the CLI, built from the default generated scriptlet.
const DEFAULT_RULESET: &str = include_str!("../data/default.adjust-setInterval.json");

/// Load a ruleset from `path`, or the bundled default when absent.
///
/// JSON documents and generated `.js` scriptlets are both accepted.
pub fn load_ruleset(path: Option<&str>) -> Result<Ruleset, String> {
    match path {
        Some(path) => read_ruleset(Path::new(path)),
        None => parse_ruleset(DEFAULT_RULESET)
            .map_err(|e| format!("Bundled ruleset is invalid: {}", e)),
    }
}

pub fn read_ruleset(path: &Path) -> Result<Ruleset, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let ruleset = parse_ruleset(&text)
        .map_err(|e| format!("Invalid ruleset '{}': {}", path.display(), e))?;
    log::info!("loaded ruleset {:?} from {}", ruleset.name, path.display());
    Ok(ruleset)
}

pub fn write_text(path: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    fs::write(path, text)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tb_core::Resolver;

    #[test]
    fn test_bundled_ruleset_loads() {
        let ruleset = load_ruleset(None).unwrap();
        assert_eq!(ruleset.name, "default");
        assert_eq!(ruleset.args.len(), 105);
        assert_eq!(ruleset.tables.exceptions.len(), 2);
    }

    #[test]
    fn test_bundled_ruleset_scenarios() {
        let ruleset = load_ruleset(None).unwrap();
        let resolver = Resolver::new(&ruleset.tables);

        assert_eq!(resolver.resolve("games.sacbee.com").indices, BTreeSet::from([0]));
        assert_eq!(resolver.resolve("arkadiumarena.com").indices, BTreeSet::from([2]));
        assert!(resolver.resolve("go.skiplink.me").is_empty());
        assert!(resolver.resolve("skiplink.me").contains(0));
        assert!(resolver.resolve("ouo.io").contains(3));
        assert!(!resolver.resolve("encurtador.postazap.com").contains(47));
        assert!(resolver.resolve("postazap.com").contains(47));
    }
}
