//! Loading additional pattern definitions from TOML
//!
//! Custom definition files use the same shape as the builtin catalogs:
//!
//! ```toml
//! [[definition]]
//! name = "disintegration"
//! category = "flare"
//! outcome = "damage"
//! templates = ['^\*\* your .+? releases a shimmering beam']
//! ```
//!
//! Definitions from files are appended after the builtins of their category.

use std::fs;
use std::path::Path;

use bestiary_types::TrackedCategories;

use super::definition::{DefinitionConfig, PatternDefinition};
use crate::error::ConfigError;

/// Parse definitions from TOML text without validating them.
pub fn parse_definitions(content: &str) -> Result<Vec<PatternDefinition>, toml::de::Error> {
    let config: DefinitionConfig = toml::from_str(content)?;
    Ok(config.definitions)
}

/// Read and validate a definition file.
///
/// The first invalid definition fails the whole file.
pub fn load_definitions(path: &Path) -> Result<Vec<PatternDefinition>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let definitions = parse_definitions(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    for def in &definitions {
        def.validate()?;
    }

    tracing::info!(
        path = %path.display(),
        count = definitions.len(),
        "Loaded pattern definitions"
    );
    Ok(definitions)
}

/// Build a category selection from names, rejecting unknown ones.
///
/// Starts from nothing enabled; each name turns one category on.
pub fn categories_from_names<S: AsRef<str>>(names: &[S]) -> Result<TrackedCategories, ConfigError> {
    let mut categories = TrackedCategories::none();
    for name in names {
        let name = name.as_ref().trim();
        if !categories.set(name, true) {
            return Err(ConfigError::UnknownCategory(name.to_string()));
        }
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::patterns::Category;

    #[test]
    fn test_categories_from_names() {
        let cats = categories_from_names(&["damage", "statuses"]).unwrap();
        assert!(cats.damage);
        assert!(cats.statuses);
        assert!(!cats.flares);
        assert!(!cats.wounds);
        assert!(!cats.sequences);

        let err = categories_from_names(&["damage", "gossip"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory(name) if name == "gossip"));
    }

    #[test]
    fn test_load_definitions_from_file() {
        let path = std::env::temp_dir().join(format!("bestiary-defs-{}.toml", std::process::id()));
        {
            let mut file = fs::File::create(&path).unwrap();
            writeln!(
                file,
                r#"
[[definition]]
name = "dazed"
category = "status"
outcome = "debuff"
action = "add"
templates = ['^{{target}} looks dazed']
"#
            )
            .unwrap();
        }

        let defs = load_definitions(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].category, Category::Status);
        assert_eq!(defs[0].templates[0], "^{target} looks dazed");
    }

    #[test]
    fn test_load_definitions_rejects_invalid() {
        let path =
            std::env::temp_dir().join(format!("bestiary-bad-defs-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[[definition]]\nname = \"wound\"\ncategory = \"critical\"\noutcome = \"wound\"\ntemplates = ['ouch']\n",
        )
        .unwrap();

        let err = load_definitions(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_load_definitions_missing_file() {
        let err = load_definitions(Path::new("/nonexistent/bestiary.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
