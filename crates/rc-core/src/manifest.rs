//! Module manifest (`reconcile.toml`).
//!
//! Splits the entries of one snapshot directory into logical modules and
//! optionally pins each module's namespace.
//!
//! ```toml
//! [[modules]]
//! name = "madeeasy"
//! snapshots = ["01-*", "02-*"]
//! namespace = "com.nexa.madeeasy"
//! ```

use glob::Pattern;
use rc_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// File name looked up in the snapshot directory.
pub const MANIFEST_FILE: &str = "reconcile.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub modules: Vec<ModuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    pub name: String,
    /// Glob patterns over entry names in the snapshot directory.
    pub snapshots: Vec<String>,
    /// Namespace pinned for this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Manifest {
    /// Load `reconcile.toml` from `dir`; `None` when the directory has none.
    pub fn load(dir: &Path) -> Result<Option<Manifest>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Manifest::from_toml(&text)
            .map(Some)
            .map_err(|e| Error::InvalidManifest(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> Result<Manifest> {
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(Error::InvalidManifest("no [[modules]] declared".to_string()));
        }
        let mut names = BTreeSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(Error::InvalidManifest("module name is empty".to_string()));
            }
            if !names.insert(module.name.as_str()) {
                return Err(Error::InvalidManifest(format!(
                    "module {} is declared twice",
                    module.name
                )));
            }
            if module.snapshots.is_empty() {
                return Err(Error::InvalidManifest(format!(
                    "module {} has no snapshot patterns",
                    module.name
                )));
            }
            for pattern in &module.snapshots {
                Pattern::new(pattern).map_err(|e| {
                    Error::InvalidManifest(format!(
                        "module {}: invalid pattern '{}': {}",
                        module.name, pattern, e
                    ))
                })?;
            }
        }
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl ModuleSpec {
    /// Whether a directory entry belongs to this module.
    pub fn matches(&self, entry: &str) -> bool {
        self.snapshots
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .any(|p| p.matches(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MODULES: &str = r#"
[[modules]]
name = "madeeasy"
snapshots = ["01-*", "02-*"]
namespace = "com.nexa.madeeasy"

[[modules]]
name = "cashnet"
snapshots = ["03-*"]
"#;

    #[test]
    fn test_parse_and_match() {
        let manifest = Manifest::from_toml(TWO_MODULES).unwrap();
        assert_eq!(manifest.modules.len(), 2);
        let madeeasy = manifest.module("madeeasy").unwrap();
        assert_eq!(madeeasy.namespace.as_deref(), Some("com.nexa.madeeasy"));
        assert!(madeeasy.matches("01-initial.gradle.kts"));
        assert!(!madeeasy.matches("03-cashnet"));
        assert!(manifest.module("cashnet").unwrap().matches("03-cashnet"));
        assert!(manifest.module("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let text = "[[modules]]\nname = \"a\"\nsnapshots = [\"*\"]\n[[modules]]\nname = \"a\"\nsnapshots = [\"*\"]\n";
        let err = Manifest::from_toml(text).unwrap_err();
        assert_eq!(err.code(), 23);
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let text = "[[modules]]\nname = \"a\"\nsnapshots = [\"[\"]\n";
        assert!(Manifest::from_toml(text).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let text = "[[modules]]\nname = \"a\"\nsnapshots = [\"*\"]\nalias = \"b\"\n";
        assert!(Manifest::from_toml(text).is_err());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(MANIFEST_FILE), TWO_MODULES).unwrap();
        let manifest = Manifest::load(dir.path()).unwrap().unwrap();
        assert_eq!(manifest.modules[1].name, "cashnet");
    }
}
