//! Configuration fingerprints for reproducible reports.
//!
//! A fingerprint records which knowledge base and policy a run used, so two
//! reports can be compared knowing whether the tables were the same.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::ConfigPaths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFingerprint {
    pub schema_version: String,

    /// SHA-256 of the compat.json content in effect (embedded or file).
    pub compat_hash: String,

    #[serde(default)]
    pub compat_path: Option<String>,

    pub compat_source: String,

    /// SHA-256 of the policy JSON in effect (serialized built-in when no file).
    pub policy_hash: String,

    #[serde(default)]
    pub policy_path: Option<String>,

    pub policy_source: String,

    /// Combined hash of both (for quick comparison).
    pub combined_hash: String,
}

impl ConfigFingerprint {
    pub fn new(paths: &ConfigPaths, compat_json: &str, policy_json: &str) -> Self {
        let compat_hash = hash_content(compat_json);
        let policy_hash = hash_content(policy_json);
        let combined_hash = hash_content(&format!("{}:{}", compat_hash, policy_hash));

        ConfigFingerprint {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            compat_hash,
            compat_path: paths.compat.as_ref().map(|p| p.display().to_string()),
            compat_source: paths.compat_source.to_string(),
            policy_hash,
            policy_path: paths.policy.as_ref().map(|p| p.display().to_string()),
            policy_source: paths.policy_source.to_string(),
            combined_hash,
        }
    }

    /// Check if this fingerprint matches another (same tables).
    pub fn matches(&self, other: &ConfigFingerprint) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// First 12 chars of the combined hash.
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test");
        assert_eq!(hash1, hash_content("test"));
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_fingerprint_matches_same_content() {
        let paths = ConfigPaths::default();
        let a = ConfigFingerprint::new(&paths, "{}", "{\"x\":1}");
        let b = ConfigFingerprint::new(&paths, "{}", "{\"x\":1}");
        let c = ConfigFingerprint::new(&paths, "{}", "{\"x\":2}");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert_eq!(a.short_id().len(), 12);
        assert_eq!(a.compat_source, "builtin default");
    }
}
