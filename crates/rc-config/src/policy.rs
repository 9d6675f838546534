//! Reconciliation policy types.
//!
//! The policy holds the tables the detector consults besides the
//! compatibility matrix: minSdk thresholds that imply core library
//! desugaring, and the artifact families pinned by BOM platforms.

use rc_common::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Built-in policy.
pub const BUILTIN_POLICY_JSON: &str = include_str!("../data/policy.json");

/// Complete policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub desugaring: DesugaringPolicy,

    #[serde(default = "default_bom_families")]
    pub bom_families: Vec<BomFamily>,

    /// Worker pool size for loading documents and processing modules.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Promote warnings to errors by default.
    #[serde(default)]
    pub strict: bool,
}

/// minSdk thresholds below which library desugaring is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesugaringPolicy {
    pub thresholds: Vec<DesugaringThreshold>,

    /// The desugaring library that must accompany an enabled flag.
    pub library: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesugaringThreshold {
    /// Desugaring is required when `minSdk < min_sdk_below`.
    pub min_sdk_below: u32,
    pub reason: String,
}

/// Artifacts whose versions a BOM platform entry manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomFamily {
    pub name: String,
    /// `group:artifact` of the BOM itself.
    pub bom: String,
    /// Member artifacts share this group prefix.
    pub group_prefix: String,
}

impl BomFamily {
    pub fn is_bom(&self, coordinate: &Coordinate) -> bool {
        self.bom == coordinate.to_string()
    }

    pub fn is_member(&self, coordinate: &Coordinate) -> bool {
        !self.is_bom(coordinate) && coordinate.group.starts_with(&self.group_prefix)
    }
}

fn default_workers() -> usize {
    4
}

fn default_bom_families() -> Vec<BomFamily> {
    vec![
        BomFamily {
            name: "firebase".to_string(),
            bom: "com.google.firebase:firebase-bom".to_string(),
            group_prefix: "com.google.firebase".to_string(),
        },
        BomFamily {
            name: "compose".to_string(),
            bom: "androidx.compose:compose-bom".to_string(),
            group_prefix: "androidx.compose".to_string(),
        },
        BomFamily {
            name: "kotlin".to_string(),
            bom: "org.jetbrains.kotlin:kotlin-bom".to_string(),
            group_prefix: "org.jetbrains.kotlin".to_string(),
        },
        BomFamily {
            name: "okhttp".to_string(),
            bom: "com.squareup.okhttp3:okhttp-bom".to_string(),
            group_prefix: "com.squareup.okhttp3".to_string(),
        },
    ]
}

impl Default for DesugaringPolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                DesugaringThreshold {
                    min_sdk_below: 26,
                    reason: "java.time APIs need core library desugaring below API 26".to_string(),
                },
                DesugaringThreshold {
                    min_sdk_below: 24,
                    reason: "java.util.stream APIs need core library desugaring below API 24"
                        .to_string(),
                },
            ],
            library: Coordinate::new("com.android.tools", "desugar_jdk_libs"),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            desugaring: DesugaringPolicy::default(),
            bom_families: default_bom_families(),
            workers: default_workers(),
            strict: false,
        }
    }
}

impl Policy {
    /// Load policy from a JSON file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse policy from a JSON string.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid policy JSON: {}", e)))
    }

    /// The strictest threshold that `min_sdk` falls under, if any.
    pub fn desugaring_requirement(&self, min_sdk: u32) -> Option<&DesugaringThreshold> {
        self.desugaring
            .thresholds
            .iter()
            .filter(|t| min_sdk < t.min_sdk_below)
            .max_by_key(|t| t.min_sdk_below)
    }

    /// Family whose BOM is `coordinate`.
    pub fn family_of_bom(&self, coordinate: &Coordinate) -> Option<&BomFamily> {
        self.bom_families.iter().find(|f| f.is_bom(coordinate))
    }

    /// Family that manages `coordinate` as a member artifact.
    pub fn family_of_member(&self, coordinate: &Coordinate) -> Option<&BomFamily> {
        self.bom_families
            .iter()
            .filter(|f| f.is_member(coordinate))
            .max_by_key(|f| f.group_prefix.len())
    }

    /// The embedded default policy.
    pub fn builtin() -> ValidationResult<Self> {
        Self::from_json(BUILTIN_POLICY_JSON)
    }

    pub fn is_desugaring_library(&self, coordinate: &Coordinate) -> bool {
        *coordinate == self.desugaring.library
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desugaring_requirement_picks_strictest() {
        let policy = Policy::default();
        let req = policy.desugaring_requirement(21).unwrap();
        assert_eq!(req.min_sdk_below, 26);
        assert_eq!(policy.desugaring_requirement(25).unwrap().min_sdk_below, 26);
        assert!(policy.desugaring_requirement(26).is_none());
    }

    #[test]
    fn test_bom_family_membership() {
        let policy = Policy::default();
        let bom = Coordinate::new("com.google.firebase", "firebase-bom");
        let auth = Coordinate::new("com.google.firebase", "firebase-auth-ktx");
        let core = Coordinate::new("androidx.core", "core-ktx");

        assert_eq!(policy.family_of_bom(&bom).unwrap().name, "firebase");
        assert!(policy.family_of_member(&bom).is_none());
        assert_eq!(policy.family_of_member(&auth).unwrap().name, "firebase");
        assert!(policy.family_of_member(&core).is_none());
    }

    #[test]
    fn test_policy_json_defaults_fill_in() {
        let policy = Policy::from_json(r#"{"schema_version": "1.0.0"}"#).unwrap();
        assert_eq!(policy.workers, 4);
        assert!(!policy.strict);
        assert_eq!(policy.bom_families.len(), 4);
        assert_eq!(policy.desugaring.thresholds.len(), 2);
    }

    #[test]
    fn test_builtin_file_matches_default() {
        let builtin = Policy::builtin().unwrap();
        let default = Policy::default();
        assert_eq!(builtin.workers, default.workers);
        assert_eq!(builtin.strict, default.strict);
        assert_eq!(
            builtin.desugaring.thresholds.len(),
            default.desugaring.thresholds.len()
        );
        assert_eq!(builtin.desugaring.library, default.desugaring.library);
        let names = |p: &Policy| p.bom_families.iter().map(|f| f.bom.clone()).collect::<Vec<_>>();
        assert_eq!(names(&builtin), names(&default));
    }

    #[test]
    fn test_policy_rejects_bad_json() {
        assert!(matches!(
            Policy::from_json("{"),
            Err(ValidationError::ParseError(_))
        ));
    }
}
