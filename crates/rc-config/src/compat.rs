//! Compatibility knowledge base.
//!
//! The matrix lives in `data/compat.json` (embedded as the built-in default,
//! replaceable by a file) so the table can be updated without touching the
//! detector or resolver. Lookups are tri-state: a pair of values no rule
//! covers is [`Compatibility::Unknown`], not incompatible.

use rc_common::{ToolchainAxis, Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::validate::{validate_compat, ValidationError, ValidationResult};

/// Built-in compatibility matrix.
pub const BUILTIN_COMPAT_JSON: &str = include_str!("../data/compat.json");

/// Result of a compatibility lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    Compatible,
    Incompatible,
    /// No rule covers the pair; surfaced as a warning.
    Unknown,
}

/// `{axis, range}` half of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisRange {
    pub axis: ToolchainAxis,
    pub range: VersionRange,
}

/// "When `subject` holds, `requires` must hold."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatRule {
    pub subject: AxisRange,
    pub requires: AxisRange,
    #[serde(default)]
    pub note: Option<String>,
}

/// Maximum compileSdk a build-tool range has been tested against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkLimit {
    pub build_tool: VersionRange,
    pub max_compile_sdk: u32,
}

/// On-disk shape of `compat.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatTable {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub known_versions: BTreeMap<ToolchainAxis, Vec<Version>>,

    pub rules: Vec<CompatRule>,

    #[serde(default)]
    pub sdk_limits: Vec<SdkLimit>,
}

impl CompatTable {
    /// Load the table from a JSON file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse the table from a JSON string.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid compat JSON: {}", e)))
    }

    /// The embedded default table.
    pub fn builtin() -> ValidationResult<Self> {
        Self::from_json(BUILTIN_COMPAT_JSON)
    }
}

/// Validated, queryable compatibility matrix.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    table: CompatTable,
}

impl KnowledgeBase {
    /// Validate a table and wrap it for lookups.
    pub fn new(table: CompatTable) -> ValidationResult<Self> {
        validate_compat(&table)?;
        Ok(KnowledgeBase { table })
    }

    /// Knowledge base from the embedded matrix.
    pub fn builtin() -> ValidationResult<Self> {
        Self::new(CompatTable::builtin()?)
    }

    pub fn table(&self) -> &CompatTable {
        &self.table
    }

    /// Whether any rule relates the two axes, in either direction.
    ///
    /// Unrelated pairs are never queried by the detector, so they never
    /// produce unknown-compatibility noise.
    pub fn relates(&self, a: ToolchainAxis, b: ToolchainAxis) -> bool {
        self.table.rules.iter().any(|r| {
            (r.subject.axis == a && r.requires.axis == b)
                || (r.subject.axis == b && r.requires.axis == a)
        })
    }

    /// Tri-state compatibility of `va` on `axis_a` with `vb` on `axis_b`.
    ///
    /// Rules are evaluated in both directions. Any violated rule makes the
    /// pair incompatible; otherwise the pair is compatible when at least one
    /// rule applied and unknown when none did.
    pub fn is_compatible(
        &self,
        axis_a: ToolchainAxis,
        va: &Version,
        axis_b: ToolchainAxis,
        vb: &Version,
    ) -> Compatibility {
        if axis_a == axis_b {
            return if va == vb {
                Compatibility::Compatible
            } else {
                Compatibility::Incompatible
            };
        }

        let mut covered = false;
        for rule in &self.table.rules {
            let (subject_value, required_value) =
                if rule.subject.axis == axis_a && rule.requires.axis == axis_b {
                    (va, vb)
                } else if rule.subject.axis == axis_b && rule.requires.axis == axis_a {
                    (vb, va)
                } else {
                    continue;
                };

            if !rule.subject.range.contains(subject_value) {
                continue;
            }
            covered = true;
            if !rule.requires.range.contains(required_value) {
                return Compatibility::Incompatible;
            }
        }

        if covered {
            Compatibility::Compatible
        } else {
            Compatibility::Unknown
        }
    }

    /// Known values on `axis_b` that are compatible with `va`, newest first.
    pub fn suggest_compatible(
        &self,
        axis_a: ToolchainAxis,
        va: &Version,
        axis_b: ToolchainAxis,
    ) -> Vec<Version> {
        let mut out: Vec<Version> = self
            .table
            .known_versions
            .get(&axis_b)
            .map(|known| {
                known
                    .iter()
                    .filter(|vb| {
                        self.is_compatible(axis_a, va, axis_b, vb) == Compatibility::Compatible
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| b.cmp(a));
        out.dedup();
        out
    }

    /// Notes of the rules that make a pair incompatible, for explanations.
    pub fn violated_notes(
        &self,
        axis_a: ToolchainAxis,
        va: &Version,
        axis_b: ToolchainAxis,
        vb: &Version,
    ) -> Vec<String> {
        self.table
            .rules
            .iter()
            .filter_map(|rule| {
                let (sv, rv) = if rule.subject.axis == axis_a && rule.requires.axis == axis_b {
                    (va, vb)
                } else if rule.subject.axis == axis_b && rule.requires.axis == axis_a {
                    (vb, va)
                } else {
                    return None;
                };
                if rule.subject.range.contains(sv) && !rule.requires.range.contains(rv) {
                    Some(rule.note.clone().unwrap_or_else(|| {
                        format!(
                            "{} {} requires {} {}",
                            rule.subject.axis,
                            rule.subject.range,
                            rule.requires.axis,
                            rule.requires.range
                        )
                    }))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Highest compileSdk tested with `build_tool`, if the table knows it.
    pub fn max_compile_sdk(&self, build_tool: &Version) -> Option<u32> {
        self.table
            .sdk_limits
            .iter()
            .filter(|l| l.build_tool.contains(build_tool))
            .map(|l| l.max_compile_sdk)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn kb() -> KnowledgeBase {
        KnowledgeBase::builtin().unwrap()
    }

    #[test]
    fn test_kotlin_2_2_incompatible_with_agp_8_1() {
        let kb = kb();
        assert_eq!(
            kb.is_compatible(
                ToolchainAxis::BuildTool,
                &v("8.1.1"),
                ToolchainAxis::LanguageCompiler,
                &v("2.2.21")
            ),
            Compatibility::Incompatible
        );
        assert_eq!(
            kb.is_compatible(
                ToolchainAxis::BuildTool,
                &v("8.1.1"),
                ToolchainAxis::LanguageCompiler,
                &v("1.9.22")
            ),
            Compatibility::Compatible
        );
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let kb = kb();
        let forward = kb.is_compatible(
            ToolchainAxis::BuildTool,
            &v("8.1.1"),
            ToolchainAxis::Jdk,
            &v("21"),
        );
        let backward = kb.is_compatible(
            ToolchainAxis::Jdk,
            &v("21"),
            ToolchainAxis::BuildTool,
            &v("8.1.1"),
        );
        assert_eq!(forward, Compatibility::Incompatible);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_uncovered_values_are_unknown() {
        let kb = kb();
        assert_eq!(
            kb.is_compatible(
                ToolchainAxis::BuildTool,
                &v("3.6.0"),
                ToolchainAxis::Jdk,
                &v("8")
            ),
            Compatibility::Unknown
        );
    }

    #[test]
    fn test_google_services_minimum_agp() {
        let kb = kb();
        assert_eq!(
            kb.is_compatible(
                ToolchainAxis::DependencyManagementPlugin,
                &v("4.4.2"),
                ToolchainAxis::BuildTool,
                &v("7.2.0")
            ),
            Compatibility::Incompatible
        );
    }

    #[test]
    fn test_relates() {
        let kb = kb();
        assert!(kb.relates(ToolchainAxis::BuildTool, ToolchainAxis::Jdk));
        assert!(kb.relates(ToolchainAxis::Jdk, ToolchainAxis::LanguageCompiler));
        assert!(!kb.relates(ToolchainAxis::Jdk, ToolchainAxis::DependencyManagementPlugin));
    }

    #[test]
    fn test_suggest_compatible_newest_first() {
        let kb = kb();
        let suggestions = kb.suggest_compatible(
            ToolchainAxis::BuildTool,
            &v("8.1.1"),
            ToolchainAxis::LanguageCompiler,
        );
        assert_eq!(suggestions.first(), Some(&v("1.9.24")));
        assert!(suggestions.iter().all(|s| *s < v("2.0")));
        assert!(!suggestions.contains(&v("1.7.20")));
    }

    #[test]
    fn test_max_compile_sdk() {
        let kb = kb();
        assert_eq!(kb.max_compile_sdk(&v("8.1.1")), Some(34));
        assert_eq!(kb.max_compile_sdk(&v("8.9.1")), Some(36));
        assert_eq!(kb.max_compile_sdk(&v("4.0.0")), None);
    }

    #[test]
    fn test_violated_notes_explain() {
        let kb = kb();
        let notes = kb.violated_notes(
            ToolchainAxis::BuildTool,
            &v("8.1.1"),
            ToolchainAxis::LanguageCompiler,
            &v("2.2.21"),
        );
        assert_eq!(notes, vec!["Kotlin 2.x needs AGP 8.2 or newer".to_string()]);
    }
}
