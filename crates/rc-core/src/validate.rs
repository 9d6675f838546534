//! Invariant checks on a resolved candidate.
//!
//! The validator is independent of the resolver: it re-checks the merged
//! configuration and reports every violation, never a partial list.

use crate::resolve::ResolvedConfig;
use rc_common::{DependencyScope, ToolchainAxis, VersionSpec};
use rc_config::{Compatibility, KnowledgeBase, Policy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Invariant a candidate must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// minSdk <= targetSdk <= compileSdk.
    SdkOrdering,
    /// Each plugin id applied exactly once.
    SinglePluginApplication,
    /// No explicit member version alongside its BOM unless marked override.
    BomConsistency,
    /// Desugaring enabled requires the desugaring library.
    Desugaring,
    /// No locked axis pair the knowledge base marks incompatible.
    ToolchainCompatibility,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::SdkOrdering => "sdk_ordering",
            Rule::SinglePluginApplication => "single_plugin_application",
            Rule::BomConsistency => "bom_consistency",
            Rule::Desugaring => "desugaring",
            Rule::ToolchainCompatibility => "toolchain_compatibility",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub rule: Rule,
    pub field: String,
    pub message: String,
}

impl InvariantViolation {
    fn new(rule: Rule, field: impl Into<String>, message: impl Into<String>) -> Self {
        InvariantViolation {
            rule,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn to_error(&self, module: &str) -> rc_common::Error {
        rc_common::Error::InvariantViolation {
            module: module.to_string(),
            message: format!("{}: {}", self.rule, self.message),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule, self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub diagnostics: Vec<InvariantViolation>,
}

impl Verdict {
    fn from_diagnostics(diagnostics: Vec<InvariantViolation>) -> Self {
        Verdict {
            accepted: diagnostics.is_empty(),
            diagnostics,
        }
    }
}

pub fn validate(candidate: &ResolvedConfig, kb: &KnowledgeBase, policy: &Policy) -> Verdict {
    let mut diagnostics = Vec::new();
    check_sdk_ordering(candidate, &mut diagnostics);
    check_plugins(candidate, &mut diagnostics);
    check_bom(candidate, policy, &mut diagnostics);
    check_desugaring(candidate, policy, &mut diagnostics);
    check_toolchain(candidate, kb, &mut diagnostics);

    for d in &diagnostics {
        warn!(
            event = crate::logging::event_names::VALIDATE_VIOLATION,
            module = %candidate.module,
            rule = %d.rule,
            field = %d.field,
            "{}",
            d.message
        );
    }
    Verdict::from_diagnostics(diagnostics)
}

fn check_sdk_ordering(c: &ResolvedConfig, out: &mut Vec<InvariantViolation>) {
    let get = |f: &Option<crate::resolve::Resolved<u32>>| f.as_ref().map(|r| r.value);
    let (min, target, compile) = (get(&c.min_sdk), get(&c.target_sdk), get(&c.compile_sdk));

    if let (Some(min), Some(target)) = (min, target) {
        if min > target {
            out.push(InvariantViolation::new(
                Rule::SdkOrdering,
                "min_sdk",
                format!("minSdk {} exceeds targetSdk {}", min, target),
            ));
        }
    }
    if let (Some(target), Some(compile)) = (target, compile) {
        if target > compile {
            out.push(InvariantViolation::new(
                Rule::SdkOrdering,
                "target_sdk",
                format!("targetSdk {} exceeds compileSdk {}", target, compile),
            ));
        }
    }
    if let (Some(min), None, Some(compile)) = (min, target, compile) {
        if min > compile {
            out.push(InvariantViolation::new(
                Rule::SdkOrdering,
                "min_sdk",
                format!("minSdk {} exceeds compileSdk {}", min, compile),
            ));
        }
    }
}

fn check_plugins(c: &ResolvedConfig, out: &mut Vec<InvariantViolation>) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for p in &c.plugins {
        *counts.entry(p.id.as_str()).or_default() += 1;
    }
    for (id, n) in counts.into_iter().filter(|(_, n)| *n > 1) {
        out.push(InvariantViolation::new(
            Rule::SinglePluginApplication,
            "plugins",
            format!("plugin {} is applied {} times", id, n),
        ));
    }
}

fn check_bom(c: &ResolvedConfig, policy: &Policy, out: &mut Vec<InvariantViolation>) {
    for family in &policy.bom_families {
        let Some(bom) = c
            .dependencies
            .iter()
            .find(|d| d.platform && family.is_bom(&d.coordinate))
        else {
            continue;
        };
        for d in &c.dependencies {
            let member = !d.platform
                && d.scope == DependencyScope::Implementation
                && policy
                    .family_of_member(&d.coordinate)
                    .is_some_and(|f| f.name == family.name);
            if !member || d.is_override {
                continue;
            }
            if let VersionSpec::Explicit(v) = &d.version {
                out.push(InvariantViolation::new(
                    Rule::BomConsistency,
                    d.coordinate.to_string(),
                    format!(
                        "{} pins {} while {}:{} manages it",
                        d.coordinate, v, bom.coordinate, bom.version
                    ),
                ));
            }
        }
    }
}

fn check_desugaring(c: &ResolvedConfig, policy: &Policy, out: &mut Vec<InvariantViolation>) {
    let enabled = c.desugaring.as_ref().is_some_and(|r| r.value);
    let library = c
        .dependencies
        .iter()
        .any(|d| policy.is_desugaring_library(&d.coordinate));
    if enabled && !library {
        out.push(InvariantViolation::new(
            Rule::Desugaring,
            "desugaring",
            format!(
                "core library desugaring is enabled but {} is not a dependency",
                policy.desugaring.library
            ),
        ));
    }
}

fn check_toolchain(c: &ResolvedConfig, kb: &KnowledgeBase, out: &mut Vec<InvariantViolation>) {
    for (i, &a) in ToolchainAxis::ALL.iter().enumerate() {
        for &b in &ToolchainAxis::ALL[i + 1..] {
            let (Some(va), Some(vb)) = (c.axis(a), c.axis(b)) else {
                continue;
            };
            if kb.is_compatible(a, va, b, vb) == Compatibility::Incompatible {
                out.push(InvariantViolation::new(
                    Rule::ToolchainCompatibility,
                    b.as_str(),
                    format!("{} {} is incompatible with {} {}", b, vb, a, va),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Reason, Resolved, ResolvedDependency, ResolvedPlugin};
    use rc_common::{Coordinate, Version};

    fn r<T>(value: T) -> Option<Resolved<T>> {
        Some(Resolved {
            value,
            snapshots: vec![1],
            reason: Reason::LatestWins,
        })
    }

    fn dep(coordinate: &str, version: VersionSpec, platform: bool) -> ResolvedDependency {
        let (group, artifact) = coordinate.split_once(':').unwrap();
        ResolvedDependency {
            configuration: "implementation".into(),
            scope: DependencyScope::Implementation,
            coordinate: Coordinate::new(group, artifact),
            version,
            platform,
            is_override: false,
            snapshots: vec![1],
            reason: Reason::LatestWins,
        }
    }

    fn check(c: &ResolvedConfig) -> Verdict {
        validate(c, &KnowledgeBase::builtin().unwrap(), &Policy::default())
    }

    #[test]
    fn test_consistent_candidate_is_accepted() {
        let c = ResolvedConfig {
            module: "app".into(),
            compile_sdk: r(34),
            target_sdk: r(34),
            min_sdk: r(24),
            ..ResolvedConfig::default()
        };
        let verdict = check(&c);
        assert!(verdict.accepted);
        assert!(verdict.diagnostics.is_empty());
    }

    #[test]
    fn test_every_violation_is_reported() {
        let mut c = ResolvedConfig {
            module: "app".into(),
            compile_sdk: r(33),
            target_sdk: r(34),
            min_sdk: r(35),
            desugaring: r(true),
            ..ResolvedConfig::default()
        };
        let plugin = ResolvedPlugin {
            id: "com.android.application".into(),
            version: None,
            snapshots: vec![1],
            reason: Reason::LatestWins,
        };
        c.plugins = vec![plugin.clone(), plugin];
        c.dependencies = vec![
            dep(
                "com.google.firebase:firebase-bom",
                VersionSpec::Explicit("32.7.0".into()),
                true,
            ),
            dep(
                "com.google.firebase:firebase-auth-ktx",
                VersionSpec::Explicit("22.3.0".into()),
                false,
            ),
        ];
        c.toolchain.insert(
            ToolchainAxis::BuildTool,
            r("8.1.1".parse::<Version>().unwrap()).unwrap(),
        );
        c.toolchain.insert(
            ToolchainAxis::LanguageCompiler,
            r("2.2.21".parse::<Version>().unwrap()).unwrap(),
        );

        let verdict = check(&c);
        assert!(!verdict.accepted);
        let rules = verdict.diagnostics.iter().map(|d| d.rule).collect::<Vec<_>>();
        assert_eq!(
            rules,
            vec![
                Rule::SdkOrdering,
                Rule::SdkOrdering,
                Rule::SinglePluginApplication,
                Rule::BomConsistency,
                Rule::Desugaring,
                Rule::ToolchainCompatibility,
            ]
        );
    }

    #[test]
    fn test_managed_and_override_members_pass() {
        let mut override_dep = dep(
            "com.google.firebase:firebase-firestore-ktx",
            VersionSpec::Explicit("25.0.0".into()),
            false,
        );
        override_dep.is_override = true;
        let mut plugin_classpath = dep(
            "com.google.firebase:firebase-crashlytics-gradle",
            VersionSpec::Explicit("2.9.9".into()),
            false,
        );
        plugin_classpath.configuration = "classpath".into();
        plugin_classpath.scope = DependencyScope::Tooling;
        let c = ResolvedConfig {
            module: "app".into(),
            dependencies: vec![
                dep(
                    "com.google.firebase:firebase-bom",
                    VersionSpec::Explicit("32.7.0".into()),
                    true,
                ),
                dep("com.google.firebase:firebase-auth-ktx", VersionSpec::Managed, false),
                override_dep,
                plugin_classpath,
            ],
            ..ResolvedConfig::default()
        };
        assert!(check(&c).accepted);
    }

    #[test]
    fn test_violation_converts_to_error() {
        let v = InvariantViolation::new(Rule::Desugaring, "desugaring", "missing library");
        let err = v.to_error("app");
        assert_eq!(err.code(), 40);
        assert!(err.to_string().contains("desugaring: missing library"));
    }
}
