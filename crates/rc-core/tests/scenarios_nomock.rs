//! No-mock reconciliation scenarios over real snapshot directories.
//!
//! Covers:
//! - Scenario A: latest compileSdk wins, candidate accepted
//! - Scenario B: incompatible Kotlin walked back under a locked AGP
//! - Scenario C: classpath vs plugin-DSL declarations of google-services
//! - Scenario D: namespace drift, refused until split or pinned

use rc_common::{ConflictKind, ConflictStatus, Severity, ToolchainAxis, Version};
use rc_config::{load_config, ConfigPaths, LoadedConfig};
use rc_core::exit_codes::ExitCode;
use rc_core::logging::LogContext;
use rc_core::pipeline::{Reconciler, RunOptions};
use rc_core::report::{ModuleOutcome, RunReport};
use rc_core::resolve::Reason;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config() -> LoadedConfig {
    load_config(&ConfigPaths::default()).expect("built-in configuration")
}

fn options(module: Option<&str>) -> RunOptions {
    RunOptions {
        module: module.map(str::to_string),
        strict: false,
        jobs: 2,
        timeout: None,
    }
}

fn reconcile(name: &str, module: Option<&str>) -> RunReport {
    let config = config();
    Reconciler::new(&config, options(module), LogContext::new("run-scenario"))
        .run_dir(&fixture(name))
        .expect("fixture directory reconciles")
}

#[test]
fn test_scenario_a_latest_compile_sdk_wins() {
    let report = reconcile("scenario_a", None);
    assert_eq!(report.exit_code(), ExitCode::Accepted);
    assert!(report.malformed.is_empty());

    let module = &report.modules[0];
    assert_eq!(module.name, "scenario_a");
    assert!(matches!(module.outcome, ModuleOutcome::Accepted { .. }));

    let config = module.outcome.config().expect("resolved config");
    let compile = config.compile_sdk.as_ref().expect("compile sdk");
    assert_eq!(compile.value, 36);
    assert_eq!(compile.snapshots, vec![2]);
    assert_eq!(compile.reason, Reason::LatestWins);

    let document = module.outcome.document().expect("rendered document");
    assert!(document.contains("compileSdk = 36"));
    assert!(!document.contains("compileSdk = 34"));
}

#[test]
fn test_scenario_b_kotlin_downgraded_under_locked_agp() {
    let report = reconcile("scenario_b", None);
    let module = &report.modules[0];
    let config = module.outcome.config().expect("resolved config");

    let agp = &config.toolchain[&ToolchainAxis::BuildTool];
    assert_eq!(agp.value, "8.1.1".parse::<Version>().unwrap());

    let kotlin = &config.toolchain[&ToolchainAxis::LanguageCompiler];
    assert_eq!(kotlin.value, "1.9.22".parse::<Version>().unwrap());
    assert_eq!(kotlin.snapshots, vec![2]);
    assert_eq!(
        kotlin.reason,
        Reason::DowngradedFrom {
            from: "2.2.21".to_string()
        }
    );

    let incompatibility = module
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::VersionIncompatibility)
        .expect("kotlin 2.2.21 vs AGP 8.1.1 is flagged");
    assert_eq!(incompatibility.severity, Severity::Error);
    assert_eq!(incompatibility.status, ConflictStatus::Downgraded);
    assert!(incompatibility.values.contains(&"2.2.21".to_string()));

    assert!(matches!(module.outcome, ModuleOutcome::Accepted { .. }));
    let document = module.outcome.document().expect("rendered document");
    assert!(document.contains("// downgraded from 2.2.21"), "{}", document);
    assert_eq!(report.exit_code(), ExitCode::Accepted);
}

#[test]
fn test_scenario_c_redundant_declaration_is_informational() {
    let report = reconcile("scenario_c", None);
    let module = &report.modules[0];

    assert!(
        !module
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::DuplicatePluginApplication),
        "only the classpath entry is applied"
    );
    let redundant = module
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::RedundantDeclaration)
        .expect("classpath and plugin DSL both declare google-services");
    assert_eq!(redundant.severity, Severity::Info);
    assert_eq!(redundant.values, vec!["com.google.gms.google-services"]);
    assert_eq!(redundant.snapshots, vec![1, 2]);
    assert!(!redundant.is_blocking());
}

#[test]
fn test_scenario_d_identity_drift_is_refused() {
    let report = reconcile("scenario_d", None);
    let module = &report.modules[0];

    let drift = module
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::IdentityDrift)
        .expect("namespace drift");
    assert_eq!(drift.snapshots, vec![1, 3]);
    assert_eq!(drift.values, vec!["com.nexa.madeeasy", "com.cashnet.app"]);
    assert!(drift.is_blocking());

    match &module.outcome {
        ModuleOutcome::Unresolvable { error } => assert_eq!(error.field, "namespace"),
        other => panic!("expected unresolvable, got {}", other.name()),
    }
    assert_eq!(report.exit_code(), ExitCode::Conflicts);
}

#[test]
fn test_scenario_d_explicit_pin() {
    let report = reconcile("scenario_d", Some("com.cashnet.app"));
    let module = &report.modules[0];
    let config = module.outcome.config().expect("pinned module resolves");
    let namespace = config.namespace.as_ref().expect("namespace");
    assert_eq!(namespace.value, "com.cashnet.app");
    assert_eq!(namespace.reason, Reason::Pinned);

    let drift = module
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::IdentityDrift)
        .expect("drift is still reported");
    assert_eq!(drift.status, ConflictStatus::Pinned);
    assert_eq!(report.exit_code(), ExitCode::Accepted);
}

#[test]
fn test_scenario_d_pin_outside_the_sequence_is_refused() {
    let report = reconcile("scenario_d", Some("com.cashnet.ap"));
    let module = &report.modules[0];
    match &module.outcome {
        ModuleOutcome::Unresolvable { error } => {
            assert_eq!(error.field, "namespace");
            assert!(error.reason.contains("com.cashnet.ap is not declared"));
        }
        other => panic!("expected unresolvable, got {}", other.name()),
    }
    assert_eq!(module.errors.len(), 1);
    assert_eq!(module.errors[0].code, 30);
    assert_eq!(report.exit_code(), ExitCode::Conflicts);
}

#[test]
fn test_scenario_d_split_by_manifest() {
    let report = reconcile("split", None);
    assert_eq!(report.exit_code(), ExitCode::Accepted);

    let madeeasy = &report.modules[0];
    assert_eq!(madeeasy.name, "madeeasy");
    assert_eq!(madeeasy.snapshots.len(), 2);
    assert!(!madeeasy
        .conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::IdentityDrift));
    let config = madeeasy.outcome.config().expect("madeeasy resolves");
    assert_eq!(config.min_sdk.as_ref().map(|r| r.value), Some(28));

    let cashnet = &report.modules[1];
    assert_eq!(cashnet.name, "cashnet");
    assert_eq!(cashnet.snapshots.len(), 1);
    assert_eq!(cashnet.snapshots[0].source, "03-cashnet.gradle.kts");
}

#[test]
fn test_malformed_snapshot_is_reported_and_skipped() {
    let report = reconcile("malformed", None);
    assert_eq!(report.malformed.len(), 1);
    let malformed = &report.malformed[0];
    assert_eq!(malformed.source, "02-broken.gradle.kts");
    assert!(malformed.error.message.contains("02-broken.gradle.kts"));

    let module = &report.modules[0];
    assert_eq!(module.snapshots.len(), 1);
    assert!(matches!(module.outcome, ModuleOutcome::Accepted { .. }));
    assert_eq!(report.exit_code(), ExitCode::MalformedInput);
}
