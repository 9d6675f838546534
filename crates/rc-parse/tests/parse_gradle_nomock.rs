//! No-mock parser tests over real build-script trees.
//!
//! Covers:
//! - A Kotlin DSL project (settings + root + app) parsed as one snapshot
//! - A legacy Groovy project with classpath plugins and ext variables
//! - Malformed documents naming file, block path and line
//! - Robustness and DSL-equivalence properties

use proptest::prelude::*;
use rc_common::model::plugin_ids;
use rc_common::{ApplicationMode, DependencyScope, PluginOrigin, ToolchainAxis, Version, VersionSpec};
use rc_parse::{parse_document, parse_files, ParseError};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) {
    for entry in fs::read_dir(dir).expect("read fixture dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, out);
        } else if rc_parse::is_build_script(&path) {
            let rel = path
                .strip_prefix(root)
                .expect("relative path")
                .to_string_lossy()
                .replace('\\', "/");
            out.push((rel, fs::read_to_string(&path).expect("read fixture")));
        }
    }
}

fn load(name: &str) -> Vec<(String, String)> {
    let root = fixture(name);
    let mut files = Vec::new();
    collect(&root, &root, &mut files);
    files.sort();
    files
}

fn v(s: &str) -> Version {
    s.parse().expect("version")
}

#[test]
fn test_kotlin_dsl_project() {
    let snap = parse_files("kts", &load("kts")).expect("parse kts fixture");

    assert_eq!(snap.project_name.as_deref(), Some("madeeasy"));
    assert_eq!(
        snap.provenance.intent.as_deref(),
        Some("centralize plugin versions in settings")
    );

    let m = &snap.module;
    assert_eq!(m.namespace.as_deref(), Some("com.nexa.madeeasy"));
    assert_eq!(m.application_id.as_deref(), Some("com.nexa.madeeasy"));
    assert_eq!((m.min_sdk, m.target_sdk, m.compile_sdk), (Some(21), Some(34), Some(34)));
    assert_eq!(m.java_level, Some(v("11")));
    assert_eq!(m.jvm_target, Some(v("11")));
    assert_eq!(m.desugaring, Some(true));
    assert_eq!(m.multidex, Some(true));
    assert_eq!(m.minify, Some(false));
    assert_eq!(m.shrink_resources, Some(false));
    assert_eq!(m.signing_config.as_deref(), Some("debug"));
    assert_eq!(m.version_code, Some(1));
    assert_eq!(m.version_name.as_deref(), Some("1.0.0"));
    assert_eq!(m.build_dir.as_deref(), Some("../../build"));
    assert!(m
        .resource_excludes
        .as_ref()
        .is_some_and(|e| e.contains("/META-INF/{AL2.0,LGPL2.1}")));

    assert_eq!(snap.axis(ToolchainAxis::BuildTool), Some(&v("8.1.1")));
    assert_eq!(snap.axis(ToolchainAxis::LanguageCompiler), Some(&v("1.9.22")));
    assert_eq!(snap.axis(ToolchainAxis::DependencyManagementPlugin), Some(&v("4.4.2")));
    assert_eq!(snap.axis(ToolchainAxis::Jdk), Some(&v("11")));

    let agp: Vec<_> = snap.plugin_declarations(plugin_ids::ANDROID_APPLICATION).collect();
    assert_eq!(agp.len(), 2);
    assert_eq!(agp.iter().filter(|p| p.is_applied()).count(), 1);
    assert!(agp.iter().all(|p| p.origin == PluginOrigin::PluginDsl));

    let flutter: Vec<_> = snap
        .plugin_declarations("dev.flutter.flutter-gradle-plugin")
        .collect();
    assert_eq!(flutter.len(), 1);
    assert_eq!(flutter[0].mode, ApplicationMode::DeclaredOnly);

    assert_eq!(snap.dependencies.len(), 7);
    assert!(snap
        .dependencies
        .iter()
        .all(|d| matches!(d.version, VersionSpec::Explicit(_))));
}

#[test]
fn test_groovy_legacy_project() {
    let snap = parse_files("groovy", &load("groovy")).expect("parse groovy fixture");

    assert_eq!(
        snap.provenance.intent.as_deref(),
        Some("Legacy classpath setup before the plugin DSL migration")
    );
    let m = &snap.module;
    assert_eq!(m.namespace.as_deref(), Some("com.nexa.madeeasy"));
    assert_eq!(m.min_sdk, None, "flutter.minSdkVersion is symbolic");
    assert_eq!(m.compile_sdk, Some(33));
    assert_eq!(m.java_level, Some(v("8")));
    assert_eq!(m.jvm_target, Some(v("8")));
    assert_eq!(m.build_dir.as_deref(), Some("../build"));
    assert_eq!(m.signing_config.as_deref(), Some("debug"));

    for (id, version) in [
        (plugin_ids::ANDROID_APPLICATION, "7.4.2"),
        (plugin_ids::KOTLIN_ANDROID, "1.8.22"),
        (plugin_ids::GOOGLE_SERVICES, "4.3.15"),
    ] {
        let decls: Vec<_> = snap.plugin_declarations(id).collect();
        assert_eq!(decls.len(), 1, "{}", id);
        assert_eq!(decls[0].mode, ApplicationMode::Applied);
        assert_eq!(decls[0].origin, PluginOrigin::Legacy);
        assert_eq!(decls[0].version, Some(v(version)));
    }
    assert_eq!(snap.axis(ToolchainAxis::LanguageCompiler), Some(&v("1.8.22")));

    let tooling = snap
        .dependencies
        .iter()
        .filter(|d| d.scope == DependencyScope::Tooling)
        .count();
    assert_eq!(tooling, 3);

    let bom = snap.dependencies.iter().find(|d| d.platform).expect("bom entry");
    assert_eq!(bom.coordinate.artifact, "firebase-bom");
    let firestore = snap
        .dependencies
        .iter()
        .find(|d| d.coordinate.artifact == "firebase-firestore-ktx")
        .expect("firestore");
    assert!(firestore.is_override);
    let stdlib = snap
        .dependencies
        .iter()
        .find(|d| d.coordinate.artifact == "kotlin-stdlib")
        .expect("stdlib");
    assert_eq!(stdlib.version, VersionSpec::Explicit("1.8.22".into()));
}

#[test]
fn test_malformed_document_names_block_and_line() {
    let source = "android {\n    defaultConfig {\n        minSdk = 21\n        versionName = \"1.0\n    }\n}\n";
    let err = parse_document("snapshots/04-broken.gradle.kts", source).unwrap_err();
    assert_eq!(err.line(), Some(4));
    let report = err.into_malformed("snapshots/04-broken.gradle.kts");
    assert_eq!(report.code(), 10);
    assert!(report.to_string().contains("unterminated string"));
}

#[test]
fn test_unbalanced_block_reports_path() {
    let source = "android {\n    defaultConfig {\n        minSdk = 21\n\n";
    let err = parse_document("x", source).unwrap_err();
    assert_eq!(err.block_path().as_deref(), Some("android > defaultConfig"));
    assert!(matches!(err, ParseError::InFile { .. }));
}

proptest! {
    #[test]
    fn prop_parser_never_panics(source in "\\PC{0,200}") {
        let _ = parse_document("fuzz", &source);
    }

    #[test]
    fn prop_kotlin_and_groovy_sdk_spellings_agree(
        min in 16u32..30,
        extra_target in 0u32..6,
        extra_compile in 0u32..4,
    ) {
        let target = min + extra_target;
        let compile = target + extra_compile;
        let kts = format!(
            "android {{\n compileSdk = {compile}\n defaultConfig {{\n minSdk = {min}\n targetSdk = {target}\n }}\n}}\n"
        );
        let groovy = format!(
            "android {{\n compileSdkVersion \"android-{compile}\"\n defaultConfig {{\n minSdkVersion {min}\n targetSdkVersion {target}\n }}\n}}\n"
        );
        let a = parse_document("a.gradle.kts", &kts).unwrap();
        let b = parse_document("b.gradle", &groovy).unwrap();
        prop_assert_eq!(&a.module, &b.module);
        prop_assert_eq!(a.module.min_sdk, Some(min));
    }
}
