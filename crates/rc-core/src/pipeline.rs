//! Run orchestration.
//!
//! A run discovers the entries of a snapshot directory, parses them on a
//! bounded worker pool, groups them into modules (one implicit module, or
//! the modules of `reconcile.toml`) and reconciles every module:
//! detect → resolve → validate → render. Modules are independent; an
//! unresolvable module never stops its siblings.

use crate::detect::{detect, DetectOptions};
use crate::logging::{event_names, LogContext, Stage};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::render;
use crate::report::{MalformedInput, ModuleOutcome, ModuleReport, RunReport, SnapshotSummary};
use crate::resolve::resolve;
use crate::store::SnapshotStore;
use crate::validate::validate;
use crate::log_event;
use rc_common::{Error, Result, Snapshot};
use rc_config::{LoadedConfig, Policy};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, warn};
use walkdir::WalkDir;

/// Caller choices for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// With a manifest: the module to reconcile. Without one: the namespace
    /// pinned for the implicit module.
    pub module: Option<String>,
    /// Promote warnings to errors.
    pub strict: bool,
    /// Worker pool size.
    pub jobs: usize,
    /// Modules not started before this much time has passed are skipped.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn from_policy(policy: &Policy) -> Self {
        RunOptions {
            module: None,
            strict: policy.strict,
            jobs: policy.workers,
            timeout: None,
        }
    }
}

/// One directory entry read into memory: a single build script, or every
/// build script below a snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: String,
    /// `(relative path, contents)`, sorted by path.
    pub files: Vec<(String, String)>,
}

/// Snapshot entries of `dir`, sorted by name.
///
/// Hidden entries and the manifest are skipped, as are files that are not
/// build scripts and directories that contain none.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || name == MANIFEST_FILE {
            continue;
        }
        let keep = if path.is_dir() {
            build_scripts(&path).next().is_some()
        } else {
            rc_parse::is_build_script(&path)
        };
        if keep {
            entries.push(path);
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

fn build_scripts(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name.starts_with('.') || name == "build")
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && rc_parse::is_build_script(e.path()))
}

/// Read one entry returned by [`discover`].
pub fn read_entry(path: &Path) -> Result<SnapshotEntry> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !path.is_dir() {
        let text = std::fs::read_to_string(path)?;
        return Ok(SnapshotEntry {
            files: vec![(name.clone(), text)],
            name,
        });
    }

    let mut files = Vec::new();
    for entry in build_scripts(path) {
        let rel = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.push((rel, std::fs::read_to_string(entry.path())?));
    }
    files.sort();
    Ok(SnapshotEntry { name, files })
}

/// Parse one entry; failures become report entries, never errors.
pub fn load_entry(path: &Path) -> std::result::Result<Snapshot, MalformedInput> {
    let entry = read_entry(path).map_err(|e| {
        let source = path.display().to_string();
        MalformedInput {
            source,
            line: None,
            block: None,
            error: e.to_report(),
        }
    })?;
    parse_entry(&entry.name, &entry.files)
}

fn parse_entry(name: &str, files: &[(String, String)]) -> std::result::Result<Snapshot, MalformedInput> {
    rc_parse::parse_files(name, files).map_err(|e| MalformedInput {
        source: name.to_string(),
        line: e.line(),
        block: e.block_path(),
        error: e.into_malformed(name).to_report(),
    })
}

/// Run `work` over `items` on scoped threads, at most `jobs` at a time.
///
/// Results keep input order. A panicked worker yields `None`.
pub fn run_pool<T, R, F>(items: &[T], jobs: usize, work: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let work = &work;
    items
        .chunks(jobs.max(1))
        .flat_map(|chunk| {
            thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|item| s.spawn(move || work(item)))
                    .collect();

                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(result) => Some(result),
                        Err(_) => {
                            error!("worker thread panicked");
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect()
}

/// Snapshots claimed by one logical module.
#[derive(Debug, Clone)]
struct ModuleInput {
    name: String,
    pin: Option<String>,
    snapshots: Vec<Snapshot>,
}

/// Reconciles snapshot directories or in-memory buffers.
pub struct Reconciler<'a> {
    config: &'a LoadedConfig,
    options: RunOptions,
    ctx: LogContext,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a LoadedConfig, options: RunOptions, ctx: LogContext) -> Self {
        Reconciler {
            config,
            options,
            ctx,
        }
    }

    /// Reconcile every module of a snapshot directory.
    ///
    /// Only unreadable directories and invalid manifests are errors;
    /// malformed documents are reported and skipped.
    pub fn run_dir(&self, dir: &Path) -> Result<RunReport> {
        let deadline = self.deadline();
        let input = dir.display().to_string();
        log_event!(
            self.ctx,
            INFO,
            event_names::RUN_STARTED,
            Stage::Init,
            "reconcile started",
            input = input.as_str(),
            strict = self.options.strict,
            jobs = self.options.jobs
        );

        let manifest = Manifest::load(dir)?;
        if let Some(manifest) = &manifest {
            log_event!(
                self.ctx,
                INFO,
                event_names::MANIFEST_LOADED,
                Stage::Init,
                "module manifest loaded",
                modules = manifest.modules.len()
            );
        }

        let paths = discover(dir)?;
        let loaded = run_pool(&paths, self.options.jobs, |path| load_entry(path));

        let mut report = RunReport::new(
            self.ctx.run_id.clone(),
            input,
            self.config.fingerprint.clone(),
        );
        let mut parsed = Vec::new();
        for (path, result) in paths.iter().zip(loaded) {
            match result {
                Some(Ok(snapshot)) => parsed.push(snapshot),
                Some(Err(malformed)) => self.record_malformed(&mut report, malformed),
                None => {
                    let source = path.display().to_string();
                    let error = Error::MalformedSnapshot {
                        source_label: source.clone(),
                        message: "parser worker panicked".to_string(),
                    };
                    self.record_malformed(
                        &mut report,
                        MalformedInput {
                            source,
                            line: None,
                            block: None,
                            error: error.to_report(),
                        },
                    );
                }
            }
        }
        log_event!(
            self.ctx,
            INFO,
            event_names::PARSE_FINISHED,
            Stage::Load,
            "snapshots parsed",
            parsed = parsed.len(),
            malformed = report.malformed.len()
        );

        let inputs = match &manifest {
            Some(manifest) => self.manifest_modules(manifest, &parsed)?,
            None => vec![ModuleInput {
                name: directory_name(dir),
                pin: self.options.module.clone(),
                snapshots: parsed,
            }],
        };
        report.modules = self.reconcile_all(&inputs, deadline);
        self.finish(&report);
        Ok(report)
    }

    /// Reconcile in-memory documents as one module.
    ///
    /// `documents` holds `(label, contents)` pairs in snapshot order.
    pub fn run_buffers(&self, module: &str, documents: &[(String, String)]) -> RunReport {
        let deadline = self.deadline();
        let mut report = RunReport::new(
            self.ctx.run_id.clone(),
            module.to_string(),
            self.config.fingerprint.clone(),
        );

        let parsed = run_pool(documents, self.options.jobs, |(label, source)| {
            parse_entry(label, &[(label.clone(), source.clone())])
        });
        let mut snapshots = Vec::new();
        for ((label, _), result) in documents.iter().zip(parsed) {
            match result {
                Some(Ok(snapshot)) => snapshots.push(snapshot),
                Some(Err(malformed)) => self.record_malformed(&mut report, malformed),
                None => {
                    let error = Error::MalformedSnapshot {
                        source_label: label.clone(),
                        message: "parser worker panicked".to_string(),
                    };
                    self.record_malformed(
                        &mut report,
                        MalformedInput {
                            source: label.clone(),
                            line: None,
                            block: None,
                            error: error.to_report(),
                        },
                    );
                }
            }
        }

        let input = ModuleInput {
            name: module.to_string(),
            pin: self.options.module.clone(),
            snapshots,
        };
        report.modules = self.reconcile_all(std::slice::from_ref(&input), deadline);
        self.finish(&report);
        report
    }

    /// Detect, resolve, validate and render one module.
    pub fn reconcile_module(
        &self,
        name: &str,
        snapshots: Vec<Snapshot>,
        pin: Option<&str>,
    ) -> ModuleReport {
        let ctx = self.ctx.with_module(name);
        if snapshots.is_empty() {
            log_event!(
                ctx,
                WARN,
                event_names::MODULE_SKIPPED,
                Stage::Load,
                "module has no readable snapshots"
            );
            let mut report = ModuleReport::skipped(name, "no readable snapshots");
            report.pinned_namespace = pin.map(str::to_string);
            return report;
        }

        let kb = &self.config.knowledge_base;
        let policy = &self.config.policy;
        let store = SnapshotStore::from_snapshots(name, snapshots);
        let summaries = store
            .snapshots()
            .iter()
            .map(SnapshotSummary::from)
            .collect::<Vec<_>>();

        let options = DetectOptions {
            pinned_namespace: pin.map(str::to_string),
        };
        let mut conflicts = detect(store.snapshots(), kb, policy, &options);
        if self.options.strict {
            conflicts.iter_mut().for_each(|c| c.promote());
        }
        log_event!(
            ctx,
            INFO,
            event_names::DETECT_FINISHED,
            Stage::Detect,
            "conflicts detected",
            snapshots = store.len(),
            conflicts = conflicts.len()
        );

        let (conflicts, outcome) = match resolve(&store, &conflicts, kb, policy, pin) {
            Err(error) => {
                log_event!(
                    ctx,
                    WARN,
                    event_names::RESOLVE_UNRESOLVABLE,
                    Stage::Resolve,
                    "module is unresolvable",
                    field = error.field.as_str(),
                    reason = error.reason.as_str()
                );
                (conflicts, ModuleOutcome::Unresolvable { error })
            }
            Ok(resolution) => {
                log_event!(
                    ctx,
                    INFO,
                    event_names::RESOLVE_FINISHED,
                    Stage::Resolve,
                    "candidate resolved",
                    downgrades = resolution.config.downgrades().len()
                );
                let verdict = validate(&resolution.config, kb, policy);
                log_event!(
                    ctx,
                    INFO,
                    event_names::VALIDATE_FINISHED,
                    Stage::Validate,
                    "candidate validated",
                    accepted = verdict.accepted,
                    violations = verdict.diagnostics.len()
                );
                let document = render::gradle_kts(&resolution.config);
                let outcome = if verdict.accepted {
                    ModuleOutcome::Accepted {
                        config: resolution.config,
                        document,
                    }
                } else {
                    ModuleOutcome::Rejected {
                        config: resolution.config,
                        document,
                        diagnostics: verdict.diagnostics,
                    }
                };
                (resolution.conflicts, outcome)
            }
        };

        ModuleReport {
            name: name.to_string(),
            pinned_namespace: pin.map(str::to_string),
            snapshots: summaries,
            conflicts,
            errors: outcome.errors(name),
            outcome,
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.options.timeout.map(|t| Instant::now() + t)
    }

    fn manifest_modules(&self, manifest: &Manifest, parsed: &[Snapshot]) -> Result<Vec<ModuleInput>> {
        let specs = match &self.options.module {
            Some(name) => vec![manifest.module(name).ok_or_else(|| {
                Error::InvalidManifest(format!("no module named {} in {}", name, MANIFEST_FILE))
            })?],
            None => manifest.modules.iter().collect(),
        };

        for snapshot in parsed {
            let source = &snapshot.provenance.source;
            if !manifest.modules.iter().any(|m| m.matches(source)) {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::MODULE_SKIPPED,
                    Stage::Load,
                    "entry matches no module",
                    entry = source.as_str()
                );
            }
        }

        Ok(specs
            .into_iter()
            .map(|spec| ModuleInput {
                name: spec.name.clone(),
                pin: spec.namespace.clone(),
                snapshots: parsed
                    .iter()
                    .filter(|s| spec.matches(&s.provenance.source))
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    fn reconcile_all(&self, inputs: &[ModuleInput], deadline: Option<Instant>) -> Vec<ModuleReport> {
        let reports = run_pool(inputs, self.options.jobs, |input| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let ctx = self.ctx.with_module(&input.name);
                log_event!(
                    ctx,
                    WARN,
                    event_names::MODULE_SKIPPED,
                    Stage::Resolve,
                    "deadline passed before module started"
                );
                return ModuleReport::skipped(&input.name, "deadline passed before module started");
            }
            self.reconcile_module(&input.name, input.snapshots.clone(), input.pin.as_deref())
        });
        inputs
            .iter()
            .zip(reports)
            .map(|(input, report)| {
                report.unwrap_or_else(|| ModuleReport::skipped(&input.name, "worker panicked"))
            })
            .collect()
    }

    fn record_malformed(&self, report: &mut RunReport, malformed: MalformedInput) {
        log_event!(
            self.ctx,
            WARN,
            event_names::PARSE_MALFORMED,
            Stage::Load,
            "skipping malformed snapshot",
            source = malformed.source.as_str(),
            error = malformed.error.message.as_str()
        );
        report.malformed.push(malformed);
    }

    fn finish(&self, report: &RunReport) {
        let code = report.exit_code();
        log_event!(
            self.ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Report,
            "reconcile finished",
            modules = report.modules.len(),
            exit_code = code.as_i32()
        );
        if !code.is_success() {
            warn!(result = code.code_name(), "run did not reconcile cleanly");
        }
    }
}

fn directory_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;
    use crate::logging::generate_run_id;
    use rc_common::{ConflictKind, ConflictStatus};
    use rc_config::{load_config, ConfigPaths};
    use std::fs;

    const FIRST: &str = r#"// intent: first import
plugins {
    id("com.android.application") version "8.1.1"
    id("org.jetbrains.kotlin.android") version "1.8.22"
}

android {
    namespace = "com.nexa.madeeasy"
    compileSdk = 33
    defaultConfig {
        minSdk = 24
        targetSdk = 33
    }
}
"#;

    const SECOND: &str = r#"// intent: bump compileSdk
plugins {
    id("com.android.application") version "8.1.1"
    id("org.jetbrains.kotlin.android") version "1.8.22"
}

android {
    namespace = "com.nexa.madeeasy"
    compileSdk = 34
    defaultConfig {
        minSdk = 24
        targetSdk = 34
    }
}
"#;

    fn config() -> LoadedConfig {
        load_config(&ConfigPaths::default()).unwrap()
    }

    fn options() -> RunOptions {
        RunOptions {
            module: None,
            strict: false,
            jobs: 2,
            timeout: None,
        }
    }

    #[test]
    fn test_run_pool_keeps_order() {
        let items = (0..7).collect::<Vec<u32>>();
        for jobs in [0, 1, 3, 16] {
            let out = run_pool(&items, jobs, |n| n * 10);
            assert_eq!(
                out,
                items.iter().map(|n| Some(n * 10)).collect::<Vec<_>>(),
                "jobs={}",
                jobs
            );
        }
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("02-b.gradle.kts"), SECOND).unwrap();
        fs::write(dir.path().join("01-a.gradle.kts"), FIRST).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join(".hidden.gradle.kts"), FIRST).unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "").unwrap();
        fs::create_dir_all(dir.path().join("03-tree/app")).unwrap();
        fs::write(dir.path().join("03-tree/app/build.gradle.kts"), FIRST).unwrap();
        fs::create_dir(dir.path().join("04-empty")).unwrap();

        let names = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["01-a.gradle.kts", "02-b.gradle.kts", "03-tree"]);
    }

    #[test]
    fn test_read_directory_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("snap");
        fs::create_dir_all(root.join("app/build")).unwrap();
        fs::write(root.join("settings.gradle.kts"), "rootProject.name = \"x\"").unwrap();
        fs::write(root.join("app/build.gradle.kts"), FIRST).unwrap();
        fs::write(root.join("app/build/generated.gradle.kts"), "{").unwrap();

        let entry = read_entry(&root).unwrap();
        assert_eq!(entry.name, "snap");
        let paths = entry.files.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["app/build.gradle.kts", "settings.gradle.kts"]);
    }

    #[test]
    fn test_run_dir_latest_compile_sdk_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01-first.gradle.kts"), FIRST).unwrap();
        fs::write(dir.path().join("02-second.gradle.kts"), SECOND).unwrap();

        let config = config();
        let reconciler = Reconciler::new(&config, options(), LogContext::new(generate_run_id()));
        let report = reconciler.run_dir(dir.path()).unwrap();

        assert_eq!(report.exit_code(), ExitCode::Accepted);
        assert_eq!(report.modules.len(), 1);
        let module = &report.modules[0];
        assert_eq!(module.snapshots.len(), 2);
        assert_eq!(module.snapshots[1].intent.as_deref(), Some("bump compileSdk"));
        let resolved = module.outcome.config().unwrap();
        assert_eq!(resolved.compile_sdk.as_ref().unwrap().value, 34);
        assert!(module.outcome.document().unwrap().contains("compileSdk = 34"));
    }

    #[test]
    fn test_malformed_entry_is_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01-first.gradle.kts"), FIRST).unwrap();
        fs::write(dir.path().join("02-broken.gradle.kts"), "android {\n  compileSdk = 34\n").unwrap();

        let config = config();
        let reconciler = Reconciler::new(&config, options(), LogContext::new("run-test"));
        let report = reconciler.run_dir(dir.path()).unwrap();

        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.malformed[0].source, "02-broken.gradle.kts");
        assert_eq!(report.malformed[0].error.code, 10);
        assert_eq!(report.modules[0].snapshots.len(), 1);
        assert!(matches!(report.modules[0].outcome, ModuleOutcome::Accepted { .. }));
        assert_eq!(report.exit_code(), ExitCode::MalformedInput);
    }

    #[test]
    fn test_manifest_splits_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01-first.gradle.kts"), FIRST).unwrap();
        fs::write(
            dir.path().join("02-cashnet.gradle.kts"),
            FIRST.replace("com.nexa.madeeasy", "com.cashnet.app"),
        )
        .unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "[[modules]]\nname = \"madeeasy\"\nsnapshots = [\"01-*\"]\n\n[[modules]]\nname = \"cashnet\"\nsnapshots = [\"02-*\"]\nnamespace = \"com.cashnet.app\"\n",
        )
        .unwrap();

        let config = config();
        let reconciler = Reconciler::new(&config, options(), LogContext::new("run-test"));
        let report = reconciler.run_dir(dir.path()).unwrap();
        let names = report.modules.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["madeeasy", "cashnet"]);
        assert_eq!(report.modules[1].pinned_namespace.as_deref(), Some("com.cashnet.app"));
        assert_eq!(report.exit_code(), ExitCode::Accepted);

        let only = RunOptions {
            module: Some("cashnet".to_string()),
            ..options()
        };
        let reconciler = Reconciler::new(&config, only, LogContext::new("run-test"));
        let report = reconciler.run_dir(dir.path()).unwrap();
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules[0].name, "cashnet");

        let missing = RunOptions {
            module: Some("nope".to_string()),
            ..options()
        };
        let reconciler = Reconciler::new(&config, missing, LogContext::new("run-test"));
        assert_eq!(reconciler.run_dir(dir.path()).unwrap_err().code(), 23);
    }

    #[test]
    fn test_identity_drift_needs_pin() {
        let documents = vec![
            ("01".to_string(), FIRST.to_string()),
            ("02".to_string(), FIRST.replace("com.nexa.madeeasy", "com.cashnet.app")),
        ];
        let config = config();

        let reconciler = Reconciler::new(&config, options(), LogContext::new("run-test"));
        let report = reconciler.run_buffers("app", &documents);
        let module = &report.modules[0];
        assert!(matches!(module.outcome, ModuleOutcome::Unresolvable { .. }));
        assert!(module
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::IdentityDrift && c.is_blocking()));
        assert_eq!(report.exit_code(), ExitCode::Conflicts);

        let pinned = RunOptions {
            module: Some("com.nexa.madeeasy".to_string()),
            ..options()
        };
        let reconciler = Reconciler::new(&config, pinned, LogContext::new("run-test"));
        let report = reconciler.run_buffers("app", &documents);
        let module = &report.modules[0];
        let drift = module
            .conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::IdentityDrift)
            .unwrap();
        assert_eq!(drift.status, ConflictStatus::Pinned);
        let resolved = module.outcome.config().unwrap();
        assert_eq!(
            resolved.namespace.as_ref().unwrap().value,
            "com.nexa.madeeasy"
        );
    }

    #[test]
    fn test_duplicate_plugin_in_newest_snapshot_blocks() {
        let twice = format!("{}apply(plugin = \"kotlin-android\")\n", SECOND);
        let config = config();
        let reconciler = Reconciler::new(&config, options(), LogContext::new("run-test"));

        let report = reconciler.run_buffers(
            "app",
            &[
                ("01".to_string(), FIRST.to_string()),
                ("02".to_string(), twice.clone()),
            ],
        );
        let module = &report.modules[0];
        let duplicate = module
            .conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::DuplicatePluginApplication)
            .unwrap();
        assert_eq!(duplicate.snapshots, vec![2]);
        assert_eq!(duplicate.status, ConflictStatus::Open);
        assert_eq!(module.exit_code(), ExitCode::Conflicts);
        assert_eq!(report.exit_code(), ExitCode::Conflicts);

        let report = reconciler.run_buffers(
            "app",
            &[("01".to_string(), twice), ("02".to_string(), SECOND.to_string())],
        );
        let module = &report.modules[0];
        let duplicate = module
            .conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::DuplicatePluginApplication)
            .unwrap();
        assert_eq!(duplicate.status, ConflictStatus::Superseded);
        assert!(!duplicate.is_blocking());
    }

    #[test]
    fn test_bom_does_not_manage_buildscript_classpath() {
        let source = format!(
            "buildscript {{\n    dependencies {{\n        classpath(\"com.google.firebase:firebase-crashlytics-gradle:2.9.9\")\n    }}\n}}\n{}dependencies {{\n    implementation(platform(\"com.google.firebase:firebase-bom:32.7.0\"))\n    implementation(\"com.google.firebase:firebase-analytics\")\n}}\n",
            SECOND
        );
        let config = config();
        let reconciler = Reconciler::new(&config, options(), LogContext::new("run-test"));
        let report = reconciler.run_buffers("app", &[("01".to_string(), source)]);
        let module = &report.modules[0];
        assert_eq!(module.exit_code(), ExitCode::Accepted);
        let document = module.outcome.document().unwrap();
        assert!(document
            .contains("classpath(\"com.google.firebase:firebase-crashlytics-gradle:2.9.9\")"));
        assert!(!document.contains("classpath(\"com.google.firebase:firebase-crashlytics-gradle\")"));
    }

    #[test]
    fn test_expired_deadline_skips_modules() {
        let config = config();
        let opts = RunOptions {
            timeout: Some(Duration::ZERO),
            ..options()
        };
        let reconciler = Reconciler::new(&config, opts, LogContext::new("run-test"));
        let report = reconciler.run_buffers("app", &[("01".to_string(), FIRST.to_string())]);
        assert!(matches!(
            report.modules[0].outcome,
            ModuleOutcome::Skipped { .. }
        ));
        assert_eq!(report.exit_code(), ExitCode::Conflicts);
    }

    #[test]
    fn test_strict_promotes_warnings() {
        let with_bom = r#"
plugins {
    id("com.android.application") version "8.1.1"
}
android {
    namespace = "com.nexa.madeeasy"
    compileSdk = 34
    defaultConfig { minSdk = 24 }
}
dependencies {
    implementation(platform("com.google.firebase:firebase-bom:32.7.0"))
    implementation("com.google.firebase:firebase-auth-ktx:22.3.0") // override: needs newer auth
}
"#;
        let documents = vec![("01".to_string(), with_bom.to_string())];
        let config = config();

        let relaxed = Reconciler::new(&config, options(), LogContext::new("run-test"));
        let report = relaxed.run_buffers("app", &documents);
        assert!(report.modules[0]
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::BomOverride && !c.is_blocking()));

        let strict = Reconciler::new(
            &config,
            RunOptions {
                strict: true,
                ..options()
            },
            LogContext::new("run-test"),
        );
        let report = strict.run_buffers("app", &documents);
        assert!(report.modules[0]
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::BomOverride && c.is_blocking()));
        assert_eq!(report.exit_code(), ExitCode::Conflicts);
    }
}
