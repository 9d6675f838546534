//! Conflict detection over a snapshot sequence.
//!
//! Passes run in a fixed order (identity, plugins, toolchain versions, SDK
//! ordering, desugaring, BOM families) and every finding is returned; the
//! detector never decides anything. Value-based checks are evaluated at
//! every prefix of the sequence against the latest value each field has
//! reached so far, so appending a snapshot can only add findings. The one
//! exception is `unapplied_plugin`: a later snapshot applying the plugin
//! clears it.

use rc_common::{
    Conflict, ConflictKind, ConflictStatus, Coordinate, DependencyScope, ModuleConfig,
    PluginDeclaration, PluginOrigin, Severity, Snapshot, ToolchainAxis, Version,
};
use rc_config::{Compatibility, KnowledgeBase, Policy};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Caller decisions that change how findings are reported.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Namespace the caller asserted for this module.
    pub pinned_namespace: Option<String>,
}

/// Detect every conflict in `snapshots` (ordered, ordinals assigned).
///
/// Conflicts come back grouped by kind in reporting precedence; within a
/// kind they keep pass order.
pub fn detect(
    snapshots: &[Snapshot],
    kb: &KnowledgeBase,
    policy: &Policy,
    options: &DetectOptions,
) -> Vec<Conflict> {
    let states = cumulative_states(snapshots, policy);
    let mut out = Vec::new();

    identity_drift(snapshots, options, &mut out);
    plugin_conflicts(snapshots, &mut out);
    toolchain_conflicts(snapshots, &states, kb, &mut out);
    ordering_conflicts(&states, &mut out);
    desugaring_conflicts(&states, policy, &mut out);
    bom_conflicts(snapshots, policy, &mut out);
    out.sort_by_key(|c| c.kind);

    debug!(
        snapshots = snapshots.len(),
        conflicts = out.len(),
        errors = out.iter().filter(|c| c.severity == Severity::Error).count(),
        "detection finished"
    );
    out
}

/// Findings deduplicated by kind, fields and values; ordinals are merged.
#[derive(Default)]
struct Findings {
    items: Vec<Conflict>,
}

impl Findings {
    fn add(&mut self, conflict: Conflict) {
        let existing = self.items.iter_mut().find(|c| {
            c.kind == conflict.kind && c.fields == conflict.fields && c.values == conflict.values
        });
        match existing {
            Some(existing) => {
                existing.snapshots.extend(conflict.snapshots);
                existing.snapshots.sort_unstable();
                existing.snapshots.dedup();
            }
            None => self.items.push(conflict),
        }
    }

    fn drain_into(self, out: &mut Vec<Conflict>) {
        out.extend(self.items);
    }
}

/// Latest value of each checked field after a snapshot, with the ordinal
/// that set it.
#[derive(Debug, Clone, Default)]
struct Cumulative<'a> {
    axes: BTreeMap<ToolchainAxis, (&'a Version, usize)>,
    compile_sdk: Option<(u32, usize)>,
    target_sdk: Option<(u32, usize)>,
    min_sdk: Option<(u32, usize)>,
    desugaring: Option<(bool, usize)>,
    /// Whether any snapshot so far declares the desugaring library.
    desugaring_library: bool,
}

fn cumulative_states<'a>(snapshots: &'a [Snapshot], policy: &Policy) -> Vec<Cumulative<'a>> {
    let mut state = Cumulative::default();
    let mut states = Vec::with_capacity(snapshots.len());
    for s in snapshots {
        for (axis, v) in &s.toolchain {
            state.axes.insert(*axis, (v, s.index));
        }
        let m = &s.module;
        let at = |v: Option<u32>| v.map(|v| (v, s.index));
        state.compile_sdk = at(m.compile_sdk).or(state.compile_sdk);
        state.target_sdk = at(m.target_sdk).or(state.target_sdk);
        state.min_sdk = at(m.min_sdk).or(state.min_sdk);
        state.desugaring = m.desugaring.map(|v| (v, s.index)).or(state.desugaring);
        state.desugaring_library |= s
            .dependencies
            .iter()
            .any(|d| policy.is_desugaring_library(&d.coordinate));
        states.push(state.clone());
    }
    states
}

fn ordinal_list(ordinals: &[usize]) -> String {
    ordinals
        .iter()
        .map(|i| format!("#{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---- identity -------------------------------------------------------------

type IdentityField = fn(&ModuleConfig) -> Option<&str>;

fn namespace_of(m: &ModuleConfig) -> Option<&str> {
    m.namespace.as_deref()
}

fn application_id_of(m: &ModuleConfig) -> Option<&str> {
    m.application_id.as_deref()
}

/// Distinct values in order of first appearance, with every ordinal.
fn distinct_values(snapshots: &[Snapshot], field: IdentityField) -> Vec<(&str, Vec<usize>)> {
    let mut values: Vec<(&str, Vec<usize>)> = Vec::new();
    for s in snapshots {
        let Some(value) = field(&s.module) else {
            continue;
        };
        match values.iter_mut().find(|(v, _)| *v == value) {
            Some((_, ordinals)) => ordinals.push(s.index),
            None => values.push((value, vec![s.index])),
        }
    }
    values
}

fn identity_drift(snapshots: &[Snapshot], options: &DetectOptions, out: &mut Vec<Conflict>) {
    let fields: [(&str, IdentityField); 2] = [
        ("namespace", namespace_of),
        ("application_id", application_id_of),
    ];

    for (field, value_of) in fields {
        let values = distinct_values(snapshots, value_of);
        if values.len() < 2 {
            continue;
        }
        let listing = values
            .iter()
            .map(|(v, ordinals)| format!("\"{}\" in {}", v, ordinal_list(ordinals)))
            .collect::<Vec<_>>()
            .join(", ");
        let ordinals = values.iter().flat_map(|(_, o)| o.iter().copied());
        let names = values.iter().map(|(v, _)| v.to_string());

        let conflict = if field == "namespace" {
            let base = Conflict::new(
                ConflictKind::IdentityDrift,
                Severity::Error,
                format!("namespace differs across snapshots: {}", listing),
            )
            .with_snapshots(ordinals)
            .with_fields([field])
            .with_values(names);
            match &options.pinned_namespace {
                Some(pin) => {
                    let mut c = base.with_remediation(format!("namespace pinned to \"{}\"", pin));
                    c.severity = Severity::Warning;
                    c.status = ConflictStatus::Pinned;
                    c
                }
                None => base.with_remediation(
                    "split the snapshots into separate modules in reconcile.toml, \
                     or pin the namespace with --module <namespace>",
                ),
            }
        } else {
            Conflict::new(
                ConflictKind::IdentityDrift,
                Severity::Warning,
                format!("applicationId differs across snapshots: {}", listing),
            )
            .with_snapshots(ordinals)
            .with_fields([field])
            .with_values(names)
            .with_remediation("confirm the latest applicationId is intended")
        };
        out.push(conflict);
    }
}

// ---- plugins --------------------------------------------------------------

fn plugin_conflicts(snapshots: &[Snapshot], out: &mut Vec<Conflict>) {
    let mut by_id: BTreeMap<&str, Vec<(usize, &PluginDeclaration)>> = BTreeMap::new();
    for s in snapshots {
        for p in &s.plugins {
            by_id.entry(p.id.as_str()).or_default().push((s.index, p));
        }
    }

    for (id, decls) in &by_id {
        // Duplicate application inside one snapshot's build graph.
        let mut duplicated = Vec::new();
        let mut details = Vec::new();
        for s in snapshots {
            let applied: Vec<_> = s.plugin_declarations(id).filter(|p| p.is_applied()).collect();
            if applied.len() > 1 {
                duplicated.push(s.index);
                let origins = applied
                    .iter()
                    .map(|p| p.origin.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                details.push(format!("{} times in #{} ({})", applied.len(), s.index, origins));
            }
        }
        if !duplicated.is_empty() {
            out.push(
                Conflict::new(
                    ConflictKind::DuplicatePluginApplication,
                    Severity::Error,
                    format!("plugin {} is applied {}", id, details.join("; ")),
                )
                .with_snapshots(duplicated)
                .with_fields(["plugins"])
                .with_values([*id])
                .with_remediation("apply it once; declare other occurrences with `apply false`"),
            );
        }

        let ordinals = decls.iter().map(|(i, _)| *i).collect::<Vec<_>>();
        if decls.iter().all(|(_, p)| !p.is_applied()) {
            let mut unique = ordinals.clone();
            unique.dedup();
            out.push(
                Conflict::new(
                    ConflictKind::UnappliedPlugin,
                    Severity::Warning,
                    format!(
                        "plugin {} is declared in {} but never applied",
                        id,
                        ordinal_list(&unique)
                    ),
                )
                .with_snapshots(ordinals.iter().copied())
                .with_fields(["plugins"])
                .with_values([*id])
                .with_remediation("apply it in the module's plugins block or drop the declaration"),
            );
        }

        let origins = decls.iter().map(|(_, p)| p.origin).collect::<BTreeSet<_>>();
        if origins.len() > 1 {
            let through = |origin: PluginOrigin| {
                let mut at = decls
                    .iter()
                    .filter(|(_, p)| p.origin == origin)
                    .map(|(i, _)| *i)
                    .collect::<Vec<_>>();
                at.dedup();
                ordinal_list(&at)
            };
            out.push(
                Conflict::new(
                    ConflictKind::RedundantDeclaration,
                    Severity::Info,
                    format!(
                        "plugin {} is declared through both the plugin DSL ({}) and the legacy classpath ({})",
                        id,
                        through(PluginOrigin::PluginDsl),
                        through(PluginOrigin::Legacy)
                    ),
                )
                .with_snapshots(ordinals)
                .with_fields(["plugins"])
                .with_values([*id])
                .with_remediation("declare it only in the plugins block"),
            );
        }
    }
}

// ---- toolchain ------------------------------------------------------------

fn toolchain_conflicts(
    snapshots: &[Snapshot],
    states: &[Cumulative<'_>],
    kb: &KnowledgeBase,
    out: &mut Vec<Conflict>,
) {
    let mut findings = Findings::default();

    for (snapshot, state) in snapshots.iter().zip(states) {
        for (i, &a) in ToolchainAxis::ALL.iter().enumerate() {
            for &b in &ToolchainAxis::ALL[i + 1..] {
                if !kb.relates(a, b) {
                    continue;
                }
                let (Some(&(va, sa)), Some(&(vb, sb))) = (state.axes.get(&a), state.axes.get(&b))
                else {
                    continue;
                };
                match kb.is_compatible(a, va, b, vb) {
                    Compatibility::Compatible => {}
                    Compatibility::Incompatible => {
                        findings.add(incompatible_axes(kb, (a, va, sa), (b, vb, sb)));
                    }
                    Compatibility::Unknown => findings.add(
                        Conflict::new(
                            ConflictKind::UnknownCompatibility,
                            Severity::Warning,
                            format!(
                                "no compatibility rule covers {} {} (#{}) with {} {} (#{})",
                                a, va, sa, b, vb, sb
                            ),
                        )
                        .with_snapshots([sa, sb])
                        .with_fields([a.as_str(), b.as_str()])
                        .with_values([va.to_string(), vb.to_string()])
                        .with_remediation("verify the pair manually or extend compat.json"),
                    ),
                }
            }
        }

        if let (Some((sdk, ss)), Some(&(bt, sb))) =
            (state.compile_sdk, state.axes.get(&ToolchainAxis::BuildTool))
        {
            if let Some(max) = kb.max_compile_sdk(bt).filter(|max| sdk > *max) {
                findings.add(
                    Conflict::new(
                        ConflictKind::VersionIncompatibility,
                        Severity::Warning,
                        format!(
                            "compileSdk {} (#{}) is above the highest level build_tool {} (#{}) was tested with ({})",
                            sdk, ss, bt, sb, max
                        ),
                    )
                    .with_snapshots([ss, sb])
                    .with_fields(["compile_sdk", "build_tool"])
                    .with_values([sdk.to_string(), bt.to_string()])
                    .with_remediation(format!(
                        "upgrade build_tool or keep compileSdk at {}",
                        max
                    )),
                );
            }
        }

        let m = &snapshot.module;
        if let (Some(java), Some(jvm)) = (&m.java_level, &m.jvm_target) {
            if java != jvm {
                findings.add(
                    Conflict::new(
                        ConflictKind::VersionIncompatibility,
                        Severity::Error,
                        format!(
                            "Java compatibility {} and Kotlin jvmTarget {} disagree in #{}",
                            java, jvm, snapshot.index
                        ),
                    )
                    .with_snapshots([snapshot.index])
                    .with_fields(["java_level", "jvm_target"])
                    .with_values([java.to_string(), jvm.to_string()])
                    .with_remediation("use the same JVM level for Java and Kotlin"),
                );
            }
        }
    }

    findings.drain_into(out);
}

/// Incompatible axis pair; the side set most recently is the one to change.
fn incompatible_axes(
    kb: &KnowledgeBase,
    (a, va, sa): (ToolchainAxis, &Version, usize),
    (b, vb, sb): (ToolchainAxis, &Version, usize),
) -> Conflict {
    let ((new_axis, new_v, new_s), (old_axis, old_v, old_s)) = if sa > sb {
        ((a, va, sa), (b, vb, sb))
    } else {
        ((b, vb, sb), (a, va, sa))
    };

    let mut message = format!(
        "{} {} (#{}) is incompatible with {} {} (#{})",
        new_axis, new_v, new_s, old_axis, old_v, old_s
    );
    let notes = kb.violated_notes(a, va, b, vb);
    if !notes.is_empty() {
        message.push_str(": ");
        message.push_str(&notes.join("; "));
    }

    let suggestions = kb.suggest_compatible(old_axis, old_v, new_axis);
    let remediation = match suggestions.first() {
        Some(best) => format!(
            "use {} {} (compatible: {})",
            new_axis,
            best,
            suggestions
                .iter()
                .take(3)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => format!(
            "no known {} release is compatible with {} {}; change {}",
            new_axis, old_axis, old_v, old_axis
        ),
    };

    Conflict::new(ConflictKind::VersionIncompatibility, Severity::Error, message)
        .with_snapshots([sa, sb])
        .with_fields([a.as_str(), b.as_str()])
        .with_values([va.to_string(), vb.to_string()])
        .with_remediation(remediation)
}

// ---- module ---------------------------------------------------------------

fn ordering_conflicts(states: &[Cumulative<'_>], out: &mut Vec<Conflict>) {
    let mut findings = Findings::default();
    let show = |v: Option<(u32, usize)>| v.map_or("-".to_string(), |(v, _)| v.to_string());

    for state in states {
        let mut problems = Vec::new();
        let bound_for_min = state.target_sdk.or(state.compile_sdk);
        if let (Some((min, sm)), Some((bound, sb))) = (state.min_sdk, bound_for_min) {
            if min > bound {
                let name = if state.target_sdk.is_some() {
                    "targetSdk"
                } else {
                    "compileSdk"
                };
                problems.push(format!("minSdk {} (#{}) > {} {} (#{})", min, sm, name, bound, sb));
            }
        }
        if let (Some((target, st)), Some((compile, sc))) = (state.target_sdk, state.compile_sdk) {
            if target > compile {
                problems.push(format!(
                    "targetSdk {} (#{}) > compileSdk {} (#{})",
                    target, st, compile, sc
                ));
            }
        }
        if problems.is_empty() {
            continue;
        }

        let ordinals = [state.min_sdk, state.target_sdk, state.compile_sdk]
            .into_iter()
            .flatten()
            .map(|(_, i)| i);
        findings.add(
            Conflict::new(
                ConflictKind::InvalidOrdering,
                Severity::Error,
                format!(
                    "SDK levels violate minSdk <= targetSdk <= compileSdk: {}",
                    problems.join(", ")
                ),
            )
            .with_snapshots(ordinals)
            .with_fields(["min_sdk", "target_sdk", "compile_sdk"])
            .with_values([
                show(state.min_sdk),
                show(state.target_sdk),
                show(state.compile_sdk),
            ])
            .with_remediation("raise compileSdk/targetSdk or lower minSdk"),
        );
    }

    findings.drain_into(out);
}

fn desugaring_conflicts(states: &[Cumulative<'_>], policy: &Policy, out: &mut Vec<Conflict>) {
    let mut findings = Findings::default();
    let library = &policy.desugaring.library;

    for state in states {
        if let Some((min, sm)) = state.min_sdk {
            if let Some(req) = policy.desugaring_requirement(min) {
                if state.desugaring.is_none() {
                    findings.add(
                        Conflict::new(
                            ConflictKind::MissingDesugaring,
                            Severity::Warning,
                            format!(
                                "minSdk {} (#{}) is below {} and no snapshot sets core library desugaring: {}",
                                min, sm, req.min_sdk_below, req.reason
                            ),
                        )
                        .with_snapshots([sm])
                        .with_fields(["desugaring"])
                        .with_values([min.to_string()])
                        .with_remediation(format!(
                            "set isCoreLibraryDesugaringEnabled = true and add coreLibraryDesugaring(\"{}:<version>\")",
                            library
                        )),
                    );
                }
            }
        }

        if let Some((true, sd)) = state.desugaring {
            if !state.desugaring_library {
                findings.add(
                    Conflict::new(
                        ConflictKind::MissingDesugaring,
                        Severity::Warning,
                        format!(
                            "core library desugaring is enabled (#{}) but {} is not declared",
                            sd, library
                        ),
                    )
                    .with_snapshots([sd])
                    .with_fields(["desugaring".to_string(), library.to_string()])
                    .with_values(["true"])
                    .with_remediation(format!(
                        "add coreLibraryDesugaring(\"{}:<version>\")",
                        library
                    )),
                );
            }
        }
    }

    findings.drain_into(out);
}

// ---- dependencies ---------------------------------------------------------

fn bom_conflicts(snapshots: &[Snapshot], policy: &Policy, out: &mut Vec<Conflict>) {
    let mut overrides = Findings::default();
    let mut versions = Findings::default();

    for family in &policy.bom_families {
        let bom_ordinals = snapshots
            .iter()
            .filter(|s| s.dependencies.iter().any(|d| family.is_bom(&d.coordinate)))
            .map(|s| s.index)
            .collect::<Vec<_>>();
        if bom_ordinals.is_empty() {
            continue;
        }
        let is_member = |c: &Coordinate| {
            policy
                .family_of_member(c)
                .is_some_and(|f| f.name == family.name)
        };

        // Last explicit version of each member per snapshot, in order.
        let mut history: BTreeMap<&Coordinate, Vec<(usize, &str)>> = BTreeMap::new();

        for s in snapshots {
            let mut in_snapshot: BTreeMap<&Coordinate, BTreeSet<&str>> = BTreeMap::new();
            for d in &s.dependencies {
                if d.platform || d.scope != DependencyScope::Implementation || !is_member(&d.coordinate)
                {
                    continue;
                }
                let Some(version) = d.version.explicit() else {
                    continue;
                };
                in_snapshot.entry(&d.coordinate).or_default().insert(version);

                let mut message = format!(
                    "{} pins {} explicitly in #{} while {} manages the {} family ({})",
                    d.coordinate,
                    version,
                    s.index,
                    family.bom,
                    family.name,
                    ordinal_list(&bom_ordinals)
                );
                let mut conflict = if d.is_override {
                    message.push_str("; marked override");
                    Conflict::new(ConflictKind::BomOverride, Severity::Warning, message)
                } else {
                    Conflict::new(ConflictKind::BomOverride, Severity::Warning, message)
                        .with_remediation(
                            "drop the explicit version, or mark the line `// override`",
                        )
                };
                conflict = conflict
                    .with_snapshots([s.index])
                    .with_fields([d.coordinate.to_string()])
                    .with_values([version]);
                overrides.add(conflict);

                let entries = history.entry(&d.coordinate).or_default();
                match entries.last_mut() {
                    Some((at, v)) if *at == s.index => *v = version,
                    _ => entries.push((s.index, version)),
                }
            }

            for (coordinate, distinct) in in_snapshot.iter().filter(|(_, v)| v.len() > 1) {
                versions.add(
                    Conflict::new(
                        ConflictKind::VersionIncompatibility,
                        Severity::Error,
                        format!(
                            "{} is declared with different versions in #{}: {}",
                            coordinate,
                            s.index,
                            distinct.iter().copied().collect::<Vec<_>>().join(", ")
                        ),
                    )
                    .with_snapshots([s.index])
                    .with_fields([coordinate.to_string()])
                    .with_values(distinct.iter().copied())
                    .with_remediation(format!("let {} manage the version", family.bom)),
                );
            }
        }

        for (coordinate, entries) in &history {
            for pair in entries.windows(2) {
                let ((s1, v1), (s2, v2)) = (pair[0], pair[1]);
                if v1 == v2 {
                    continue;
                }
                versions.add(
                    Conflict::new(
                        ConflictKind::VersionIncompatibility,
                        Severity::Error,
                        format!(
                            "{} changes from {} (#{}) to {} (#{}) under {}",
                            coordinate, v1, s1, v2, s2, family.bom
                        ),
                    )
                    .with_snapshots([s1, s2])
                    .with_fields([coordinate.to_string()])
                    .with_values([v1, v2])
                    .with_remediation(format!("let {} manage the version", family.bom)),
                );
            }
        }
    }

    overrides.drain_into(out);
    versions.drain_into(out);
}
