//! Deterministic merge of a snapshot sequence into one candidate.
//!
//! Fields are locked in a fixed order: toolchain axes (build tool, JDK,
//! language compiler, dependency-management plugin), SDK levels, identity
//! and the remaining scalars, then plugins and dependencies. The latest
//! snapshot setting a field wins unless its value contradicts something
//! already locked; then candidates are walked back newest-first and the
//! chosen value records what it was downgraded from.

use crate::logging::event_names;
use crate::store::SnapshotStore;
use rc_common::{
    Conflict, ConflictKind, ConflictStatus, Coordinate, DependencyScope, ModuleConfig, Snapshot,
    ToolchainAxis, Version, VersionSpec,
};
use rc_config::{Compatibility, KnowledgeBase, Policy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Why a resolved field has its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Reason {
    LatestWins,
    /// Walked back from the newest candidate, which contradicted a locked field.
    DowngradedFrom { from: String },
    Pinned,
    /// Follows another locked field.
    Derived,
    BomManaged,
    Override,
}

impl Reason {
    pub fn is_downgrade(&self) -> bool {
        matches!(self, Reason::DowngradedFrom { .. })
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::LatestWins => write!(f, "latest wins"),
            Reason::DowngradedFrom { from } => write!(f, "downgraded from {}", from),
            Reason::Pinned => write!(f, "pinned"),
            Reason::Derived => write!(f, "derived"),
            Reason::BomManaged => write!(f, "BOM managed"),
            Reason::Override => write!(f, "override"),
        }
    }
}

/// A resolved value with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub value: T,
    /// Ordinals of the snapshots that contributed the value.
    pub snapshots: Vec<usize>,
    #[serde(flatten)]
    pub reason: Reason,
}

impl<T> Resolved<T> {
    fn new(value: T, snapshots: Vec<usize>, reason: Reason) -> Self {
        Resolved {
            value,
            snapshots,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlugin {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    pub snapshots: Vec<usize>,
    #[serde(flatten)]
    pub reason: Reason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub configuration: String,
    pub scope: DependencyScope,
    pub coordinate: Coordinate,
    pub version: VersionSpec,
    #[serde(default)]
    pub platform: bool,
    #[serde(default)]
    pub is_override: bool,
    pub snapshots: Vec<usize>,
    #[serde(flatten)]
    pub reason: Reason,
}

/// The merged candidate configuration of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub module: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub toolchain: BTreeMap<ToolchainAxis, Resolved<Version>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Resolved<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Resolved<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_sdk: Option<Resolved<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sdk: Option<Resolved<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sdk: Option<Resolved<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_level: Option<Resolved<Version>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<Resolved<Version>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_toolchain: Option<Resolved<Version>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<Resolved<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multidex: Option<Resolved<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desugaring: Option<Resolved<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<Resolved<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_excludes: Option<Resolved<BTreeSet<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<Resolved<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<Resolved<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<Resolved<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrink_resources: Option<Resolved<bool>>,
    pub plugins: Vec<ResolvedPlugin>,
    pub dependencies: Vec<ResolvedDependency>,
}

fn value<T: Clone>(field: &Option<Resolved<T>>) -> Option<T> {
    field.as_ref().map(|r| r.value.clone())
}

impl ResolvedConfig {
    /// The module fields without provenance.
    pub fn module_config(&self) -> ModuleConfig {
        ModuleConfig {
            namespace: value(&self.namespace),
            application_id: value(&self.application_id),
            compile_sdk: value(&self.compile_sdk),
            min_sdk: value(&self.min_sdk),
            target_sdk: value(&self.target_sdk),
            java_level: value(&self.java_level),
            jvm_target: value(&self.jvm_target),
            jvm_toolchain: value(&self.jvm_toolchain),
            build_dir: value(&self.build_dir),
            multidex: value(&self.multidex),
            desugaring: value(&self.desugaring),
            signing_config: value(&self.signing_config),
            resource_excludes: value(&self.resource_excludes),
            version_code: value(&self.version_code),
            version_name: value(&self.version_name),
            minify: value(&self.minify),
            shrink_resources: value(&self.shrink_resources),
        }
    }

    pub fn axis(&self, axis: ToolchainAxis) -> Option<&Version> {
        self.toolchain.get(&axis).map(|r| &r.value)
    }

    pub fn dependency(&self, coordinate: &Coordinate) -> Option<&ResolvedDependency> {
        self.dependencies
            .iter()
            .find(|d| d.coordinate == *coordinate && !d.platform)
    }

    /// Every field that was walked back, as `(field, from, to)`.
    pub fn downgrades(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for (axis, r) in &self.toolchain {
            if let Reason::DowngradedFrom { from } = &r.reason {
                out.push((axis.to_string(), from.clone(), r.value.to_string()));
            }
        }
        for (name, r) in [
            ("target_sdk", &self.target_sdk),
            ("min_sdk", &self.min_sdk),
        ] {
            if let Some(Resolved {
                value,
                reason: Reason::DowngradedFrom { from },
                ..
            }) = r
            {
                out.push((name.to_string(), from.clone(), value.to_string()));
            }
        }
        out
    }
}

/// A candidate rejected while walking back a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejected {
    pub value: String,
    pub snapshot: usize,
    pub because: String,
}

/// No candidate satisfies the locked constraints. Terminal for the module.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("cannot resolve {field} for module {module}: {reason}")]
pub struct UnresolvableConfig {
    pub module: String,
    pub field: String,
    pub reason: String,
    /// Already-locked fields the candidates were checked against.
    pub constraints: Vec<String>,
    pub rejected: Vec<Rejected>,
}

impl From<UnresolvableConfig> for rc_common::Error {
    fn from(e: UnresolvableConfig) -> Self {
        rc_common::Error::Unresolvable {
            reason: format!("{}: {}", e.field, e.reason),
            module: e.module,
        }
    }
}

/// Resolved candidate plus the detector's conflicts with settled status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub conflicts: Vec<Conflict>,
}

/// Resolve the store into one candidate configuration.
///
/// `pin` is the namespace the caller chose for the module, if any.
pub fn resolve(
    store: &SnapshotStore,
    conflicts: &[Conflict],
    kb: &KnowledgeBase,
    policy: &Policy,
    pin: Option<&str>,
) -> Result<Resolution, UnresolvableConfig> {
    let module = store.module();
    let mut config = ResolvedConfig {
        module: module.to_string(),
        ..ResolvedConfig::default()
    };

    for axis in ToolchainAxis::ALL {
        let locked = &config.toolchain;
        let constraints = locked
            .iter()
            .map(|(a, r)| format!("{} = {}", a, r.value))
            .collect();
        let resolved = walk_back(
            store,
            axis.as_str(),
            |s| s.axis(axis).cloned(),
            |candidate| {
                let against = locked
                    .iter()
                    .filter(|(a, r)| {
                        kb.is_compatible(**a, &r.value, axis, candidate)
                            == Compatibility::Incompatible
                    })
                    .map(|(a, r)| format!("{} {}", a, r.value))
                    .collect::<Vec<_>>();
                if against.is_empty() {
                    Ok(())
                } else {
                    Err(format!("incompatible with {}", against.join(", ")))
                }
            },
            constraints,
        )?;
        if let Some(resolved) = resolved {
            debug!(
                event = event_names::RESOLVE_LOCKED,
                module,
                axis = %axis,
                value = %resolved.value,
                "axis locked"
            );
            config.toolchain.insert(axis, resolved);
        }
    }

    config.compile_sdk = latest(store, |s| s.module.compile_sdk);
    let compile = value(&config.compile_sdk);
    config.target_sdk = walk_back(
        store,
        "target_sdk",
        |s| s.module.target_sdk,
        |t| match compile {
            Some(c) if *t > c => Err(format!("above compile_sdk {}", c)),
            _ => Ok(()),
        },
        compile.map(|c| format!("compile_sdk = {}", c)).into_iter().collect(),
    )?;
    let ceiling = value(&config.target_sdk)
        .map(|t| ("target_sdk", t))
        .or(compile.map(|c| ("compile_sdk", c)));
    config.min_sdk = walk_back(
        store,
        "min_sdk",
        |s| s.module.min_sdk,
        |m| match ceiling {
            Some((name, bound)) if *m > bound => Err(format!("above {} {}", name, bound)),
            _ => Ok(()),
        },
        ceiling
            .map(|(name, bound)| format!("{} = {}", name, bound))
            .into_iter()
            .collect(),
    )?;

    config.namespace = resolve_namespace(store, pin)?;
    config.application_id = latest(store, |s| s.module.application_id.clone());

    let jdk = config.toolchain.get(&ToolchainAxis::Jdk).cloned();
    config.java_level = follow_jdk(store, jdk.as_ref(), |m| m.java_level.as_ref());
    config.jvm_target = follow_jdk(store, jdk.as_ref(), |m| m.jvm_target.as_ref());
    config.jvm_toolchain = follow_jdk(store, jdk.as_ref(), |m| m.jvm_toolchain.as_ref());

    config.build_dir = latest(store, |s| s.module.build_dir.clone());
    config.multidex = latest(store, |s| s.module.multidex);
    config.desugaring = latest(store, |s| s.module.desugaring);
    config.signing_config = latest(store, |s| s.module.signing_config.clone());
    config.resource_excludes = latest(store, |s| s.module.resource_excludes.clone());
    config.version_code = latest(store, |s| s.module.version_code);
    config.version_name = latest(store, |s| s.module.version_name.clone());
    config.minify = latest(store, |s| s.module.minify);
    config.shrink_resources = latest(store, |s| s.module.shrink_resources);

    config.plugins = resolve_plugins(store, &config.toolchain);
    config.dependencies = resolve_dependencies(store, policy);

    for (field, from, to) in config.downgrades() {
        info!(
            event = event_names::RESOLVE_DOWNGRADED,
            module,
            field = %field,
            from = %from,
            to = %to,
            "newest value contradicts a locked field; walked back"
        );
    }

    let conflicts = conflicts
        .iter()
        .map(|c| {
            let mut c = c.clone();
            c.status = settle(&c, &config, store, policy);
            c
        })
        .collect();

    Ok(Resolution { config, conflicts })
}

/// Newest value of a field with every ordinal that set that value.
fn latest<T, F>(store: &SnapshotStore, field: F) -> Option<Resolved<T>>
where
    T: PartialEq,
    F: Fn(&Snapshot) -> Option<T>,
{
    let (_, value) = store.latest(&field)?;
    let snapshots = store.ordinals_with(&field, &value);
    Some(Resolved::new(value, snapshots, Reason::LatestWins))
}

/// Newest candidate accepted by `check`, recording a downgrade when the
/// newest value was rejected.
fn walk_back<T, F, C>(
    store: &SnapshotStore,
    field: &str,
    values: F,
    check: C,
    constraints: Vec<String>,
) -> Result<Option<Resolved<T>>, UnresolvableConfig>
where
    T: Clone + PartialEq + fmt::Display,
    F: Fn(&Snapshot) -> Option<T>,
    C: Fn(&T) -> Result<(), String>,
{
    let candidates = store.newest_first(&values);
    let Some((_, newest)) = candidates.first() else {
        return Ok(None);
    };

    let mut rejected: Vec<Rejected> = Vec::new();
    for (ordinal, candidate) in &candidates {
        let shown = candidate.to_string();
        if rejected.iter().any(|r| r.value == shown) {
            continue;
        }
        match check(candidate) {
            Ok(()) => {
                let reason = if candidate == newest {
                    Reason::LatestWins
                } else {
                    Reason::DowngradedFrom {
                        from: newest.to_string(),
                    }
                };
                let snapshots = store.ordinals_with(&values, candidate);
                return Ok(Some(Resolved::new(candidate.clone(), snapshots, reason)));
            }
            Err(because) => rejected.push(Rejected {
                value: shown,
                snapshot: *ordinal,
                because,
            }),
        }
    }

    let module = store.module().to_string();
    info!(
        event = event_names::RESOLVE_UNRESOLVABLE,
        module = %module,
        field,
        rejected = rejected.len(),
        "no candidate satisfies the locked constraints"
    );
    Err(UnresolvableConfig {
        module,
        field: field.to_string(),
        reason: format!("every {} candidate contradicts a locked field", field),
        constraints,
        rejected,
    })
}

fn resolve_namespace(
    store: &SnapshotStore,
    pin: Option<&str>,
) -> Result<Option<Resolved<String>>, UnresolvableConfig> {
    let namespace = |s: &Snapshot| s.module.namespace.clone();
    if let Some(pin) = pin {
        let snapshots = store.ordinals_with(namespace, &pin.to_string());
        if snapshots.is_empty() {
            return Err(UnresolvableConfig {
                module: store.module().to_string(),
                field: "namespace".to_string(),
                reason: format!("pinned namespace {} is not declared by any snapshot", pin),
                constraints: vec![format!("namespace = {}", pin)],
                rejected: store
                    .newest_first(namespace)
                    .into_iter()
                    .map(|(snapshot, value)| Rejected {
                        value,
                        snapshot,
                        because: "does not match the pin".to_string(),
                    })
                    .collect(),
            });
        }
        return Ok(Some(Resolved::new(pin.to_string(), snapshots, Reason::Pinned)));
    }

    let mut distinct: Vec<(String, usize)> = Vec::new();
    for (ordinal, ns) in store.newest_first(namespace) {
        if !distinct.iter().any(|(v, _)| *v == ns) {
            distinct.push((ns, ordinal));
        }
    }
    if distinct.len() > 1 {
        return Err(UnresolvableConfig {
            module: store.module().to_string(),
            field: "namespace".to_string(),
            reason: "snapshots disagree on the module identity; split the module or pin a namespace"
                .to_string(),
            constraints: Vec::new(),
            rejected: distinct
                .into_iter()
                .map(|(value, snapshot)| Rejected {
                    value,
                    snapshot,
                    because: "identity drift".to_string(),
                })
                .collect(),
        });
    }
    Ok(latest(store, namespace))
}

/// A JVM-level field follows the locked JDK when any snapshot sets it.
fn follow_jdk<F>(
    store: &SnapshotStore,
    jdk: Option<&Resolved<Version>>,
    field: F,
) -> Option<Resolved<Version>>
where
    F: Fn(&ModuleConfig) -> Option<&Version>,
{
    let own = latest(store, |s| field(&s.module).cloned())?;
    let Some(jdk) = jdk else {
        return Some(own);
    };
    if own.value == jdk.value {
        return Some(own);
    }
    Some(Resolved::new(
        jdk.value.clone(),
        jdk.snapshots.clone(),
        Reason::Derived,
    ))
}

fn resolve_plugins(
    store: &SnapshotStore,
    toolchain: &BTreeMap<ToolchainAxis, Resolved<Version>>,
) -> Vec<ResolvedPlugin> {
    let mut ids: Vec<&str> = Vec::new();
    for s in store.snapshots() {
        for p in s.plugins.iter().filter(|p| p.is_applied()) {
            if !ids.contains(&p.id.as_str()) {
                ids.push(&p.id);
            }
        }
    }

    ids.into_iter()
        .map(|id| {
            let snapshots = store
                .snapshots()
                .iter()
                .filter(|s| s.plugin_declarations(id).any(|p| p.is_applied()))
                .map(|s| s.index)
                .collect();
            let declared = store
                .latest(|s| s.plugin_declarations(id).find_map(|p| p.version.clone()))
                .map(|(_, v)| v);
            let locked = ToolchainAxis::for_plugin(id).and_then(|axis| toolchain.get(&axis));
            let (version, reason) = match locked {
                Some(axis) => (Some(axis.value.clone()), axis.reason.clone()),
                None => (declared, Reason::LatestWins),
            };
            ResolvedPlugin {
                id: id.to_string(),
                version,
                snapshots,
                reason,
            }
        })
        .collect()
}

fn resolve_dependencies(store: &SnapshotStore, policy: &Policy) -> Vec<ResolvedDependency> {
    let mut merged: Vec<ResolvedDependency> = Vec::new();
    for s in store.snapshots() {
        for d in &s.dependencies {
            if d.scope == DependencyScope::Tooling && rc_parse::classpath_plugin(&d.coordinate).is_some()
            {
                continue;
            }
            let existing = merged
                .iter_mut()
                .find(|m| m.configuration == d.configuration && m.coordinate == d.coordinate);
            match existing {
                Some(m) => {
                    m.version = d.version.clone();
                    m.platform = d.platform;
                    m.is_override = d.is_override;
                    if m.snapshots.last() != Some(&s.index) {
                        m.snapshots.push(s.index);
                    }
                }
                None => merged.push(ResolvedDependency {
                    configuration: d.configuration.clone(),
                    scope: d.scope,
                    coordinate: d.coordinate.clone(),
                    version: d.version.clone(),
                    platform: d.platform,
                    is_override: d.is_override,
                    snapshots: vec![s.index],
                    reason: Reason::LatestWins,
                }),
            }
        }
    }

    let families_present = merged
        .iter()
        .filter(|d| d.platform)
        .filter_map(|d| policy.family_of_bom(&d.coordinate))
        .map(|f| f.name.clone())
        .collect::<BTreeSet<_>>();

    // A BOM governs module dependencies, never buildscript tooling.
    for d in merged
        .iter_mut()
        .filter(|d| !d.platform && d.scope == DependencyScope::Implementation)
    {
        let managed = policy
            .family_of_member(&d.coordinate)
            .is_some_and(|f| families_present.contains(&f.name));
        if !managed {
            continue;
        }
        if d.is_override {
            d.reason = Reason::Override;
        } else {
            d.version = VersionSpec::Managed;
            d.reason = Reason::BomManaged;
        }
    }
    merged
}

fn axis_named(name: &str) -> Option<ToolchainAxis> {
    ToolchainAxis::ALL.into_iter().find(|a| a.as_str() == name)
}

/// Status of a conflict against the resolved candidate.
fn settle(
    conflict: &Conflict,
    config: &ResolvedConfig,
    store: &SnapshotStore,
    policy: &Policy,
) -> ConflictStatus {
    if conflict.status == ConflictStatus::Pinned {
        return ConflictStatus::Pinned;
    }
    let open_if = |still: bool| {
        if still {
            ConflictStatus::Open
        } else {
            ConflictStatus::Superseded
        }
    };
    let fields = conflict.fields.iter().map(String::as_str).collect::<Vec<_>>();
    let values = &conflict.values;

    match conflict.kind {
        ConflictKind::IdentityDrift | ConflictKind::RedundantDeclaration => {
            ConflictStatus::Superseded
        }
        // Only a duplicate in the newest snapshot applying the plugin survives.
        ConflictKind::DuplicatePluginApplication => match values.first() {
            Some(id) => open_if(
                store
                    .latest(|s| {
                        let applied = s.plugin_declarations(id).filter(|p| p.is_applied()).count();
                        (applied > 0).then_some(applied)
                    })
                    .is_some_and(|(_, applied)| applied > 1),
            ),
            None => ConflictStatus::Open,
        },
        ConflictKind::UnappliedPlugin => ConflictStatus::Open,
        ConflictKind::InvalidOrdering => {
            let walked = [&config.target_sdk, &config.min_sdk]
                .into_iter()
                .flatten()
                .any(|r| r.reason.is_downgrade());
            if walked {
                ConflictStatus::Downgraded
            } else {
                ConflictStatus::Superseded
            }
        }
        ConflictKind::VersionIncompatibility | ConflictKind::UnknownCompatibility => {
            match fields.as_slice() {
                [a, b] if axis_named(a).is_some() && axis_named(b).is_some() => {
                    let (Some(a), Some(b)) = (axis_named(a), axis_named(b)) else {
                        return ConflictStatus::Open;
                    };
                    let still = config.axis(a).map(|v| v.to_string()).as_ref() == values.first()
                        && config.axis(b).map(|v| v.to_string()).as_ref() == values.get(1);
                    let walked = [a, b]
                        .iter()
                        .filter_map(|axis| config.toolchain.get(axis))
                        .any(|r| r.reason.is_downgrade());
                    if still {
                        ConflictStatus::Open
                    } else if walked && conflict.kind == ConflictKind::VersionIncompatibility {
                        ConflictStatus::Downgraded
                    } else {
                        ConflictStatus::Superseded
                    }
                }
                ["compile_sdk", "build_tool"] => open_if(
                    config.compile_sdk.as_ref().map(|r| r.value.to_string()).as_ref()
                        == values.first()
                        && config.axis(ToolchainAxis::BuildTool).map(|v| v.to_string()).as_ref()
                            == values.get(1),
                ),
                ["java_level", "jvm_target"] => open_if(
                    matches!((&config.java_level, &config.jvm_target), (Some(j), Some(t)) if j.value != t.value),
                ),
                [coordinate] => open_if(!dependency_managed(config, coordinate)),
                _ => ConflictStatus::Open,
            }
        }
        ConflictKind::MissingDesugaring => {
            let flag = value(&config.desugaring);
            if fields.len() > 1 {
                let library = config
                    .dependencies
                    .iter()
                    .any(|d| policy.is_desugaring_library(&d.coordinate));
                open_if(flag == Some(true) && !library)
            } else {
                open_if(flag.is_none())
            }
        }
        ConflictKind::BomOverride => match fields.first() {
            Some(coordinate) => open_if(!dependency_managed(config, coordinate)),
            None => ConflictStatus::Open,
        },
    }
}

fn dependency_managed(config: &ResolvedConfig, coordinate: &str) -> bool {
    config
        .dependencies
        .iter()
        .filter(|d| !d.platform && d.scope == DependencyScope::Implementation)
        .filter(|d| d.coordinate.to_string() == coordinate)
        .all(|d| d.version == VersionSpec::Managed)
}
