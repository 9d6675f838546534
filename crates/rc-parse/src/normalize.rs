//! Lowering of parsed build scripts onto the snapshot IR.
//!
//! Every spelling of a setting the DSLs allow (`compileSdk = 34`,
//! `compileSdkVersion 34`, `compileSdkVersion("android-34")`,
//! `compileSdk { version = release(34) }`) lands in the same
//! [`ModuleConfig`](rc_common::ModuleConfig) field. Values that only exist at
//! Gradle evaluation time (`flutter.minSdkVersion`) leave the field unset.
//!
//! Files of one snapshot are lowered in two passes: variables (`ext`,
//! `extra[...]`, `val`) first, so a root-project `ext.kotlin_version` is
//! visible to module scripts regardless of file order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use rc_common::model::plugin_ids;
use rc_common::{
    ApplicationMode, Coordinate, DependencyDeclaration, DependencyScope, PluginDeclaration,
    PluginOrigin, Provenance, Snapshot, ToolchainAxis, Version, VersionSpec,
};

use crate::tree::{Arg, AssignOp, Block, Call, Document, Node, Value};

/// `${expr}` or `$name` inside a string literal.
static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Marker the lexer leaves for an escaped `\$`.
const ESCAPED_DOLLAR: char = '\u{0}';

/// Variable lookups nest at most this deep (guards `a = "$b"; b = "$a"`).
const MAX_RESOLVE_DEPTH: usize = 8;

/// Legacy classpath coordinates that carry a plugin.
const CLASSPATH_PLUGINS: &[(&str, &str)] = &[
    ("com.android.tools.build:gradle", plugin_ids::ANDROID_APPLICATION),
    ("org.jetbrains.kotlin:kotlin-gradle-plugin", plugin_ids::KOTLIN_ANDROID),
    ("com.google.gms:google-services", plugin_ids::GOOGLE_SERVICES),
];

/// Short plugin ids mapped to canonical ids.
const PLUGIN_ALIASES: &[(&str, &str)] = &[
    ("android", plugin_ids::ANDROID_APPLICATION),
    ("android-library", plugin_ids::ANDROID_LIBRARY),
    ("kotlin-android", plugin_ids::KOTLIN_ANDROID),
    ("kotlin-kapt", "org.jetbrains.kotlin.kapt"),
    ("kotlin-parcelize", "org.jetbrains.kotlin.plugin.parcelize"),
    ("com.google.gms.google-services", plugin_ids::GOOGLE_SERVICES),
];

/// Prefixes under which build scripts store shared variables.
const VARIABLE_PREFIXES: &[&str] = &[
    "rootProject.ext.",
    "project.ext.",
    "ext.",
    "rootProject.extra.",
    "project.extra.",
    "extra.",
];

/// Canonical form of a plugin id.
pub fn canonical_plugin_id(raw: &str) -> String {
    PLUGIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map_or_else(|| raw.to_string(), |(_, id)| id.to_string())
}

/// Plugin carried by a classpath coordinate (`group:artifact`).
pub fn classpath_plugin(coordinate: &Coordinate) -> Option<&'static str> {
    let key = coordinate.to_string();
    CLASSPATH_PLUGINS
        .iter()
        .find(|(coord, _)| *coord == key)
        .map(|(_, id)| *id)
}

/// One parsed file of a snapshot.
pub struct SourceDocument<'a> {
    /// Path relative to the snapshot root (or the buffer label).
    pub path: &'a str,
    pub document: &'a Document,
}

/// Lower the documents of one snapshot.
pub fn lower(label: &str, files: &[SourceDocument<'_>]) -> Snapshot {
    let mut lowering = Lowering::new(label);
    for file in files {
        lowering.collect_variables(&file.document.nodes, &mut Vec::new());
    }
    for file in files {
        lowering.file = file.path.to_string();
        lowering.walk(&file.document.nodes, &mut Vec::new());
    }
    lowering.snapshot.provenance = provenance(label, files);
    lowering.finish()
}

fn provenance(label: &str, files: &[SourceDocument<'_>]) -> Provenance {
    let comments = || files.iter().flat_map(|f| f.document.comments.iter());
    let intent = comments()
        .find_map(|c| {
            let text = c.text.trim();
            let lower = text.to_ascii_lowercase();
            lower
                .starts_with("intent:")
                .then(|| text["intent:".len()..].trim().to_string())
        })
        .or_else(|| {
            files.iter().find_map(|f| {
                let first_code = f.document.first_code_line().unwrap_or(usize::MAX);
                f.document
                    .comments
                    .iter()
                    .find(|c| c.line < first_code && !c.text.is_empty())
                    .map(|c| c.text.lines().next().unwrap_or_default().trim().to_string())
            })
        })
        .filter(|s| !s.is_empty());
    Provenance {
        source: label.to_string(),
        intent,
    }
}

/// A `classpath` entry that maps to a plugin.
struct ClasspathPlugin {
    id: &'static str,
    version: Option<Version>,
    file: String,
    used: bool,
}

struct Lowering {
    snapshot: Snapshot,
    vars: HashMap<String, Value>,
    file: String,
    dsl_plugins: Vec<PluginDeclaration>,
    legacy_applies: Vec<(String, String)>,
    classpath: Vec<ClasspathPlugin>,
    source_compat: Option<Version>,
    target_compat: Option<Version>,
    excludes: BTreeSet<String>,
}

impl Lowering {
    fn new(label: &str) -> Self {
        Lowering {
            snapshot: Snapshot::empty(label),
            vars: HashMap::new(),
            file: String::new(),
            dsl_plugins: Vec::new(),
            legacy_applies: Vec::new(),
            classpath: Vec::new(),
            source_compat: None,
            target_compat: None,
            excludes: BTreeSet::new(),
        }
    }

    // ---- pass 1: variables ----------------------------------------------

    fn collect_variables(&mut self, nodes: &[Node], path: &mut Vec<String>) {
        for node in nodes {
            match node {
                Node::Block(block) => {
                    path.push(block.name.clone());
                    self.collect_variables(&block.body, path);
                    path.pop();
                }
                Node::Assign(assign) if assign.op == AssignOp::Set => {
                    let in_ext = path.last().is_some_and(|p| p == "ext");
                    if let Some(name) = variable_name(&assign.target, assign.declared || in_ext) {
                        self.vars.insert(name, assign.value.clone());
                    }
                }
                Node::Call(stmt) => {
                    // extra.set("name", value)
                    let call = &stmt.call;
                    if matches!(call.name.as_str(), "extra.set" | "ext.set" | "project.extra.set") {
                        if let [Arg {
                            value: Value::Str(key),
                            ..
                        }, Arg { value, .. }] = call.args.as_slice()
                        {
                            self.vars.insert(key.clone(), value.clone());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ---- value resolution -----------------------------------------------

    fn string(&self, value: &Value) -> Option<String> {
        self.string_at(value, 0)
    }

    fn string_at(&self, value: &Value, depth: usize) -> Option<String> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        match value {
            Value::Str(s) => self.interpolate(s, depth),
            Value::Number(n) => Some(n.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Ref(name) => self.lookup(name, depth),
            Value::Concat(parts) => parts
                .iter()
                .map(|p| self.string_at(p, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.concat()),
            Value::Call(call) => match (call.name.as_str(), call.receiver.as_deref()) {
                ("file" | "uri" | "project.file", None) => {
                    call.first_arg().and_then(|a| self.string_at(a, depth + 1))
                }
                ("get" | "toString" | "trim", Some(receiver)) => self.string_at(receiver, depth + 1),
                _ => None,
            },
            _ => None,
        }
    }

    fn lookup(&self, name: &str, depth: usize) -> Option<String> {
        let key = strip_variable_prefix(name);
        self.vars
            .get(key)
            .and_then(|v| self.string_at(v, depth + 1))
    }

    fn interpolate(&self, raw: &str, depth: usize) -> Option<String> {
        let mut out = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in INTERPOLATION.captures_iter(raw) {
            let whole = caps.get(0)?;
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
            out.push_str(&raw[last..whole.start()]);
            match self.lookup(name, depth) {
                Some(v) => out.push_str(&v),
                None => {
                    debug!(file = %self.file, variable = name, "unresolved interpolation");
                    return None;
                }
            }
            last = whole.end();
        }
        out.push_str(&raw[last..]);
        Some(out.replace(ESCAPED_DOLLAR, "$"))
    }

    fn sdk_level(&self, value: &Value) -> Option<u32> {
        match value {
            Value::Call(call) => match (call.name.as_str(), call.receiver.as_deref()) {
                ("release" | "android.release", _) => call.first_arg().and_then(|a| self.sdk_level(a)),
                ("toInteger" | "toInt", Some(receiver)) => self.sdk_level(receiver),
                ("Integer.parseInt" | "Integer.valueOf", None) => {
                    call.first_arg().and_then(|a| self.sdk_level(a))
                }
                _ => None,
            },
            other => {
                let text = self.string(other)?;
                let text = text.trim();
                text.strip_prefix("android-").unwrap_or(text).parse().ok()
            }
        }
    }

    fn java_level(&self, value: &Value) -> Option<Version> {
        match value {
            Value::Ref(name) => {
                let name = name.strip_suffix(".majorVersion").unwrap_or(name);
                if let Some(rest) = name
                    .strip_prefix("JavaVersion.VERSION_")
                    .or_else(|| name.strip_prefix("JvmTarget.JVM_"))
                {
                    return Version::parse_jdk(&rest.replace('_', ".")).ok();
                }
                let text = self.lookup(name, 0)?;
                Version::parse_jdk(&text).ok()
            }
            Value::Call(call) => {
                if let Some(base) = call.name.strip_suffix(".toString") {
                    return self.java_level(&Value::Ref(base.to_string()));
                }
                match (call.name.as_str(), call.receiver.as_deref()) {
                    ("toString" | "get", Some(receiver)) => self.java_level(receiver),
                    (
                        "JavaVersion.toVersion"
                        | "JavaLanguageVersion.of"
                        | "JvmTarget.fromTarget"
                        | "of"
                        | "toVersion",
                        _,
                    ) => call.first_arg().and_then(|a| self.java_level(a)),
                    _ => None,
                }
            }
            other => Version::parse_jdk(&self.string(other)?).ok(),
        }
    }

    fn boolean(&self, value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => self.string(other)?.parse().ok(),
        }
    }

    fn strings(&self, value: &Value) -> Vec<String> {
        match value {
            Value::List(items) => items.iter().filter_map(|v| self.string(v)).collect(),
            Value::Call(call)
                if matches!(
                    call.name.as_str(),
                    "setOf" | "listOf" | "mutableSetOf" | "mutableListOf" | "arrayOf"
                ) =>
            {
                call.args.iter().filter_map(|a| self.string(&a.value)).collect()
            }
            other => self.string(other).into_iter().collect(),
        }
    }

    fn version(&self, value: &Value) -> Option<Version> {
        let text = self.string(value)?;
        match text.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(file = %self.file, value = %text, error = %e, "ignoring unparseable version");
                None
            }
        }
    }

    // ---- pass 2: settings -----------------------------------------------

    fn walk(&mut self, nodes: &[Node], path: &mut Vec<String>) {
        for node in nodes {
            match node {
                Node::Block(block) => self.block(block, path),
                Node::Assign(assign) => {
                    self.setting(&assign.target, &assign.value, assign.op, path);
                }
                Node::Call(stmt) => self.call(&stmt.call, stmt.comment.as_deref(), path),
            }
        }
    }

    fn block(&mut self, block: &Block, path: &mut Vec<String>) {
        if in_block(path, "dependencies") {
            // implementation("g:a:v") { exclude(...) }
            let call = Call {
                name: block.name.clone(),
                receiver: None,
                args: block.args.clone(),
                infix: Vec::new(),
            };
            self.dependency(&call, None, path);
            return;
        }

        if matches!(block.name.as_str(), "compileSdk" | "minSdk" | "targetSdk") {
            // compileSdk { version = release(36) }
            for node in &block.body {
                if let Node::Assign(assign) = node {
                    if assign.target == "version" {
                        self.setting(&block.name, &assign.value, AssignOp::Set, path);
                    }
                }
            }
            return;
        }

        path.push(block.name.clone());
        self.walk(&block.body, path);
        path.pop();
    }

    fn call(&mut self, call: &Call, comment: Option<&str>, path: &[String]) {
        if path.last().is_some_and(|p| p == "plugins") {
            self.plugin_dsl(call, path);
            return;
        }
        if in_block(path, "dependencies") {
            self.dependency(call, comment, path);
            return;
        }
        if call.name == "apply" {
            if let Some(id) = call.named_arg("plugin").and_then(|v| self.string(v)) {
                self.legacy_applies
                    .push((canonical_plugin_id(&id), self.file.clone()));
            }
            return;
        }
        if call.receiver.is_some() {
            return;
        }

        // `prop.set(x)` / `prop.value(x)` assign like `prop = x`.
        let property = call
            .name
            .strip_suffix(".set")
            .or_else(|| call.name.strip_suffix(".value"));
        match (property, call.args.as_slice()) {
            (Some(property), [Arg { name: None, value }]) => {
                self.setting(property, value, AssignOp::Set, path);
            }
            (None, [Arg { name: None, value }]) => match call.name.as_str() {
                "jvmToolchain" => {
                    self.snapshot.module.jvm_toolchain = self.java_level(value);
                }
                "exclude"
                | "excludes.add"
                | "excludes.addAll"
                | "resources.excludes.add"
                | "resources.excludes.addAll"
                    if in_packaging(path) =>
                {
                    let values = self.strings(value);
                    self.excludes.extend(values);
                }
                // Groovy `compileSdkVersion 34`
                name => self.setting(name, value, AssignOp::Set, path),
            },
            _ => {}
        }
    }

    fn setting(&mut self, target: &str, value: &Value, op: AssignOp, path: &[String]) {
        match target {
            "rootProject.name" => {
                self.snapshot.project_name = self.string(value);
                return;
            }
            "buildDir"
            | "rootProject.buildDir"
            | "project.buildDir"
            | "layout.buildDirectory"
            | "rootProject.layout.buildDirectory" => {
                if !in_block(path, "subprojects") && !in_block(path, "allprojects") {
                    if let Some(dir) = self.build_dir(value) {
                        self.snapshot.module.build_dir = Some(dir);
                    }
                }
                return;
            }
            _ => {}
        }

        let key = target.rsplit('.').next().unwrap_or(target);
        let release = in_block(path, "release");
        match key {
            "namespace" => self.snapshot.module.namespace = self.string(value),
            "applicationId" => self.snapshot.module.application_id = self.string(value),
            "compileSdk" | "compileSdkVersion" => {
                self.snapshot.module.compile_sdk = self.sdk_level(value);
                self.note_unset("compileSdk", value, self.snapshot.module.compile_sdk.is_none());
            }
            "minSdk" | "minSdkVersion" => {
                self.snapshot.module.min_sdk = self.sdk_level(value);
                self.note_unset("minSdk", value, self.snapshot.module.min_sdk.is_none());
            }
            "targetSdk" | "targetSdkVersion" => {
                self.snapshot.module.target_sdk = self.sdk_level(value);
                self.note_unset("targetSdk", value, self.snapshot.module.target_sdk.is_none());
            }
            "sourceCompatibility" => self.source_compat = self.java_level(value),
            "targetCompatibility" => self.target_compat = self.java_level(value),
            "jvmTarget" => self.snapshot.module.jvm_target = self.java_level(value),
            "languageVersion" if in_block(path, "toolchain") => {
                self.snapshot.module.jvm_toolchain = self.java_level(value)
            }
            "multiDexEnabled" | "isMultiDexEnabled" => {
                self.snapshot.module.multidex = self.boolean(value)
            }
            "isCoreLibraryDesugaringEnabled" | "coreLibraryDesugaringEnabled" => {
                self.snapshot.module.desugaring = self.boolean(value)
            }
            "versionCode" => {
                self.snapshot.module.version_code =
                    self.string(value).and_then(|s| s.parse().ok())
            }
            "versionName" => self.snapshot.module.version_name = self.string(value),
            "isMinifyEnabled" | "minifyEnabled" if release => {
                self.snapshot.module.minify = self.boolean(value)
            }
            "isShrinkResources" | "shrinkResources" if release => {
                self.snapshot.module.shrink_resources = self.boolean(value)
            }
            "signingConfig" if release => {
                self.snapshot.module.signing_config = signing_config_name(value)
            }
            "excludes" if in_packaging(path) => {
                let values = self.strings(value);
                if op == AssignOp::Set {
                    self.excludes.clear();
                }
                self.excludes.extend(values);
            }
            _ => {}
        }
    }

    fn note_unset(&self, field: &str, value: &Value, unset: bool) {
        if unset {
            debug!(file = %self.file, field, value = %value.text(), "symbolic value left unset");
        }
    }

    /// Target of a build-directory redirection.
    fn build_dir(&self, value: &Value) -> Option<String> {
        match value {
            Value::Ref(name) => match self.vars.get(name) {
                Some(v) => self.build_dir(v),
                None => None,
            },
            Value::Call(call) => match (call.name.as_str(), call.receiver.as_deref()) {
                ("get", Some(receiver)) => self.build_dir(receiver),
                (name, _) if name == "dir" || name.ends_with(".dir") => {
                    call.first_arg().and_then(|a| self.string(a))
                }
                _ => self.string(value),
            },
            other => self.string(other),
        }
    }

    fn plugin_dsl(&mut self, call: &Call, path: &[String]) {
        let id = match call.name.as_str() {
            "id" => call.first_arg().and_then(|v| self.string(v)),
            "kotlin" => call
                .first_arg()
                .and_then(|v| self.string(v))
                .map(|s| format!("org.jetbrains.kotlin.{}", s)),
            _ => None,
        };
        let Some(id) = id else {
            debug!(file = %self.file, plugin = %call.name, "skipping unrecognized plugin entry");
            return;
        };
        let applied = !in_block(path, "pluginManagement")
            && call.infix("apply") != Some(&Value::Bool(false));
        self.dsl_plugins.push(PluginDeclaration {
            id: canonical_plugin_id(&id),
            version: call.infix("version").and_then(|v| self.version(v)),
            mode: if applied {
                ApplicationMode::Applied
            } else {
                ApplicationMode::DeclaredOnly
            },
            origin: PluginOrigin::PluginDsl,
            file: Some(self.file.clone()),
        });
    }

    fn dependency(&mut self, call: &Call, comment: Option<&str>, path: &[String]) {
        let configuration = call.name.as_str();
        if configuration == "constraints" || path.last().is_some_and(|p| p == "constraints") {
            return;
        }

        let parsed = match call.first_arg() {
            Some(value) => self.coordinate(value),
            None => self.coordinate_from_args(call),
        };
        let Some((coordinate, version, platform)) = parsed else {
            debug!(file = %self.file, configuration, "skipping non-coordinate dependency");
            return;
        };

        let scope = if configuration == "classpath" {
            DependencyScope::Tooling
        } else {
            DependencyScope::Implementation
        };
        if scope == DependencyScope::Tooling {
            if let Some(id) = classpath_plugin(&coordinate) {
                self.classpath.push(ClasspathPlugin {
                    id,
                    version: version.as_ref().and_then(|v| v.parse().ok()),
                    file: self.file.clone(),
                    used: false,
                });
            }
        }

        let is_override = comment.is_some_and(|c| c.to_ascii_lowercase().contains("override"));
        self.snapshot.dependencies.push(DependencyDeclaration {
            coordinate,
            version: version.map_or(VersionSpec::Managed, VersionSpec::Explicit),
            scope,
            configuration: configuration.to_string(),
            platform,
            is_override,
        });
    }

    /// `(coordinate, explicit version, platform)` of a dependency notation.
    fn coordinate(&self, value: &Value) -> Option<(Coordinate, Option<String>, bool)> {
        match value {
            Value::Call(call) => match call.name.as_str() {
                "platform" | "enforcedPlatform" => {
                    let (coordinate, version, _) = self.coordinate(call.first_arg()?)?;
                    Some((coordinate, version, true))
                }
                "kotlin" => {
                    let module = self.string(call.first_arg()?)?;
                    let version = call.args.get(1).and_then(|a| self.string(&a.value));
                    Some((
                        Coordinate::new("org.jetbrains.kotlin", format!("kotlin-{}", module)),
                        version,
                        false,
                    ))
                }
                _ => None,
            },
            other => {
                let notation = self.string(other)?;
                let mut parts = notation.split(':');
                let group = parts.next().filter(|g| !g.is_empty())?;
                let artifact = parts.next().filter(|a| !a.is_empty())?;
                let version = parts.next().filter(|v| !v.is_empty()).map(str::to_string);
                Some((Coordinate::new(group, artifact), version, false))
            }
        }
    }

    /// Map notation: `group: 'g', name: 'a', version: 'v'`.
    fn coordinate_from_args(&self, call: &Call) -> Option<(Coordinate, Option<String>, bool)> {
        let group = self.string(call.named_arg("group")?)?;
        let name = self.string(call.named_arg("name")?)?;
        let version = call.named_arg("version").and_then(|v| self.string(v));
        Some((Coordinate::new(group, name), version, false))
    }

    // ---- finish ---------------------------------------------------------

    fn finish(mut self) -> Snapshot {
        let mut plugins = std::mem::take(&mut self.dsl_plugins);

        for (id, file) in std::mem::take(&mut self.legacy_applies) {
            let axis = ToolchainAxis::for_plugin(&id);
            let classpath = self.classpath.iter_mut().find(|c| {
                !c.used && (c.id == id || (axis.is_some() && ToolchainAxis::for_plugin(c.id) == axis))
            });
            let version = classpath.and_then(|c| {
                c.used = true;
                c.version.clone()
            });
            plugins.push(PluginDeclaration {
                id,
                version,
                mode: ApplicationMode::Applied,
                origin: PluginOrigin::Legacy,
                file: Some(file),
            });
        }
        for c in self.classpath.iter().filter(|c| !c.used) {
            plugins.push(PluginDeclaration {
                id: c.id.to_string(),
                version: c.version.clone(),
                mode: ApplicationMode::DeclaredOnly,
                origin: PluginOrigin::Legacy,
                file: Some(c.file.clone()),
            });
        }

        let module = &mut self.snapshot.module;
        module.java_level = self.target_compat.or(self.source_compat);
        if !self.excludes.is_empty() {
            module.resource_excludes = Some(self.excludes);
        }

        for axis in ToolchainAxis::ALL {
            let value = match axis {
                ToolchainAxis::Jdk => module
                    .jvm_toolchain
                    .clone()
                    .or_else(|| module.java_level.clone())
                    .or_else(|| module.jvm_target.clone()),
                _ => axis_version(&plugins, axis),
            };
            if let Some(v) = value {
                self.snapshot.toolchain.insert(axis, v);
            }
        }

        self.snapshot.plugins = plugins;
        self.snapshot
    }
}

/// Axis value carried by plugin versions: applied declarations first, then
/// the highest declared version.
fn axis_version(plugins: &[PluginDeclaration], axis: ToolchainAxis) -> Option<Version> {
    let carrying = || {
        plugins
            .iter()
            .filter(move |p| ToolchainAxis::for_plugin(&p.id) == Some(axis))
            .filter_map(|p| p.version.as_ref().map(|v| (p.is_applied(), v)))
    };
    carrying()
        .filter(|(applied, _)| *applied)
        .map(|(_, v)| v)
        .max()
        .or_else(|| carrying().map(|(_, v)| v).max())
        .cloned()
}

fn variable_name(target: &str, plain_is_variable: bool) -> Option<String> {
    if let Some(inner) = target
        .strip_prefix("extra[")
        .or_else(|| target.strip_prefix("ext["))
        .or_else(|| target.strip_prefix("rootProject.extra["))
        .or_else(|| target.strip_prefix("project.extra["))
    {
        return inner.strip_suffix(']').map(str::to_string);
    }
    let stripped = strip_variable_prefix(target);
    if stripped != target {
        return Some(stripped.to_string());
    }
    (plain_is_variable && !target.contains('.')).then(|| target.to_string())
}

fn strip_variable_prefix(name: &str) -> &str {
    for prefix in VARIABLE_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            return rest;
        }
    }
    for prefix in ["rootProject.extra[", "project.extra[", "extra[", "ext["] {
        if let Some(rest) = name.strip_prefix(prefix).and_then(|r| r.strip_suffix(']')) {
            return rest.trim_matches(|c| c == '"' || c == '\'');
        }
    }
    name
}

fn signing_config_name(value: &Value) -> Option<String> {
    match value {
        Value::Call(call) if call.name.ends_with("getByName") || call.name.ends_with("named") => {
            match call.first_arg() {
                Some(Value::Str(s)) => Some(s.clone()),
                _ => None,
            }
        }
        Value::Ref(name) => name
            .strip_prefix("signingConfigs.")
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn in_block(path: &[String], name: &str) -> bool {
    path.iter().any(|p| p == name)
}

fn in_packaging(path: &[String]) -> bool {
    in_block(path, "packaging") || in_block(path, "packagingOptions")
}
