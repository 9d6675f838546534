//! Canonical Gradle Kotlin DSL rendering of a resolved configuration.
//!
//! The output is a single `build.gradle.kts` that the parser reads back to
//! the same module fields, toolchain axes and dependency set. Fields that
//! were not chosen by plain recency carry their reason as a trailing comment.

use crate::resolve::{Reason, Resolved, ResolvedConfig, ResolvedDependency};
use rc_common::{DependencyScope, ToolchainAxis, Version, VersionSpec};

/// Indenting line writer.
struct Kts {
    out: String,
    depth: usize,
}

impl Kts {
    fn new() -> Self {
        Kts {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, name: &str) {
        self.line(&format!("{} {{", name));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// `name = value`, with the reason when it is not plain recency.
    fn assign<T>(&mut self, name: &str, field: &Option<Resolved<T>>, show: impl Fn(&T) -> String) {
        if let Some(r) = field {
            let text = format!("{} = {}", name, show(&r.value));
            self.line(&annotate(text, &r.reason));
        }
    }
}

fn annotate(text: String, reason: &Reason) -> String {
    match reason {
        Reason::LatestWins => text,
        other => format!("{} // {}", text, other),
    }
}

/// Kotlin string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn java_version(v: &Version) -> String {
    match v.major() {
        n if n <= 8 => format!("JavaVersion.VERSION_1_{}", n),
        n => format!("JavaVersion.VERSION_{}", n),
    }
}

fn jvm_target(v: &Version) -> String {
    match v.major() {
        n if n <= 8 => quote(&format!("1.{}", n)),
        n => quote(&n.to_string()),
    }
}

fn notation(d: &ResolvedDependency) -> String {
    let coordinate = match &d.version {
        VersionSpec::Explicit(v) => quote(&format!("{}:{}", d.coordinate, v)),
        VersionSpec::Managed => quote(&d.coordinate.to_string()),
    };
    let coordinate = if d.platform {
        format!("platform({})", coordinate)
    } else {
        coordinate
    };
    annotate(
        format!("{}({})", d.configuration, coordinate),
        &d.reason,
    )
}

/// Render `config` as a canonical `build.gradle.kts`.
pub fn gradle_kts(config: &ResolvedConfig) -> String {
    let mut kts = Kts::new();
    kts.line(&format!("// Reconciled configuration for module {}", config.module));
    kts.blank();

    let tooling = config
        .dependencies
        .iter()
        .filter(|d| d.scope == DependencyScope::Tooling)
        .collect::<Vec<_>>();
    if !tooling.is_empty() {
        kts.open("buildscript");
        kts.open("dependencies");
        for d in &tooling {
            kts.line(&notation(d));
        }
        kts.close();
        kts.close();
        kts.blank();
    }

    render_plugins(&mut kts, config);
    render_android(&mut kts, config);

    if let Some(toolchain) = &config.jvm_toolchain {
        kts.blank();
        kts.open("kotlin");
        let text = format!("jvmToolchain({})", toolchain.value.major());
        kts.line(&annotate(text, &toolchain.reason));
        kts.close();
    }

    let module_deps = config
        .dependencies
        .iter()
        .filter(|d| d.scope == DependencyScope::Implementation)
        .collect::<Vec<_>>();
    if !module_deps.is_empty() {
        kts.blank();
        kts.open("dependencies");
        for d in module_deps {
            kts.line(&notation(d));
        }
        kts.close();
    }

    if let Some(dir) = &config.build_dir {
        kts.blank();
        let text = format!(
            "layout.buildDirectory.set(layout.projectDirectory.dir({}))",
            quote(&dir.value)
        );
        kts.line(&annotate(text, &dir.reason));
    }

    kts.out
}

fn render_plugins(kts: &mut Kts, config: &ResolvedConfig) {
    // Locked axes whose carrier plugin is not applied stay declared.
    let declared_only = ToolchainAxis::ALL
        .into_iter()
        .filter_map(|axis| {
            let locked = config.toolchain.get(&axis)?;
            let id = axis.plugin_id()?;
            let carried = config
                .plugins
                .iter()
                .any(|p| ToolchainAxis::for_plugin(&p.id) == Some(axis));
            (!carried).then_some((id, locked))
        })
        .collect::<Vec<_>>();
    if config.plugins.is_empty() && declared_only.is_empty() {
        return;
    }

    kts.open("plugins");
    for p in &config.plugins {
        let mut text = format!("id({})", quote(&p.id));
        if let Some(v) = &p.version {
            text.push_str(&format!(" version {}", quote(&v.to_string())));
        }
        kts.line(&annotate(text, &p.reason));
    }
    for (id, locked) in declared_only {
        let text = format!(
            "id({}) version {} apply false",
            quote(id),
            quote(&locked.value.to_string())
        );
        kts.line(&annotate(text, &locked.reason));
    }
    kts.close();
}

fn render_android(kts: &mut Kts, c: &ResolvedConfig) {
    let has_default_config = c.application_id.is_some()
        || c.min_sdk.is_some()
        || c.target_sdk.is_some()
        || c.version_code.is_some()
        || c.version_name.is_some()
        || c.multidex.is_some();
    let has_compile_options = c.java_level.is_some() || c.desugaring.is_some();
    let has_release = c.minify.is_some() || c.shrink_resources.is_some() || c.signing_config.is_some();
    let has_any = c.namespace.is_some()
        || c.compile_sdk.is_some()
        || has_default_config
        || has_compile_options
        || c.jvm_target.is_some()
        || has_release
        || c.resource_excludes.is_some();
    if !has_any {
        return;
    }

    kts.blank();
    kts.open("android");
    kts.assign("namespace", &c.namespace, |v| quote(v));
    kts.assign("compileSdk", &c.compile_sdk, u32::to_string);

    if has_default_config {
        kts.blank();
        kts.open("defaultConfig");
        kts.assign("applicationId", &c.application_id, |v| quote(v));
        kts.assign("minSdk", &c.min_sdk, u32::to_string);
        kts.assign("targetSdk", &c.target_sdk, u32::to_string);
        kts.assign("versionCode", &c.version_code, u32::to_string);
        kts.assign("versionName", &c.version_name, |v| quote(v));
        kts.assign("multiDexEnabled", &c.multidex, bool::to_string);
        kts.close();
    }

    if has_compile_options {
        kts.blank();
        kts.open("compileOptions");
        kts.assign("sourceCompatibility", &c.java_level, java_version);
        kts.assign("targetCompatibility", &c.java_level, java_version);
        kts.assign("isCoreLibraryDesugaringEnabled", &c.desugaring, bool::to_string);
        kts.close();
    }

    if c.jvm_target.is_some() {
        kts.blank();
        kts.open("kotlinOptions");
        kts.assign("jvmTarget", &c.jvm_target, jvm_target);
        kts.close();
    }

    if has_release {
        kts.blank();
        kts.open("buildTypes");
        kts.open("release");
        kts.assign("isMinifyEnabled", &c.minify, bool::to_string);
        kts.assign("isShrinkResources", &c.shrink_resources, bool::to_string);
        kts.assign("signingConfig", &c.signing_config, |v| {
            format!("signingConfigs.getByName({})", quote(v))
        });
        kts.close();
        kts.close();
    }

    if let Some(excludes) = &c.resource_excludes {
        kts.blank();
        kts.open("packaging");
        kts.open("resources");
        let items = excludes
            .value
            .iter()
            .map(|e| quote(e))
            .collect::<Vec<_>>()
            .join(", ");
        kts.line(&annotate(
            format!("excludes += setOf({})", items),
            &excludes.reason,
        ));
        kts.close();
        kts.close();
    }

    kts.close();
}
