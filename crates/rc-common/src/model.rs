//! Normalized snapshot IR.
//!
//! Every surface spelling the parser accepts collapses onto these types, so
//! the detector, resolver and validator work against one closed schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use crate::version::Version;

/// One independently versioned toolchain dimension.
///
/// The declaration order is the order in which the resolver locks axes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainAxis {
    /// Android Gradle Plugin version.
    BuildTool,
    /// JDK target level.
    Jdk,
    /// Kotlin Gradle plugin / compiler version.
    LanguageCompiler,
    /// Google services (BOM/dependency-management) plugin version.
    DependencyManagementPlugin,
}

impl ToolchainAxis {
    /// All axes in lock order.
    pub const ALL: [ToolchainAxis; 4] = [
        ToolchainAxis::BuildTool,
        ToolchainAxis::Jdk,
        ToolchainAxis::LanguageCompiler,
        ToolchainAxis::DependencyManagementPlugin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolchainAxis::BuildTool => "build_tool",
            ToolchainAxis::Jdk => "jdk",
            ToolchainAxis::LanguageCompiler => "language_compiler",
            ToolchainAxis::DependencyManagementPlugin => "dependency_management_plugin",
        }
    }

    /// Canonical plugin id whose version carries this axis, if any.
    pub fn plugin_id(self) -> Option<&'static str> {
        match self {
            ToolchainAxis::BuildTool => Some(plugin_ids::ANDROID_APPLICATION),
            ToolchainAxis::LanguageCompiler => Some(plugin_ids::KOTLIN_ANDROID),
            ToolchainAxis::DependencyManagementPlugin => Some(plugin_ids::GOOGLE_SERVICES),
            ToolchainAxis::Jdk => None,
        }
    }

    /// Axis carried by a plugin id's version, if any.
    pub fn for_plugin(id: &str) -> Option<ToolchainAxis> {
        match id {
            plugin_ids::ANDROID_APPLICATION | plugin_ids::ANDROID_LIBRARY => {
                Some(ToolchainAxis::BuildTool)
            }
            plugin_ids::KOTLIN_ANDROID => Some(ToolchainAxis::LanguageCompiler),
            plugin_ids::GOOGLE_SERVICES => Some(ToolchainAxis::DependencyManagementPlugin),
            _ => None,
        }
    }
}

impl fmt::Display for ToolchainAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical plugin identifiers the engine knows how to interpret.
pub mod plugin_ids {
    pub const ANDROID_APPLICATION: &str = "com.android.application";
    pub const ANDROID_LIBRARY: &str = "com.android.library";
    pub const KOTLIN_ANDROID: &str = "org.jetbrains.kotlin.android";
    pub const GOOGLE_SERVICES: &str = "com.google.gms.google-services";
}

/// Module-level attributes of one snapshot. Every field is optional because a
/// snapshot may simply not mention it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_sdk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sdk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sdk: Option<u32>,
    /// Java source/target compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_level: Option<Version>,
    /// Kotlin `jvmTarget`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<Version>,
    /// Explicit `jvmToolchain(n)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_toolchain: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multidex: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desugaring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_excludes: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrink_resources: Option<bool>,
}

/// Whether a plugin declaration applies the plugin or only makes it available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMode {
    /// `apply false`, pluginManagement entries, bare classpath dependencies.
    DeclaredOnly,
    Applied,
}

/// Mechanism through which a plugin reached the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginOrigin {
    /// `plugins { id(...) }` / pluginManagement registry.
    PluginDsl,
    /// `buildscript { classpath(...) }` and `apply(plugin = ...)`.
    Legacy,
}

impl fmt::Display for PluginOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginOrigin::PluginDsl => write!(f, "plugin DSL"),
            PluginOrigin::Legacy => write!(f, "legacy classpath"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDeclaration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    pub mode: ApplicationMode,
    pub origin: PluginOrigin,
    /// Source file the declaration came from (relative to the snapshot).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl PluginDeclaration {
    pub fn is_applied(&self) -> bool {
        self.mode == ApplicationMode::Applied
    }
}

/// Version of a dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum VersionSpec {
    Explicit(String),
    /// Delegated to a BOM platform entry.
    Managed,
}

impl VersionSpec {
    pub fn explicit(&self) -> Option<&str> {
        match self {
            VersionSpec::Explicit(v) => Some(v),
            VersionSpec::Managed => None,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Explicit(v) => f.write_str(v),
            VersionSpec::Managed => f.write_str("(managed)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyScope {
    /// Compiled into the module (`implementation`, `api`, `coreLibraryDesugaring`, ...).
    Implementation,
    /// Build tooling (`classpath`).
    Tooling,
}

/// `group:artifact` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Coordinate {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub coordinate: Coordinate,
    pub version: VersionSpec,
    pub scope: DependencyScope,
    /// Raw Gradle configuration name (`implementation`, `classpath`, ...).
    pub configuration: String,
    /// `platform(...)` BOM entry.
    #[serde(default)]
    pub platform: bool,
    /// Explicitly marked as overriding its BOM.
    #[serde(default)]
    pub is_override: bool,
}

/// Free-text intent recovered from the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Where the snapshot was loaded from (path or buffer label).
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// One immutable, normalized configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 1-based position in the input sequence. Assigned by the store.
    pub index: usize,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub module: ModuleConfig,
    pub plugins: Vec<PluginDeclaration>,
    pub dependencies: Vec<DependencyDeclaration>,
    pub toolchain: BTreeMap<ToolchainAxis, Version>,
}

impl Snapshot {
    /// An empty snapshot for `source`; index 0 means "not yet stored".
    pub fn empty(source: impl Into<String>) -> Self {
        Snapshot {
            index: 0,
            provenance: Provenance {
                source: source.into(),
                intent: None,
            },
            project_name: None,
            module: ModuleConfig::default(),
            plugins: Vec::new(),
            dependencies: Vec::new(),
            toolchain: BTreeMap::new(),
        }
    }

    pub fn axis(&self, axis: ToolchainAxis) -> Option<&Version> {
        self.toolchain.get(&axis)
    }

    /// Declarations of one plugin id in this snapshot.
    pub fn plugin_declarations<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a PluginDeclaration> + 'a {
        self.plugins.iter().filter(move |p| p.id == id)
    }

    /// Short label used in diagnostics: `#3 (snapshots/03-kotlin2)`.
    pub fn label(&self) -> String {
        format!("#{} ({})", self.index, self.provenance.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_lock_order() {
        let mut axes = ToolchainAxis::ALL.to_vec();
        axes.sort();
        assert_eq!(axes, ToolchainAxis::ALL.to_vec());
        assert_eq!(ToolchainAxis::ALL[0], ToolchainAxis::BuildTool);
        assert_eq!(ToolchainAxis::ALL[3], ToolchainAxis::DependencyManagementPlugin);
    }

    #[test]
    fn test_axis_plugin_mapping() {
        assert_eq!(
            ToolchainAxis::for_plugin("com.android.library"),
            Some(ToolchainAxis::BuildTool)
        );
        assert_eq!(
            ToolchainAxis::for_plugin(plugin_ids::GOOGLE_SERVICES),
            Some(ToolchainAxis::DependencyManagementPlugin)
        );
        assert_eq!(ToolchainAxis::for_plugin("dev.flutter.flutter-gradle-plugin"), None);
        assert_eq!(ToolchainAxis::Jdk.plugin_id(), None);
    }

    #[test]
    fn test_axis_serialization() {
        assert_eq!(
            serde_json::to_string(&ToolchainAxis::LanguageCompiler).unwrap(),
            "\"language_compiler\""
        );
    }

    #[test]
    fn test_snapshot_label() {
        let mut snap = Snapshot::empty("snapshots/03-kotlin2");
        snap.index = 3;
        assert_eq!(snap.label(), "#3 (snapshots/03-kotlin2)");
    }

    #[test]
    fn test_module_config_skips_unset_fields() {
        let cfg = ModuleConfig {
            compile_sdk: Some(34),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(json, "{\"compile_sdk\":34}");
    }
}
