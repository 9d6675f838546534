//! Configuration file discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths →
//! system config → embedded defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file paths.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to compat.json (or None for the embedded matrix).
    pub compat: Option<PathBuf>,

    /// Path to policy.json (or None for the built-in policy).
    pub policy: Option<PathBuf>,

    pub compat_source: ConfigSource,

    pub policy_source: ConfigSource,
}

/// Layer a configuration file was discovered in, strongest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    CliArgument,
    /// `RECONCILE_COMPAT` / `RECONCILE_POLICY` or `RECONCILE_CONFIG_DIR`.
    Environment,
    /// `$XDG_CONFIG_HOME/reconcile/`.
    XdgConfig,
    /// `/etc/reconcile/`.
    SystemConfig,
    /// Embedded in the binary.
    #[default]
    BuiltinDefault,
}

impl ConfigSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigSource::CliArgument => "CLI argument",
            ConfigSource::Environment => "environment variable",
            ConfigSource::XdgConfig => "XDG config",
            ConfigSource::SystemConfig => "system config",
            ConfigSource::BuiltinDefault => "builtin default",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two files reconcile reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFile {
    Compat,
    Policy,
}

impl ConfigFile {
    fn env_var(self) -> &'static str {
        match self {
            ConfigFile::Compat => "RECONCILE_COMPAT",
            ConfigFile::Policy => "RECONCILE_POLICY",
        }
    }

    fn filename(self) -> &'static str {
        match self {
            ConfigFile::Compat => "compat.json",
            ConfigFile::Policy => "policy.json",
        }
    }
}

const ENV_CONFIG_DIR: &str = "RECONCILE_CONFIG_DIR";

/// Application name for XDG directories.
const APP_NAME: &str = "reconcile";

/// Resolve both configuration files.
///
/// An explicit CLI path is returned even if it does not exist so that the
/// loader reports the missing file instead of silently using defaults.
pub fn resolve_config(cli_compat: Option<&Path>, cli_policy: Option<&Path>) -> ConfigPaths {
    let (compat, compat_source) = resolve_single(ConfigFile::Compat, cli_compat);
    let (policy, policy_source) = resolve_single(ConfigFile::Policy, cli_policy);
    ConfigPaths {
        compat,
        policy,
        compat_source,
        policy_source,
    }
}

fn resolve_single(file: ConfigFile, cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }
    search_candidates(file)
        .into_iter()
        .find(|(path, _)| path.exists())
        .map_or((None, ConfigSource::BuiltinDefault), |(path, source)| {
            (Some(path), source)
        })
}

/// On-disk locations searched for `file`, in precedence order.
fn search_candidates(file: ConfigFile) -> Vec<(PathBuf, ConfigSource)> {
    let mut candidates = Vec::new();
    if let Ok(path) = std::env::var(file.env_var()) {
        candidates.push((PathBuf::from(path), ConfigSource::Environment));
    }
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        candidates.push((
            PathBuf::from(dir).join(file.filename()),
            ConfigSource::Environment,
        ));
    }
    if let Some(dir) = xdg_config_dir() {
        candidates.push((dir.join(file.filename()), ConfigSource::XdgConfig));
    }
    candidates.push((
        system_config_dir().join(file.filename()),
        ConfigSource::SystemConfig,
    ));
    candidates
}

/// Get the XDG config directory for reconcile.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_precedence() {
        assert!(ConfigSource::CliArgument < ConfigSource::Environment);
        assert!(ConfigSource::SystemConfig < ConfigSource::BuiltinDefault);
        assert_eq!(ConfigSource::BuiltinDefault.to_string(), "builtin default");
    }

    #[test]
    fn test_candidates_end_with_system_dir() {
        let candidates = search_candidates(ConfigFile::Policy);
        let (last, source) = candidates.last().expect("system candidate");
        assert_eq!(last, &PathBuf::from("/etc/reconcile/policy.json"));
        assert_eq!(*source, ConfigSource::SystemConfig);
        assert!(candidates.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let missing = Path::new("/nonexistent/reconcile/compat.json");
        let paths = resolve_config(Some(missing), None);
        assert_eq!(paths.compat.as_deref(), Some(missing));
        assert_eq!(paths.compat_source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/reconcile"));
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }
}
