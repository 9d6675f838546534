//! Reconcile configuration loading and validation.
//!
//! This crate provides:
//! - The compatibility knowledge base (compat.json, embedded by default)
//! - The reconciliation policy (desugaring thresholds, BOM families)
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config fingerprints for reproducible reports

pub mod compat;
pub mod fingerprint;
pub mod policy;
pub mod resolve;
pub mod validate;

pub use compat::{Compatibility, CompatTable, KnowledgeBase};
pub use fingerprint::ConfigFingerprint;
pub use policy::Policy;
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use validate::{ValidationError, ValidationResult};

use tracing::{debug, info};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Knowledge base and policy in effect for a run.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub knowledge_base: KnowledgeBase,
    pub policy: Policy,
    pub fingerprint: ConfigFingerprint,
}

/// Load, validate and fingerprint the configuration named by `paths`.
pub fn load_config(paths: &ConfigPaths) -> ValidationResult<LoadedConfig> {
    let compat_json = match &paths.compat {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?,
        None => compat::BUILTIN_COMPAT_JSON.to_string(),
    };
    let knowledge_base = KnowledgeBase::new(CompatTable::from_json(&compat_json)?)?;

    let (policy, policy_json) = match &paths.policy {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            (Policy::from_json(&json)?, json)
        }
        None => (
            Policy::builtin()?,
            policy::BUILTIN_POLICY_JSON.to_string(),
        ),
    };
    validate::validate_policy(&policy)?;

    let fingerprint = ConfigFingerprint::new(paths, &compat_json, &policy_json);
    info!(
        compat_source = %paths.compat_source,
        policy_source = %paths.policy_source,
        fingerprint = fingerprint.short_id(),
        "configuration loaded"
    );
    debug!(rules = knowledge_base.table().rules.len(), "knowledge base ready");

    Ok(LoadedConfig {
        knowledge_base,
        policy,
        fingerprint,
    })
}
