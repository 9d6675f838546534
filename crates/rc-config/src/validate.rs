//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::compat::CompatTable;
use crate::policy::Policy;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 24,
            ValidationError::SemanticError(_) => 25,
            ValidationError::InvalidValue { .. } => 26,
            ValidationError::VersionMismatch { .. } => 27,
        }
    }
}

impl From<ValidationError> for rc_common::Error {
    fn from(e: ValidationError) -> Self {
        rc_common::Error::Config(format!("{} (code {})", e, e.code()))
    }
}

fn check_schema_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Validate a compatibility table semantically.
///
/// Range syntax is already enforced by deserialization; this checks the
/// relationships between entries.
pub fn validate_compat(table: &CompatTable) -> ValidationResult<()> {
    check_schema_version(&table.schema_version)?;

    for (idx, rule) in table.rules.iter().enumerate() {
        if rule.subject.axis == rule.requires.axis {
            return Err(ValidationError::InvalidValue {
                field: format!("rules[{}]", idx),
                message: format!("rule relates axis {} to itself", rule.subject.axis),
            });
        }
    }

    for (axis, versions) in &table.known_versions {
        if versions.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("known_versions.{}", axis),
                message: "must list at least one version".to_string(),
            });
        }
    }

    for (idx, limit) in table.sdk_limits.iter().enumerate() {
        if limit.max_compile_sdk == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("sdk_limits[{}].max_compile_sdk", idx),
                message: "must be positive".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate policy configuration semantically.
pub fn validate_policy(policy: &Policy) -> ValidationResult<()> {
    check_schema_version(&policy.schema_version)?;

    if policy.workers == 0 {
        return Err(ValidationError::InvalidValue {
            field: "workers".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    for (idx, rule) in policy.desugaring.thresholds.iter().enumerate() {
        if rule.min_sdk_below == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("desugaring.thresholds[{}].min_sdk_below", idx),
                message: "must be positive".to_string(),
            });
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    for family in &policy.bom_families {
        if family.group_prefix.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("bom_families.{}.group_prefix", family.name),
                message: "must not be empty".to_string(),
            });
        }
        if !seen.insert(family.name.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate BOM family name '{}'",
                family.name
            )));
        }
        if !family.bom.contains(':') {
            return Err(ValidationError::InvalidValue {
                field: format!("bom_families.{}.bom", family.name),
                message: format!("expected group:artifact, got '{}'", family.bom),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_compat_is_valid() {
        let table = CompatTable::builtin().unwrap();
        assert!(validate_compat(&table).is_ok());
    }

    #[test]
    fn test_validation_error_maps_to_config_category() {
        let err: rc_common::Error = ValidationError::IoError("no such file".into()).into();
        assert_eq!(err.code(), 20);
        assert_eq!(err.category(), rc_common::ErrorCategory::Config);
        assert!(err.to_string().contains("no such file (code 60)"));
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(validate_policy(&Policy::default()).is_ok());
    }

    #[test]
    fn test_policy_rejects_zero_workers() {
        let policy = Policy {
            workers: 0,
            ..Policy::default()
        };
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_policy_rejects_wrong_schema() {
        let policy = Policy {
            schema_version: "0.9".to_string(),
            ..Policy::default()
        };
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::VersionMismatch { .. })
        ));
    }
}
