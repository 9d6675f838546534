//! Error types for reconcile.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation hints for humans
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 10,
//!   "category": "parse",
//!   "message": "malformed snapshot snapshots/04: unbalanced '{' in android > defaultConfig (line 12)",
//!   "remediation": "fix the document or remove it from the snapshot directory"
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Snapshot documents that could not be parsed.
    Parse,
    /// Knowledge base, policy or manifest errors.
    Config,
    /// Resolution failures.
    Resolve,
    /// Validator invariant violations.
    Validate,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Resolve => write!(f, "resolve"),
            ErrorCategory::Validate => write!(f, "validate"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for reconcile.
#[derive(Error, Debug)]
pub enum Error {
    // Parse errors (10-19)
    #[error("malformed snapshot {source_label}: {message}")]
    MalformedSnapshot {
        source_label: String,
        message: String,
    },

    // Configuration errors (20-29)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid module manifest: {0}")]
    InvalidManifest(String),

    // Resolve errors (30-39)
    #[error("unresolvable configuration for module {module}: {reason}")]
    Unresolvable { module: String, reason: String },

    // Validation errors (40-49)
    #[error("invariant violation in module {module}: {message}")]
    InvariantViolation { module: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Parse errors
    /// - 20-29: Configuration errors
    /// - 30-39: Resolve errors
    /// - 40-49: Validation errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::MalformedSnapshot { .. } => 10,
            Error::Config(_) => 20,
            Error::InvalidManifest(_) => 23,
            Error::Unresolvable { .. } => 30,
            Error::InvariantViolation { .. } => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MalformedSnapshot { .. } => ErrorCategory::Parse,
            Error::Config(_) | Error::InvalidManifest(_) => ErrorCategory::Config,
            Error::Unresolvable { .. } => ErrorCategory::Resolve,
            Error::InvariantViolation { .. } => ErrorCategory::Validate,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::MalformedSnapshot { .. } => {
                "fix the document or remove it from the snapshot directory"
            }
            Error::Config(_) => {
                "fix compat.json/policy.json, or check --compat/--policy and RECONCILE_* variables"
            }
            Error::InvalidManifest(_) => "fix reconcile.toml in the snapshot directory",
            Error::Unresolvable { .. } => {
                "add a snapshot with compatible values, or split or pin the module"
            }
            Error::InvariantViolation { .. } => "this indicates a resolver defect; please report it",
            Error::Io(_) => "check that the path exists and is readable",
            Error::Json(_) => "check the file is valid JSON",
        }
    }

    /// Structured form for JSON reports.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            category: self.category(),
            message: self.to_string(),
            remediation: self.remediation().to_string(),
        }
    }
}

/// Serializable error summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub remediation: String,
}
