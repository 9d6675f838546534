//! Reconcile common types, versions and errors.
//!
//! This crate provides the foundational types shared across the reconcile
//! crates:
//! - Dotted versions and Maven-style version ranges
//! - The normalized snapshot IR (module config, plugins, dependencies, axes)
//! - Typed conflicts with severity and resolution status
//! - Common error types and output format specifications

pub mod conflict;
pub mod error;
pub mod model;
pub mod output;
pub mod version;

pub use conflict::{Conflict, ConflictKind, ConflictStatus, Severity};
pub use error::{Error, ErrorCategory, ErrorReport, Result};
pub use model::{
    plugin_ids, ApplicationMode, Coordinate, DependencyDeclaration, DependencyScope,
    ModuleConfig, PluginDeclaration, PluginOrigin, Provenance, Snapshot, ToolchainAxis,
    VersionSpec,
};
pub use output::OutputFormat;
pub use version::{Version, VersionError, VersionRange};

/// Schema version of the JSON report and configuration files.
pub const SCHEMA_VERSION: &str = "1.0.0";
