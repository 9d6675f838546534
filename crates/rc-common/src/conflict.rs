//! Typed conflict findings.
//!
//! Conflicts are data: the detector collects every finding before any
//! resolution decision, and the resolver only annotates their status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inconsistency found across a snapshot sequence.
///
/// Declaration order is the reporting precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    IdentityDrift,
    DuplicatePluginApplication,
    UnappliedPlugin,
    RedundantDeclaration,
    VersionIncompatibility,
    UnknownCompatibility,
    InvalidOrdering,
    MissingDesugaring,
    BomOverride,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::IdentityDrift => "identity_drift",
            ConflictKind::DuplicatePluginApplication => "duplicate_plugin_application",
            ConflictKind::UnappliedPlugin => "unapplied_plugin",
            ConflictKind::RedundantDeclaration => "redundant_declaration",
            ConflictKind::VersionIncompatibility => "version_incompatibility",
            ConflictKind::UnknownCompatibility => "unknown_compatibility",
            ConflictKind::InvalidOrdering => "invalid_ordering",
            ConflictKind::MissingDesugaring => "missing_desugaring",
            ConflictKind::BomOverride => "bom_override",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What the resolver did about a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    /// Still exhibited by the resolved configuration (or not yet resolved).
    #[default]
    Open,
    /// A later snapshot replaced the offending values.
    Superseded,
    /// The resolver walked an axis back to a compatible value.
    Downgraded,
    /// The caller explicitly chose the module identity.
    Pinned,
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStatus::Open => write!(f, "open"),
            ConflictStatus::Superseded => write!(f, "superseded"),
            ConflictStatus::Downgraded => write!(f, "downgraded"),
            ConflictStatus::Pinned => write!(f, "pinned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    /// 1-based snapshot ordinals involved, ascending.
    pub snapshots: Vec<usize>,
    /// Field / axis / coordinate names involved.
    pub fields: Vec<String>,
    /// Concrete values involved, aligned with the message.
    pub values: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default)]
    pub status: ConflictStatus,
}

impl Conflict {
    pub fn new(kind: ConflictKind, severity: Severity, message: impl Into<String>) -> Self {
        Conflict {
            kind,
            severity,
            snapshots: Vec::new(),
            fields: Vec::new(),
            values: Vec::new(),
            message: message.into(),
            remediation: None,
            status: ConflictStatus::Open,
        }
    }

    pub fn with_snapshots(mut self, snapshots: impl IntoIterator<Item = usize>) -> Self {
        self.snapshots = snapshots.into_iter().collect();
        self.snapshots.sort_unstable();
        self.snapshots.dedup();
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Whether this finding reports at least what `earlier` reported: same
    /// kind and fields, and every earlier value still named.
    ///
    /// Findings grow as snapshots are appended (identity drift names one
    /// more namespace), so coverage rather than equality is the stable
    /// comparison.
    pub fn covers(&self, earlier: &Conflict) -> bool {
        self.kind == earlier.kind
            && self.fields == earlier.fields
            && earlier.values.iter().all(|v| self.values.contains(v))
    }

    /// Whether this conflict should fail the run.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error && self.status == ConflictStatus::Open
    }

    /// Promote warnings to errors (`--strict`).
    pub fn promote(&mut self) {
        if self.severity == Severity::Warning {
            self.severity = Severity::Error;
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)?;
        if self.status != ConflictStatus::Open {
            write!(f, " ({})", self.status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(ConflictKind::IdentityDrift < ConflictKind::DuplicatePluginApplication);
        assert!(ConflictKind::UnappliedPlugin < ConflictKind::VersionIncompatibility);
        assert!(ConflictKind::VersionIncompatibility < ConflictKind::BomOverride);
    }

    #[test]
    fn test_builder_sorts_snapshots() {
        let c = Conflict::new(ConflictKind::IdentityDrift, Severity::Error, "drift")
            .with_snapshots([3, 1, 3]);
        assert_eq!(c.snapshots, vec![1, 3]);
    }

    #[test]
    fn test_promote_only_warnings() {
        let mut warn = Conflict::new(ConflictKind::BomOverride, Severity::Warning, "x");
        warn.promote();
        assert_eq!(warn.severity, Severity::Error);

        let mut info = Conflict::new(ConflictKind::RedundantDeclaration, Severity::Info, "x");
        info.promote();
        assert_eq!(info.severity, Severity::Info);
    }

    #[test]
    fn test_settled_conflict_is_not_blocking() {
        let mut c = Conflict::new(ConflictKind::VersionIncompatibility, Severity::Error, "x");
        assert!(c.is_blocking());
        c.status = ConflictStatus::Downgraded;
        assert!(!c.is_blocking());
    }

    #[test]
    fn test_covers_allows_growing_values() {
        let before = Conflict::new(ConflictKind::IdentityDrift, Severity::Error, "a")
            .with_fields(["namespace"])
            .with_values(["com.a", "com.b"]);
        let after = Conflict::new(ConflictKind::IdentityDrift, Severity::Error, "b")
            .with_fields(["namespace"])
            .with_values(["com.a", "com.b", "com.c"]);
        assert!(after.covers(&before));
        assert!(!before.covers(&after));

        let other_field = after.clone().with_fields(["application_id"]);
        assert!(!other_field.covers(&before));
    }

    #[test]
    fn test_display() {
        let c = Conflict::new(ConflictKind::MissingDesugaring, Severity::Warning, "minSdk 21");
        assert_eq!(c.to_string(), "[warning] missing_desugaring: minSdk 21");
    }
}
