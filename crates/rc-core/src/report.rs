//! Run report: per-module conflicts, outcome and canonical document.
//!
//! The JSON form is the machine contract (stdout with `--format json`); the
//! text form is for people reading a terminal.

use crate::exit_codes::ExitCode;
use crate::resolve::{ResolvedConfig, UnresolvableConfig};
use crate::validate::InvariantViolation;
use chrono::{DateTime, Utc};
use rc_common::{Conflict, ConflictStatus, ErrorReport, Severity, Snapshot};
use rc_config::ConfigFingerprint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub index: usize,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(s: &Snapshot) -> Self {
        SnapshotSummary {
            index: s.index,
            source: s.provenance.source.clone(),
            intent: s.provenance.intent.clone(),
        }
    }
}

/// A document that was skipped because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedInput {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    pub error: ErrorReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleOutcome {
    Accepted {
        config: ResolvedConfig,
        document: String,
    },
    /// Resolved, but the candidate breaks an invariant.
    Rejected {
        config: ResolvedConfig,
        document: String,
        diagnostics: Vec<InvariantViolation>,
    },
    Unresolvable {
        error: UnresolvableConfig,
    },
    /// Not processed (deadline passed before the module started).
    Skipped {
        reason: String,
    },
}

impl ModuleOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleOutcome::Accepted { .. } => "accepted",
            ModuleOutcome::Rejected { .. } => "rejected",
            ModuleOutcome::Unresolvable { .. } => "unresolvable",
            ModuleOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn config(&self) -> Option<&ResolvedConfig> {
        match self {
            ModuleOutcome::Accepted { config, .. } | ModuleOutcome::Rejected { config, .. } => {
                Some(config)
            }
            _ => None,
        }
    }

    /// Coded errors for a module that was not accepted.
    pub fn errors(&self, module: &str) -> Vec<ErrorReport> {
        match self {
            ModuleOutcome::Unresolvable { error } => {
                vec![rc_common::Error::from(error.clone()).to_report()]
            }
            ModuleOutcome::Rejected { diagnostics, .. } => diagnostics
                .iter()
                .map(|d| d.to_error(module).to_report())
                .collect(),
            ModuleOutcome::Accepted { .. } | ModuleOutcome::Skipped { .. } => Vec::new(),
        }
    }

    pub fn document(&self) -> Option<&str> {
        match self {
            ModuleOutcome::Accepted { document, .. }
            | ModuleOutcome::Rejected { document, .. } => Some(document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_namespace: Option<String>,
    pub snapshots: Vec<SnapshotSummary>,
    pub conflicts: Vec<Conflict>,
    pub outcome: ModuleOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorReport>,
}

impl ModuleReport {
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ModuleReport {
            name: name.into(),
            pinned_namespace: None,
            snapshots: Vec::new(),
            conflicts: Vec::new(),
            outcome: ModuleOutcome::Skipped {
                reason: reason.into(),
            },
            errors: Vec::new(),
        }
    }

    pub fn blocking_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| c.is_blocking())
    }

    pub fn exit_code(&self) -> ExitCode {
        let accepted = matches!(self.outcome, ModuleOutcome::Accepted { .. });
        if accepted && self.blocking_conflicts().next().is_none() {
            ExitCode::Accepted
        } else {
            ExitCode::Conflicts
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Snapshot directory or buffer label the run read.
    pub input: String,
    pub config: ConfigFingerprint,
    pub malformed: Vec<MalformedInput>,
    pub modules: Vec<ModuleReport>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, input: impl Into<String>, config: ConfigFingerprint) -> Self {
        RunReport {
            schema_version: rc_common::SCHEMA_VERSION.to_string(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            input: input.into(),
            config,
            malformed: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Malformed input wins over conflicts; otherwise the worst module.
    pub fn exit_code(&self) -> ExitCode {
        if !self.malformed.is_empty() {
            return ExitCode::MalformedInput;
        }
        self.modules
            .iter()
            .map(ModuleReport::exit_code)
            .fold(ExitCode::Accepted, ExitCode::worst)
    }

    pub fn to_json(&self) -> rc_common::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let snapshots: usize = self.modules.iter().map(|m| m.snapshots.len()).sum();
        out.push_str(&format!(
            "reconcile {}: {} module(s), {} snapshot(s), config {}\n",
            self.run_id,
            self.modules.len(),
            snapshots,
            self.config.short_id()
        ));

        if !self.malformed.is_empty() {
            out.push_str("\nmalformed input (skipped):\n");
            for m in &self.malformed {
                out.push_str(&format!("  {}: {}\n", m.source, m.error.message));
            }
        }

        for module in &self.modules {
            text_module(&mut out, module);
        }

        out.push_str(&format!("\nresult: {}\n", self.exit_code().code_name()));
        out
    }
}

fn text_module(out: &mut String, module: &ModuleReport) {
    out.push_str(&format!(
        "\n== module {}: {} ==\n",
        module.name,
        module.outcome.name()
    ));
    if let Some(pin) = &module.pinned_namespace {
        out.push_str(&format!("namespace pinned to {}\n", pin));
    }

    if !module.snapshots.is_empty() {
        out.push_str("snapshots:\n");
        for s in &module.snapshots {
            match &s.intent {
                Some(intent) => out.push_str(&format!("  #{} {}  ({})\n", s.index, s.source, intent)),
                None => out.push_str(&format!("  #{} {}\n", s.index, s.source)),
            }
        }
    }

    if !module.conflicts.is_empty() {
        out.push_str("conflicts:\n");
        for c in &module.conflicts {
            let ordinals = c
                .snapshots
                .iter()
                .map(|i| format!("#{}", i))
                .collect::<Vec<_>>()
                .join(",");
            let marker = match (c.severity, c.status) {
                (Severity::Error, ConflictStatus::Open) => "!",
                _ => " ",
            };
            out.push_str(&format!(" {} {} [{}]\n", marker, c, ordinals));
            if let Some(fix) = &c.remediation {
                out.push_str(&format!("      fix: {}\n", fix));
            }
        }
    }

    match &module.outcome {
        ModuleOutcome::Unresolvable { error } => {
            out.push_str(&format!("unresolvable: {}\n", error));
            for c in &error.constraints {
                out.push_str(&format!("  locked: {}\n", c));
            }
            for r in &error.rejected {
                out.push_str(&format!(
                    "  rejected {} (#{}): {}\n",
                    r.value, r.snapshot, r.because
                ));
            }
        }
        ModuleOutcome::Skipped { reason } => {
            out.push_str(&format!("skipped: {}\n", reason));
        }
        ModuleOutcome::Rejected { diagnostics, .. } => {
            out.push_str("invariant violations:\n");
            for d in diagnostics {
                out.push_str(&format!("  {}\n", d));
            }
        }
        ModuleOutcome::Accepted { .. } => {}
    }

    if let Some(config) = module.outcome.config() {
        let downgrades = config.downgrades();
        if !downgrades.is_empty() {
            out.push_str("downgrades:\n");
            for (field, from, to) in downgrades {
                out.push_str(&format!("  {}: {} -> {}\n", field, from, to));
            }
        }
    }
    if let Some(document) = module.outcome.document() {
        out.push_str("--- build.gradle.kts ---\n");
        out.push_str(document);
    }
}
