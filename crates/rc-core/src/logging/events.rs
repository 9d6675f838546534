//! Structured event vocabulary.
//!
//! Every pipeline log line carries an event name, the stage it was emitted
//! from and the run id, so JSONL output can be grouped per run and module.

use serde::{Deserialize, Serialize};

/// Processing stages in the reconcile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and manifest loading.
    Init,
    /// Snapshot discovery and document parsing.
    Load,
    Detect,
    Resolve,
    Validate,
    /// Report rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Detect => "detect",
            Stage::Resolve => "resolve",
            Stage::Validate => "validate",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Load stage
    pub const PARSE_STARTED: &str = "parse.started";
    pub const PARSE_MALFORMED: &str = "parse.malformed";
    pub const PARSE_FINISHED: &str = "parse.finished";

    // Detect stage
    pub const DETECT_CONFLICT: &str = "detect.conflict";
    pub const DETECT_FINISHED: &str = "detect.finished";

    // Resolve stage
    pub const RESOLVE_LOCKED: &str = "resolve.locked";
    pub const RESOLVE_DOWNGRADED: &str = "resolve.downgraded";
    pub const RESOLVE_UNRESOLVABLE: &str = "resolve.unresolvable";
    pub const RESOLVE_FINISHED: &str = "resolve.finished";

    // Validate stage
    pub const VALIDATE_VIOLATION: &str = "validate.violation";
    pub const VALIDATE_FINISHED: &str = "validate.finished";

    // Module scheduling
    pub const MODULE_SKIPPED: &str = "module.skipped";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";
    pub const MANIFEST_LOADED: &str = "manifest.loaded";
}

/// Correlation ids shared by every event of one run.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Module being processed, once known.
    pub module: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            module: None,
        }
    }

    /// Context for one module of the same run.
    pub fn with_module(&self, module: impl Into<String>) -> Self {
        LogContext {
            run_id: self.run_id.clone(),
            module: Some(module.into()),
        }
    }

    /// Module name for log fields; `-` before a module is chosen.
    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or("-")
    }
}
