//! Reconcile Core Library
//!
//! This library provides the reconciliation engine:
//! - Snapshot store with ordinal provenance
//! - Conflict detection over a snapshot sequence
//! - Deterministic resolution with downgrade annotations
//! - Invariant validation of the resolved candidate
//! - Canonical build-script rendering and run reports
//! - Exit codes, structured logging and the run pipeline
//!
//! The binary entry point is in `main.rs`.

pub mod detect;
pub mod exit_codes;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod resolve;
pub mod store;
pub mod validate;

pub use detect::{detect, DetectOptions};
pub use exit_codes::ExitCode;
pub use manifest::{Manifest, ModuleSpec, MANIFEST_FILE};
pub use pipeline::{discover, Reconciler, RunOptions};
pub use report::{ModuleOutcome, ModuleReport, RunReport};
pub use resolve::{resolve, Reason, Resolution, ResolvedConfig, UnresolvableConfig};
pub use store::SnapshotStore;
pub use validate::{validate, InvariantViolation, Rule, Verdict};
