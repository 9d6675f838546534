//! Structured logging for reconcile.
//!
//! - stdout is reserved for the report (JSON or text)
//! - stderr receives all log output, human-readable or JSON lines
//! - every event carries the run id, the module and the pipeline stage
//!
//! ```ignore
//! use rc_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! let ctx = LogContext::new(generate_run_id()).with_module("app");
//! rc_core::log_event!(ctx, INFO, event_names::DETECT_FINISHED, Stage::Detect,
//!     "conflicts detected", conflicts = 3);
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogEnv, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events reach the log.
const LOG_TARGETS: [&str; 3] = ["rc_core", "rc_parse", "rc_config"];

fn default_filter(level: LogLevel) -> EnvFilter {
    let directives = LOG_TARGETS
        .iter()
        .map(|t| format!("{}={}", t, level))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Initialize the logging subsystem.
///
/// Call once at startup. `RC_LOG` (already folded into `config.level`) wins
/// over `RUST_LOG` directives; later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = if std::env::var_os("RC_LOG").is_some() {
        default_filter(config.level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config.level))
    };

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Emit a structured pipeline event.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::PARSE_FINISHED, Stage::Load, "snapshots parsed", count = 4);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            event = $event,
            run_id = %$ctx.run_id,
            module = %$ctx.module_name(),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            event = $event,
            run_id = %$ctx.run_id,
            module = %$ctx.module_name(),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            event = $event,
            run_id = %$ctx.run_id,
            module = %$ctx.module_name(),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            event = $event,
            run_id = %$ctx.run_id,
            module = %$ctx.module_name(),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(id1.starts_with("run-"));
        assert_ne!(id1, id2);
        // run-<12 hex chars>
        assert_eq!(id1.len(), 16);
    }

    #[test]
    fn test_default_filter_names_all_crates() {
        let filter = default_filter(LogLevel::Debug).to_string();
        for target in LOG_TARGETS {
            assert!(filter.contains(&format!("{}=debug", target)), "{}", filter);
        }
    }

    #[test]
    fn test_log_event_macro_compiles_with_fields() {
        let ctx = LogContext::new("run-test").with_module("app");
        crate::log_event!(
            ctx,
            DEBUG,
            event_names::DETECT_FINISHED,
            Stage::Detect,
            "conflicts detected",
            conflicts = 2usize
        );
    }
}
