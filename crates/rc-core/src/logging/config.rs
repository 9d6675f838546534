//! Logging configuration.
//!
//! The effective config is folded from three layers, weakest first:
//! built-in defaults, the environment (`RC_LOG`, `RUST_LOG`,
//! `RC_LOG_FORMAT`) and the CLI (`-v`/`-q`, `--format`).

use rc_common::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where log lines go and how they look. Both variants write to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl LogFormat {
    /// Log format implied by the report format, if it implies one.
    ///
    /// A JSON report is read by tools, so its log stream is JSON lines too.
    pub fn for_report(report: OutputFormat) -> Option<LogFormat> {
        match report {
            OutputFormat::Json => Some(LogFormat::Jsonl),
            OutputFormat::Text => None,
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// stdout carries the report, so stderr stays quiet by default.
    #[default]
    Warn,
    Error,
    Off,
}

/// Canonical spelling first; the rest are accepted aliases.
const LEVEL_NAMES: [(LogLevel, &[&str]); 6] = [
    (LogLevel::Trace, &["trace"]),
    (LogLevel::Debug, &["debug"]),
    (LogLevel::Info, &["info"]),
    (LogLevel::Warn, &["warn", "warning"]),
    (LogLevel::Error, &["error"]),
    (LogLevel::Off, &["off", "quiet"]),
];

impl LogLevel {
    /// Level selected by `-v` repetitions and `-q`; `None` leaves the
    /// environment in charge.
    pub fn from_flags(verbose: u8, quiet: bool) -> Option<LogLevel> {
        if quiet {
            return Some(LogLevel::Error);
        }
        match verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }

    pub fn as_str(self) -> &'static str {
        LEVEL_NAMES
            .iter()
            .find(|(level, _)| *level == self)
            .map_or("warn", |(_, names)| names[0])
    }

    /// Most verbose level mentioned anywhere in a `RUST_LOG` directive list.
    fn most_verbose_in(directives: &str) -> Option<LogLevel> {
        directives
            .split(',')
            .filter_map(|d| d.rsplit('=').next())
            .filter_map(|name| name.trim().parse::<LogLevel>().ok())
            .filter(|level| *level != LogLevel::Off)
            .min()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        LEVEL_NAMES
            .iter()
            .find(|(_, names)| names.contains(&lower.as_str()))
            .map(|(level, _)| *level)
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging-related environment, captured once.
#[derive(Debug, Clone, Default)]
pub struct LogEnv {
    pub rc_log: Option<String>,
    pub rust_log: Option<String>,
    pub rc_log_format: Option<String>,
}

impl LogEnv {
    pub fn capture() -> Self {
        LogEnv {
            rc_log: std::env::var("RC_LOG").ok(),
            rust_log: std::env::var("RUST_LOG").ok(),
            rc_log_format: std::env::var("RC_LOG_FORMAT").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Warn,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Config from the process environment plus CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::layered(&LogEnv::capture(), cli_level, cli_format)
    }

    /// Fold defaults, `env` and CLI overrides. Unparseable environment
    /// values are ignored; `RC_LOG` shadows `RUST_LOG`.
    pub fn layered(env: &LogEnv, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        let defaults = LogConfig::default();

        let env_level = match (&env.rc_log, &env.rust_log) {
            (Some(rc), _) => rc.parse().ok(),
            (None, Some(rust)) => LogLevel::most_verbose_in(rust),
            (None, None) => None,
        };
        let env_format = env.rc_log_format.as_deref().and_then(|f| f.parse().ok());

        LogConfig {
            level: cli_level.or(env_level).unwrap_or(defaults.level),
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            timestamps: defaults.timestamps,
        }
    }
}
