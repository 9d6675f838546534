//! Reconcile - build-configuration reconciliation
//!
//! Reads a directory of build-script snapshots, reconciles each logical
//! module into one consistent configuration and reports conflicts,
//! downgrades and the canonical build script. The exit code carries the
//! outcome (see `exit_codes`).

use clap::{Args, Parser};
use rc_common::{ErrorReport, OutputFormat, SCHEMA_VERSION};
use rc_config::{load_config, resolve_config};
use rc_core::exit_codes::ExitCode;
use rc_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use rc_core::log_event;
use rc_core::pipeline::{Reconciler, RunOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Reconcile divergent Gradle build-script snapshots into one configuration
#[derive(Parser)]
#[command(name = "reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of snapshot entries (build scripts or snapshot directories)
    dir: PathBuf,

    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Module to reconcile (manifest), or the namespace to pin (no manifest)
    #[arg(long)]
    module: Option<String>,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Worker pool size (default from policy)
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Skip modules not started within this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

/// Global options
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Compatibility knowledge base (compat.json)
    #[arg(long, env = "RECONCILE_COMPAT")]
    compat: Option<PathBuf>,

    /// Reconciliation policy (policy.json)
    #[arg(long, env = "RECONCILE_POLICY")]
    policy: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let level = LogLevel::from_flags(cli.global.verbose, cli.global.quiet);
    let format = LogFormat::for_report(cli.global.format);
    init_logging(&LogConfig::from_env(level, format));

    run(&cli).into()
}

fn run(cli: &Cli) -> ExitCode {
    let ctx = LogContext::new(generate_run_id());
    let paths = resolve_config(cli.global.compat.as_deref(), cli.global.policy.as_deref());
    let config = match load_config(&paths) {
        Ok(config) => config,
        Err(e) => return output_error(&cli.global, &ctx, rc_common::Error::from(e).to_report()),
    };
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration loaded",
        fingerprint = config.fingerprint.short_id()
    );

    let mut options = RunOptions::from_policy(&config.policy);
    options.module = cli.run.module.clone();
    options.strict |= cli.run.strict;
    if let Some(jobs) = cli.run.jobs {
        options.jobs = jobs;
    }
    options.timeout = cli.run.timeout.map(Duration::from_secs);

    let reconciler = Reconciler::new(&config, options, ctx.clone());
    let report = match reconciler.run_dir(&cli.dir) {
        Ok(report) => report,
        Err(e) => return output_error(&cli.global, &ctx, e.to_report()),
    };

    match cli.global.format {
        OutputFormat::Json => match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => return output_error(&cli.global, &ctx, e.to_report()),
        },
        OutputFormat::Text => print!("{}", report.to_text()),
    }
    report.exit_code()
}

fn output_error(global: &GlobalOpts, ctx: &LogContext, error: ErrorReport) -> ExitCode {
    log_event!(
        ctx,
        ERROR,
        event_names::CONFIG_ERROR,
        Stage::Init,
        "run aborted",
        code = error.code
    );

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "error": error,
            });
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("error {}: {}", error.code, error.message),
            }
        }
        OutputFormat::Text => {
            eprintln!("reconcile: {} (code {})", error.message, error.code);
            eprintln!("  hint: {}", error.remediation);
        }
    }
    ExitCode::MalformedInput
}
