//! `trot` binary: config loading, logging, signal handling and command dispatch.

mod cli;
mod commands;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};
use trot_core::TrotError;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error hooks: {e}");
    }

    let mut guard = None;
    let code = match run(cli, &mut guard) {
        Ok(()) => 0,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    // Flush the file writer before exiting.
    drop(guard);
    std::process::exit(code);
}

fn run(cli: Cli, guard: &mut Option<WorkerGuard>) -> Result<()> {
    let cfg = load_config(&cli)?;
    *guard = init_tracing(&cli, &cfg.logging)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler; only the runtime budget will stop the session");
        }
    }

    let bus = commands::open_bus(&cfg)?;
    let json = cli.json;
    match cli.cmd {
        Commands::Walk { .. } => {
            let mut session = commands::build_session(&cfg, bus, Some(stop))?;
            let summary = session.run();
            emit(json, commands::summary_json(&summary), || commands::summary_text(&summary));
            summary.into_result().map(|_| ())
        }
        Commands::Stand { hold_ms } => {
            let mut session = commands::build_session(&cfg, bus, Some(stop))?;
            let summary = session.stand_only(Duration::from_millis(hold_ms));
            emit(json, commands::summary_json(&summary), || commands::summary_text(&summary));
            summary.into_result().map(|_| ())
        }
        Commands::Home { keep_torque } => {
            let session = commands::build_session(&cfg, bus, None)?;
            let (report, outcome) = commands::run_home(session, keep_torque)?;
            emit(json, commands::homing_json(&report, outcome.as_ref()), || {
                commands::homing_text(&report, outcome.as_ref())
            });
            Ok(())
        }
        Commands::Health => {
            let mut session = commands::build_session(&cfg, bus, None)?;
            let report = session.check_health();
            emit(json, commands::report_json(&report), || format!("Health: {report}"));
            if report.is_pass() {
                Ok(())
            } else {
                Err(TrotError::HealthViolation(report.summary()).into())
            }
        }
        Commands::SelfCheck => {
            let session = commands::build_session(&cfg, bus, None)?;
            let n = session.mapper().calibration().len();
            emit(
                json,
                serde_json::json!({ "ok": true, "actuators": n }),
                || format!("OK: config valid, {n} actuators reachable, angle limits applied"),
            );
            Ok(())
        }
    }
}

fn emit(json: bool, value: serde_json::Value, text: impl FnOnce() -> String) {
    if json {
        println!("{value}");
    } else {
        println!("{}", text());
    }
}

/// Read, merge (offsets CSV, CLI overrides) and validate the config.
fn load_config(cli: &Cli) -> Result<trot_config::Config> {
    let text = std::fs::read_to_string(&cli.config).map_err(|e| {
        TrotError::Config(format!("read config {}: {e}", cli.config.display()))
    })?;
    let mut cfg: trot_config::Config = toml::from_str(&text).map_err(|e| {
        TrotError::Config(format!("parse config {}: {e}", cli.config.display()))
    })?;

    if let Some(path) = &cli.calibration {
        let rows = trot_config::load_offsets_csv(path)
            .map_err(|e| TrotError::Config(format!("{e:#}")))?;
        cfg.apply_offsets(&rows)
            .map_err(|e| TrotError::Config(format!("{e:#}")))?;
    }

    if let Commands::Walk {
        max_runtime_ms,
        poll_ms,
    } = &cli.cmd
    {
        if let Some(ms) = max_runtime_ms {
            cfg.safety.max_runtime_ms = *ms;
        }
        if let Some(ms) = poll_ms {
            cfg.health.poll_interval_ms = *ms;
        }
    }

    cfg.validate()
        .map_err(|e| TrotError::Config(format!("{e:#}")))?;
    Ok(cfg)
}

/// Console layer (pretty or JSON, filtered by RUST_LOG or --log-level) plus an
/// optional JSON-lines file from `[logging]`.
fn init_tracing(cli: &Cli, logging: &trot_config::Logging) -> Result<Option<WorkerGuard>> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&cli.log_level)?,
    };
    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let (file, guard) = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| TrotError::Config(format!("logging.file {path:?} has no file name")))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let level = logging.level.as_deref().unwrap_or("info");
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::try_new(level)?)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}
