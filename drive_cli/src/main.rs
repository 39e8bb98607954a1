#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `autodrive` command-line entry point.

mod cli;
mod drive;
mod error_fmt;

use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use eyre::{WrapErr, eyre};
use serde_json::json;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use crate::drive::{make_sim, run_drive, self_check};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize, reason_name};
use drive_core::{CancelToken, DriveMode, DriveReport};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::Drive {
            ticks,
            mode,
            max_run_ms,
            stats,
        } => {
            let mode: DriveMode = mode.map_or_else(|| cfg.runner.mode.into(), Into::into);

            let cancel = CancelToken::new();
            let on_signal = cancel.clone();
            ctrlc::set_handler(move || on_signal.cancel())
                .wrap_err("installing Ctrl-C handler")?;

            let sim = make_sim(&cfg);
            let started = Instant::now();
            let result = run_drive(
                &cfg,
                ticks,
                mode,
                max_run_ms,
                (sim.encoders(), sim.motors()),
                stats,
                cancel,
            );
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(report) => {
                    if cli.json {
                        println!("{}", run_record(ticks, mode, duration_ms, Some(&report), None));
                    } else {
                        println!(
                            "Drive complete: position {:.0} ticks (target {ticks:.0}), drift {:.0}, {} cycles in {duration_ms} ms",
                            report.final_position, report.final_drift, report.cycles
                        );
                    }
                    Ok(())
                }
                Err(e) => {
                    if cli.json {
                        println!(
                            "{}",
                            run_record(ticks, mode, duration_ms, None, Some(reason_name(&e)))
                        );
                    }
                    Err(e)
                }
            }
        }
        Commands::SelfCheck => {
            let sim = make_sim(&cfg);
            let (left, right) = self_check(&mut sim.encoders(), &mut sim.motors())?;
            tracing::info!(left, right, "self-check passed");
            if cli.json {
                println!("{}", json!({ "self_check": "ok", "left": left, "right": right }));
            } else {
                println!("self-check ok (encoders {left}/{right})");
            }
            Ok(())
        }
    }
}

/// Explicit `--config` must exist; otherwise fall back to the default path, then defaults.
fn load_config(path: Option<&Path>) -> eyre::Result<drive_config::Config> {
    match path {
        Some(p) => drive_config::load_path(p),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                drive_config::load_path(default)
            } else {
                Ok(drive_config::Config::default())
            }
        }
    }
}

fn init_tracing(json: bool, level: &str, logging: &drive_config::Logging) -> eyre::Result<()> {
    // RUST_LOG wins over --log-level
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("invalid --log-level")?;
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                .wrap_err("invalid logging.level")?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre!("installing tracing subscriber: {e}"))
}

/// One JSON line describing a finished or aborted move.
fn run_record(
    target_ticks: f64,
    mode: DriveMode,
    duration_ms: u64,
    report: Option<&DriveReport>,
    abort_reason: Option<&str>,
) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    json!({
        "timestamp": timestamp,
        "target_ticks": target_ticks,
        "mode": mode.name(),
        "duration_ms": duration_ms,
        "final_position": report.map(|r| r.final_position),
        "final_drift": report.map(|r| r.final_drift),
        "cycles": report.map(|r| r.cycles),
        "overruns": report.map(|r| r.overruns),
        "abort_reason": abort_reason,
    })
    .to_string()
}
