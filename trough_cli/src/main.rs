mod cli;
mod error_fmt;
mod sim;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::sim::SimReport;
use trough_core::TroughStatus;
use trough_core::runner::RunSummary;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = trough_config::load_file(&cli.config)?;
    cfg.validate().wrap_err("invalid configuration")?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Check => {
            let clock = trough_traits::ManualClock::new();
            let m = sim::assemble(&cfg, &clock)?;
            let status = m.trough.snapshot();
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "num_balls": cfg.machine.num_balls,
                        "positions": cfg.trough.position_switches.len(),
                        "plunger": cfg.trough.plunge_coil.is_some(),
                        "early_save_switches": cfg.trough.early_save_switches.len(),
                        "status": status_json(&status),
                    })
                );
            } else {
                println!(
                    "config OK: {} balls, {} trough positions, plunger: {}",
                    cfg.machine.num_balls,
                    cfg.trough.position_switches.len(),
                    if cfg.trough.plunge_coil.is_some() { "yes" } else { "no" },
                );
                print_status(&status);
            }
        }
        Commands::Simulate {
            scenario,
            launch,
            ball_save,
            tail_ms,
        } => {
            let rows = trough_config::load_scenario_csv(scenario).wrap_err("load scenario")?;
            let report = sim::simulate(
                &cfg,
                &rows,
                *launch,
                *ball_save,
                Duration::from_millis(*tail_ms),
            )
            .wrap_err("simulate scenario")?;
            if cli.json {
                println!("{}", report_json(&report));
            } else {
                print_report(&report);
            }
        }
        Commands::Run => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            let (summary, status) = sim::run_realtime(&cfg, &shutdown)?;
            if cli.json {
                println!("{}", run_json(&summary, &status));
            } else {
                println!(
                    "run finished: {} inputs, {} timers fired",
                    summary.inputs, summary.timers_fired
                );
                print_status(&status);
            }
        }
    }
    Ok(())
}

fn make_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Console output goes to stderr so stdout stays machine-readable.
/// A file layer (always JSON) is added when `--log-file` or `logging.file` is set.
fn init_tracing(cli: &Cli, logging: &trough_config::Logging) -> Result<()> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if cli.json {
        layers.push(
            console
                .json()
                .with_filter(make_filter(&cli.log_level))
                .boxed(),
        );
    } else {
        layers.push(console.with_filter(make_filter(&cli.log_level)).boxed());
    }

    let file = cli
        .log_file
        .clone()
        .or_else(|| logging.file.as_ref().map(PathBuf::from));
    if let Some(path) = file {
        let (dir, name) = split_log_path(&path)?;
        let appender = match logging.rotation.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or(&cli.log_level);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(make_filter(level))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("log file path {:?} has no file name", path))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(name)))
}

fn status_json(s: &TroughStatus) -> serde_json::Value {
    serde_json::json!({
        "balls_in_reservoir": s.balls_in_reservoir,
        "balls_in_play": s.balls_in_play,
        "balls_locked": s.balls_locked,
        "balls_pending_launch": s.balls_pending_launch,
        "launch_requests": s.launch_requests,
        "eject_in_progress": s.eject_in_progress,
        "ball_save_active": s.ball_save_active,
        "launch_halted": s.launch_halted,
        "is_full": s.is_full,
    })
}

fn report_json(r: &SimReport) -> serde_json::Value {
    serde_json::json!({
        "elapsed_ms": r.elapsed_ms,
        "transitions": r.transitions,
        "timers_fired": r.timers_fired,
        "drains": r.drains,
        "saves": r.saves,
        "all_launched": r.all_launched,
        "eject_failures": r.eject_failures,
        "ready_signals": r.ready_signals,
        "ejects": r.ejects,
        "plunges": r.plunges,
        "status": status_json(&r.status),
    })
}

fn run_json(summary: &RunSummary, status: &TroughStatus) -> serde_json::Value {
    serde_json::json!({
        "inputs": summary.inputs,
        "timers_fired": summary.timers_fired,
        "status": status_json(status),
    })
}

fn print_status(s: &TroughStatus) {
    println!(
        "trough: {} in reservoir{}, {} in play, {} locked",
        s.balls_in_reservoir,
        if s.is_full { " (full)" } else { "" },
        s.balls_in_play,
        s.balls_locked,
    );
    println!(
        "launch: {} pending in {} request(s), eject in progress: {}, halted: {}",
        s.balls_pending_launch, s.launch_requests, s.eject_in_progress, s.launch_halted,
    );
    println!("ball save: {}", if s.ball_save_active { "on" } else { "off" });
}

fn print_report(r: &SimReport) {
    println!(
        "simulated {} ms: {} switch transitions, {} timers fired",
        r.elapsed_ms, r.transitions, r.timers_fired
    );
    println!(
        "events: {} drain(s), {} save(s), {} launch batch(es) complete, {} eject failure(s), {} start signal(s)",
        r.drains, r.saves, r.all_launched, r.eject_failures, r.ready_signals
    );
    println!("coils: {} eject pulse(s), {} plunge(s)", r.ejects, r.plunges);
    print_status(&r.status);
}
