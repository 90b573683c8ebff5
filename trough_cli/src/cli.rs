//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "trough", version, about = "Ball trough controller simulator")]
pub struct Cli {
    /// Path to the machine TOML
    #[arg(long, value_name = "FILE", default_value = "etc/trough.toml")]
    pub config: PathBuf,

    /// Emit JSON lines (logs, results and errors) instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Also write JSON logs to this file (overrides logging.file in the config)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the machine config, then build a controller on simulated hardware
    Check,
    /// Replay a timed switch script against a simulated clock
    Simulate {
        /// Scenario CSV with headers `at_ms,switch,state`
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
        /// Balls to request before the script starts
        #[arg(long, value_name = "N", default_value_t = 0)]
        launch: u32,
        /// Turn ball save on before the script starts
        #[arg(long = "ball-save", action = ArgAction::SetTrue)]
        ball_save: bool,
        /// Keep simulating this long after the last scripted event
        #[arg(long = "tail-ms", value_name = "MS", default_value_t = 5000)]
        tail_ms: u64,
    },
    /// Run the controller in real time on simulated hardware until Ctrl-C.
    ///
    /// Commands are read from stdin, one per line:
    /// `switch <name> on|off`, `launch <n>`, `plunge <n>`, `save on|off`,
    /// `reset`, `stop`.
    Run,
}
