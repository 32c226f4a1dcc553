//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "honey", version, about = "Honey dispenser controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/honey.toml")]
    pub config: PathBuf,

    /// Log and print telemetry as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop, reading operator commands from stdin
    #[command(long_about = "Run the control loop.\n\nOperator commands, one per line: start, stop, tare, calibrate, set <name> <value>.\nOn the simulated bench `place` and `remove` put a jar on or take it off the scale.\nScripts may also use `wait <ms>` to pause between commands.")]
    Run {
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        max_runtime_ms: Option<u64>,
        /// Read commands from FILE instead of stdin
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
        /// Minimum interval between telemetry lines
        #[arg(long, value_name = "MS", default_value_t = 500)]
        telemetry_ms: u64,
        /// Print loop statistics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Quick health check: read the scale once and close the valve
    SelfCheck,
}
