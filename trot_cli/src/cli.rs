//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective runtime knobs used for the current run (for JSON details).
pub static LAST_RUNTIME: OnceLock<CliRuntime> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliRuntime {
    pub max_runtime_ms: u64,
    pub poll_interval_ms: u64,
    pub max_temp_c: f32,
    pub min_voltage_v: f32,
}

#[derive(Parser, Debug)]
#[command(name = "trot", version, about = "Quadruped trot controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/trot_config.toml")]
    pub config: PathBuf,

    /// Optional offsets CSV (strict header `id,offset_deg`)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stand up and trot until Ctrl-C, the runtime budget, or a health fault
    Walk {
        /// Override safety: max runtime in ms (takes precedence over config)
        #[arg(long, value_name = "MS")]
        max_runtime_ms: Option<u64>,
        /// Override the health poll interval in ms
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,
    },
    /// Stand in the neutral pose, hold, then power down
    Stand {
        /// How long to hold the pose
        #[arg(long, value_name = "MS", default_value_t = 5000)]
        hold_ms: u64,
    },
    /// Check health, move every joint to the home angle and verify it
    Home {
        /// Leave torque on after homing instead of running the shutdown sequence
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Leave the joints powered at the home angle.\n\nBy default homing ends with the same park, diagnose and release sequence as a walk. With this flag the servos keep holding their position when the process exits."
        )]
        keep_torque: bool,
    },
    /// One health check without moving anything
    Health,
    /// Validate config and bus (limits applied, every actuator reachable)
    SelfCheck,
}
