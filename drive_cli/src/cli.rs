//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective safety knobs used for the current run (for JSON details).
pub static LAST_SAFETY: OnceLock<CliSafety> = OnceLock::new();

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG: &str = "etc/drive_config.toml";

#[derive(Copy, Clone, Debug)]
pub struct CliSafety {
    pub max_run_ms: u64,
    pub stall_ticks: f64,
    pub stall_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "autodrive", version, about = "Two-wheel drive-to-position CLI")]
pub struct Cli {
    /// Path to config TOML (default: etc/drive_config.toml if present, else built-in defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

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

/// Which control loops run during a move.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    /// Position loop only
    PositionOnly,
    /// Position loop plus left/right drift correction
    Drift,
    /// Drift correction with slew-rate limited motor commands
    DriftAndSlew,
}

impl From<ModeArg> for drive_core::DriveMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::PositionOnly => Self::PositionOnly,
            ModeArg::Drift => Self::WithDriftCorrection,
            ModeArg::DriftAndSlew => Self::WithDriftAndSlew,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive both wheels to a relative encoder position
    Drive {
        /// Target position in encoder ticks, relative to the current pose
        #[arg(long, allow_negative_numbers = true)]
        ticks: f64,
        /// Control mode (defaults to [runner].mode from the config)
        #[arg(long, value_enum, value_name = "MODE")]
        mode: Option<ModeArg>,
        /// Override safety: max run time in ms (takes precedence over config)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Print control loop timing stats
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Quick health check of the drivetrain (sim ok)
    SelfCheck,
}
