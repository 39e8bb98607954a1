use thiserror::Error;

/// Why a move was stopped before reaching its target.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("cancelled by caller")]
    Cancelled,
    #[error("drivetrain stalled")]
    Stalled,
}

#[derive(Debug, Error, Clone)]
pub enum DriveError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout: target not reached within {max_run_ms} ms (ran {elapsed_ms} ms)")]
    Timeout { elapsed_ms: u64, max_run_ms: u64 },
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing encoders")]
    MissingEncoders,
    #[error("missing drive")]
    MissingDrive,
    #[error("missing target ticks")]
    MissingTarget,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
