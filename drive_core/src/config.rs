//! Configuration types for the motion controller.
//!
//! These are the runtime configuration structs used by `MotionController`.
//! They are separate from the TOML-deserialized config in `drive_config`.

/// Gains of one PID+F controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub kf: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64, kf: f64) -> Self {
        Self { kp, ki, kd, kf }
    }

    /// Proportional-only gains.
    pub const fn p(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite() && self.kf.is_finite()
    }
}

/// Which loops a move runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    /// Position loop only; both wheels get the same command.
    PositionOnly,
    /// Position loop plus the left/right drift loop.
    WithDriftCorrection,
    /// Position and drift loops, with slew-rate limited outputs.
    #[default]
    WithDriftAndSlew,
}

impl DriveMode {
    #[inline]
    pub fn uses_drift(self) -> bool {
        !matches!(self, Self::PositionOnly)
    }

    #[inline]
    pub fn uses_slew(self) -> bool {
        matches!(self, Self::WithDriftAndSlew)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PositionOnly => "position-only",
            Self::WithDriftCorrection => "drift",
            Self::WithDriftAndSlew => "drift-and-slew",
        }
    }
}

/// Reference value for the drift loop (`left - right`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftReference {
    /// Drive the encoder difference to zero.
    #[default]
    Zero,
    /// Use the position target as reference. Reproduces an older controller
    /// revision; the wheels are pushed apart by `target` ticks.
    PositionTarget,
}

/// Control configuration (gains, tolerances, limits, loop timing).
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Position loop gains. Default: kP 0.5.
    pub position: PidGains,
    /// Drift loop gains. Default: kP 1.0.
    pub drift: PidGains,
    pub drift_reference: DriftReference,
    /// Position error (ticks) counted as "at target". Default: 100.
    pub tolerance_ticks: f64,
    /// Error must stay within tolerance for longer than this. Default: 250 ms.
    pub debounce_ms: u64,
    /// Fixed control period. Default: 20 ms (50 Hz).
    pub loop_period_ms: u64,
    /// Max per-cycle change of each motor command. Default: 10.
    pub max_slew_step: f64,
    /// Integral term resets when |error| exceeds this. Default: unbounded.
    pub integral_range: f64,
    /// Saturation of the position loop output. Default: 100.
    pub drive_limit: f64,
    /// Actuator range for the final commands. Default: 127.
    pub power_limit: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            position: PidGains::p(0.5),
            drift: PidGains::p(1.0),
            drift_reference: DriftReference::Zero,
            tolerance_ticks: 100.0,
            debounce_ms: 250,
            loop_period_ms: 20,
            max_slew_step: 10.0,
            integral_range: f64::INFINITY,
            drive_limit: 100.0,
            power_limit: 127.0,
        }
    }
}

/// Safety configuration for runtime and stall guards.
#[derive(Debug, Clone)]
pub struct SafetyCfg {
    /// Hard cap on a single move in milliseconds.
    pub max_run_ms: u64,
    /// Abort if the averaged position moves less than this many ticks for
    /// `stall_ms` while outside tolerance. 0.0 disables.
    pub stall_ticks: f64,
    /// See `stall_ticks`. 0 disables the watchdog.
    pub stall_ms: u64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 15_000,
            stall_ticks: 0.0,
            stall_ms: 0,
        }
    }
}

impl SafetyCfg {
    #[inline]
    pub(crate) fn stall_watchdog_enabled(&self) -> bool {
        self.stall_ms > 0 && self.stall_ticks > 0.0
    }
}
