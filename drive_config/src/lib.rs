#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the drive controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; missing keys take the controller defaults
//!   (kP 0.5 position / 1.0 drift, 100 tick tolerance, 250 ms debounce,
//!   20 ms loop, 10 units/cycle slew).
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

/// PID+F gains for one controller role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainsCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub kf: f64,
}

/// `[position]`: gains of the position loop.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PositionCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub kf: f64,
}

impl Default for PositionCfg {
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.0,
            kd: 0.0,
            kf: 0.0,
        }
    }
}

impl PositionCfg {
    pub fn gains(&self) -> GainsCfg {
        GainsCfg {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            kf: self.kf,
        }
    }
}

/// Reference the drift loop drives `left - right` towards.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DriftReferenceCfg {
    /// Keep both encoders equal.
    #[default]
    Zero,
    /// Use the position target as the drift reference (legacy behavior).
    PositionTarget,
}

/// `[drift]`: gains of the left/right synchronization loop.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DriftCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub kf: f64,
    pub reference: DriftReferenceCfg,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            kf: 0.0,
            reference: DriftReferenceCfg::Zero,
        }
    }
}

impl DriftCfg {
    pub fn gains(&self) -> GainsCfg {
        GainsCfg {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            kf: self.kf,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ControlCfg {
    /// Position error (ticks) considered "at target".
    pub tolerance_ticks: f64,
    /// Error must stay within tolerance this long before the move is done.
    pub debounce_ms: u64,
    /// Fixed control period.
    pub loop_period_ms: u64,
    /// Max change of a motor command per cycle.
    pub max_slew_step: f64,
    /// Integral resets when |error| exceeds this. Absent = unbounded.
    pub integral_range: Option<f64>,
    /// Saturation of the position loop output before drift mixing.
    pub drive_limit: f64,
    /// Actuator range; final commands are clamped to +/- this.
    pub power_limit: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            tolerance_ticks: 100.0,
            debounce_ms: 250,
            loop_period_ms: 20,
            max_slew_step: 10.0,
            integral_range: None,
            drive_limit: 100.0,
            power_limit: 127.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Safety {
    /// Hard cap on a single move.
    pub max_run_ms: u64,
    /// Abort if the averaged position moves less than this many ticks
    /// for `stall_ms` while outside tolerance. 0 disables.
    pub stall_ticks: f64,
    /// See `stall_ticks`. 0 disables the watchdog.
    pub stall_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_run_ms: 15_000,
            stall_ticks: 0.0,
            stall_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    PositionOnly,
    Drift,
    #[default]
    DriftAndSlew,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct RunnerCfg {
    /// Default drive mode when the CLI does not pick one.
    pub mode: RunMode,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters for the simulated drivetrain used by the CLI.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimCfg {
    pub left_ticks_per_power: f64,
    pub right_ticks_per_power: f64,
    pub stalled: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            left_ticks_per_power: 0.1,
            right_ticks_per_power: 0.1,
            stalled: false,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub position: PositionCfg,
    pub drift: DriftCfg,
    pub control: ControlCfg,
    pub safety: Safety,
    pub runner: RunnerCfg,
    pub logging: Logging,
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a TOML config file.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn check_gains(section: &str, g: &GainsCfg) -> eyre::Result<()> {
    for (name, v) in [("kp", g.kp), ("ki", g.ki), ("kd", g.kd), ("kf", g.kf)] {
        if !v.is_finite() {
            eyre::bail!("{section}.{name} must be finite");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Gains
        check_gains("position", &self.position.gains())?;
        check_gains("drift", &self.drift.gains())?;

        // Control
        let c = &self.control;
        if !c.tolerance_ticks.is_finite() || c.tolerance_ticks < 0.0 {
            eyre::bail!("control.tolerance_ticks must be >= 0");
        }
        if c.loop_period_ms == 0 {
            eyre::bail!("control.loop_period_ms must be > 0");
        }
        if c.loop_period_ms > 1000 {
            eyre::bail!("control.loop_period_ms is unreasonably large (>1s)");
        }
        if c.debounce_ms > 60 * 1000 {
            eyre::bail!("control.debounce_ms is unreasonably large (>1min)");
        }
        if !c.max_slew_step.is_finite() || c.max_slew_step <= 0.0 {
            eyre::bail!("control.max_slew_step must be > 0");
        }
        if let Some(r) = c.integral_range
            && (r.is_nan() || r <= 0.0)
        {
            eyre::bail!("control.integral_range must be > 0");
        }
        if !c.power_limit.is_finite() || c.power_limit <= 0.0 {
            eyre::bail!("control.power_limit must be > 0");
        }
        if !c.drive_limit.is_finite() || c.drive_limit <= 0.0 {
            eyre::bail!("control.drive_limit must be > 0");
        }
        if c.drive_limit > c.power_limit {
            eyre::bail!("control.drive_limit must be <= control.power_limit");
        }

        // Safety
        if self.safety.max_run_ms == 0 {
            eyre::bail!("safety.max_run_ms must be >= 1");
        }
        if self.safety.max_run_ms > 10 * 60 * 1000 {
            eyre::bail!("safety.max_run_ms is unreasonably large (>10min)");
        }
        if !self.safety.stall_ticks.is_finite() || self.safety.stall_ticks < 0.0 {
            eyre::bail!("safety.stall_ticks must be >= 0");
        }

        // Sim
        if !self.sim.left_ticks_per_power.is_finite() || !self.sim.right_ticks_per_power.is_finite()
        {
            eyre::bail!("sim.*_ticks_per_power must be finite");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("empty toml parses");
        assert_eq!(cfg.position.kp, 0.5);
        assert_eq!(cfg.drift.kp, 1.0);
        assert_eq!(cfg.drift.reference, DriftReferenceCfg::Zero);
        assert_eq!(cfg.control.tolerance_ticks, 100.0);
        assert_eq!(cfg.control.debounce_ms, 250);
        assert_eq!(cfg.control.loop_period_ms, 20);
        assert_eq!(cfg.control.max_slew_step, 10.0);
        assert!(cfg.control.integral_range.is_none());
        assert_eq!(cfg.runner.mode, RunMode::DriftAndSlew);
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn partial_sections_keep_their_own_defaults() {
        let cfg = load_toml(
            r#"
[position]
kp = 0.3
kd = 0.01

[drift]
ki = 0.2
reference = "position-target"
"#,
        )
        .unwrap();
        assert_eq!(cfg.position.kp, 0.3);
        assert_eq!(cfg.position.kd, 0.01);
        assert_eq!(cfg.drift.kp, 1.0);
        assert_eq!(cfg.drift.ki, 0.2);
        assert_eq!(cfg.drift.reference, DriftReferenceCfg::PositionTarget);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        assert!(load_toml("[runner]\nmode = \"warp\"\n").is_err());
    }
}
