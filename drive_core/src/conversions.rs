//! `From` implementations bridging `drive_config` types to `drive_core` types.

use crate::config::{ControlCfg, DriftReference, DriveMode, PidGains, SafetyCfg};

// ── Gains ────────────────────────────────────────────────────────────────────

impl From<drive_config::GainsCfg> for PidGains {
    fn from(g: drive_config::GainsCfg) -> Self {
        Self::new(g.kp, g.ki, g.kd, g.kf)
    }
}

impl From<drive_config::DriftReferenceCfg> for DriftReference {
    fn from(r: drive_config::DriftReferenceCfg) -> Self {
        match r {
            drive_config::DriftReferenceCfg::Zero => Self::Zero,
            drive_config::DriftReferenceCfg::PositionTarget => Self::PositionTarget,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

/// The runtime control config spans `[position]`, `[drift]` and `[control]`.
impl From<&drive_config::Config> for ControlCfg {
    fn from(cfg: &drive_config::Config) -> Self {
        let c = &cfg.control;
        Self {
            position: cfg.position.gains().into(),
            drift: cfg.drift.gains().into(),
            drift_reference: cfg.drift.reference.into(),
            tolerance_ticks: c.tolerance_ticks,
            debounce_ms: c.debounce_ms,
            loop_period_ms: c.loop_period_ms,
            max_slew_step: c.max_slew_step,
            integral_range: c.integral_range.unwrap_or(f64::INFINITY),
            drive_limit: c.drive_limit,
            power_limit: c.power_limit,
        }
    }
}

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&drive_config::Safety> for SafetyCfg {
    fn from(c: &drive_config::Safety) -> Self {
        Self {
            max_run_ms: c.max_run_ms,
            stall_ticks: c.stall_ticks,
            stall_ms: c.stall_ms,
        }
    }
}

// ── DriveMode ────────────────────────────────────────────────────────────────

impl From<drive_config::RunMode> for DriveMode {
    fn from(m: drive_config::RunMode) -> Self {
        match m {
            drive_config::RunMode::PositionOnly => Self::PositionOnly,
            drive_config::RunMode::Drift => Self::WithDriftCorrection,
            drive_config::RunMode::DriftAndSlew => Self::WithDriftAndSlew,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_sections_map_onto_runtime_config() {
        let cfg = drive_config::load_toml(
            r#"
[position]
kp = 0.3
[drift]
kp = 0.8
reference = "position-target"
[control]
tolerance_ticks = 40.0
integral_range = 150.0
[runner]
mode = "position-only"
"#,
        )
        .unwrap();
        let control = ControlCfg::from(&cfg);
        assert_eq!(control.position, PidGains::p(0.3));
        assert_eq!(control.drift, PidGains::p(0.8));
        assert_eq!(control.drift_reference, DriftReference::PositionTarget);
        assert_eq!(control.tolerance_ticks, 40.0);
        assert_eq!(control.integral_range, 150.0);
        assert_eq!(DriveMode::from(cfg.runner.mode), DriveMode::PositionOnly);
    }

    #[test]
    fn absent_integral_range_is_unbounded() {
        let cfg = drive_config::Config::default();
        assert!(ControlCfg::from(&cfg).integral_range.is_infinite());
        assert_eq!(SafetyCfg::from(&cfg.safety).max_run_ms, 15_000);
    }
}
