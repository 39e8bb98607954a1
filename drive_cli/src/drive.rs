//! Drive execution: config mapping, drivetrain assembly, and the move itself.

use crate::cli::{CliSafety, LAST_SAFETY};
use drive_core::error::{AbortReason, Result as CoreResult};
use drive_core::{
    CancelToken, DriveMode, DriveReport, MotionParams, RunParams, build_controller,
    run_controller_with,
};
use drive_hardware::{SimDrivetrain, SimParams};

/// Env var that forces the simulated wheels to stall (for tests and demos).
pub const SIM_STALL_ENV: &str = "AUTODRIVE_TEST_SIM_STALL";

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::Cancelled => "Cancelled",
        AbortReason::Stalled => "Stalled",
    }
}

/// Build the simulated drivetrain from `[sim]`, honoring the stall env override.
pub fn make_sim(cfg: &drive_config::Config) -> SimDrivetrain {
    let forced_stall = std::env::var(SIM_STALL_ENV)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false);
    if forced_stall {
        tracing::warn!("{SIM_STALL_ENV} set; simulated wheels will not move");
    }
    SimDrivetrain::new(SimParams {
        left_ticks_per_power: cfg.sim.left_ticks_per_power,
        right_ticks_per_power: cfg.sim.right_ticks_per_power,
        stalled: cfg.sim.stalled || forced_stall,
        encoder_fault: false,
    })
}

/// Merge config and CLI overrides, then run one move to completion.
#[allow(clippy::too_many_arguments)]
pub fn run_drive(
    cfg: &drive_config::Config,
    ticks: f64,
    mode: DriveMode,
    max_run_ms_override: Option<u64>,
    hw: (
        impl drive_traits::Encoders + 'static,
        impl drive_traits::Drive + 'static,
    ),
    stats: bool,
    cancel: CancelToken,
) -> CoreResult<DriveReport> {
    // Config mapping via From impls in drive_core::conversions
    let control: drive_core::ControlCfg = cfg.into();
    let mut safety: drive_core::SafetyCfg = (&cfg.safety).into();
    if let Some(ms) = max_run_ms_override {
        safety.max_run_ms = ms;
    }
    let _ = LAST_SAFETY.set(CliSafety {
        max_run_ms: safety.max_run_ms,
        stall_ticks: safety.stall_ticks,
        stall_ms: safety.stall_ms,
    });

    let (encoders, drive) = hw;

    if !stats {
        return drive_core::drive_to_position(
            encoders,
            drive,
            ticks,
            mode,
            RunParams {
                control,
                safety,
                clock: None,
                cancel: Some(cancel),
            },
        );
    }

    let period_ms = control.loop_period_ms;
    let mut ctrl = build_controller(
        encoders,
        drive,
        MotionParams {
            target_ticks: ticks,
            mode,
            control,
            safety,
            clock: None,
            cancel: Some(cancel),
        },
    )?;

    let mut cycle_us = Vec::new();
    let report = run_controller_with(&mut ctrl, |took| {
        cycle_us.push(u64::try_from(took.as_micros()).unwrap_or(u64::MAX));
    })?;
    print_stats(&cycle_us, &report, period_ms);
    Ok(report)
}

/// One cheap round-trip through every hardware call.
pub fn self_check(
    encoders: &mut impl drive_traits::Encoders,
    drive: &mut impl drive_traits::Drive,
) -> eyre::Result<(i32, i32)> {
    use eyre::eyre;
    drive
        .set_left_power(0.0)
        .and_then(|()| drive.set_right_power(0.0))
        .map_err(|e| eyre!("motor write failed: {e}"))?;
    encoders
        .reset()
        .map_err(|e| eyre!("encoder reset failed: {e}"))?;
    let left = encoders
        .read_left()
        .map_err(|e| eyre!("left encoder read failed: {e}"))?;
    let right = encoders
        .read_right()
        .map_err(|e| eyre!("right encoder read failed: {e}"))?;
    Ok((left, right))
}

/// Print cycle timing stats to stderr.
#[allow(clippy::cast_precision_loss)]
fn print_stats(cycle_us: &[u64], report: &DriveReport, period_ms: u64) {
    let min = cycle_us.iter().min().copied().unwrap_or(0);
    let max = cycle_us.iter().max().copied().unwrap_or(0);
    let avg = if cycle_us.is_empty() {
        0.0
    } else {
        cycle_us.iter().sum::<u64>() as f64 / cycle_us.len() as f64
    };
    let stdev = if cycle_us.len() > 1 {
        let var = cycle_us
            .iter()
            .map(|&x| (x as f64 - avg).powi(2))
            .sum::<f64>()
            / (cycle_us.len() as f64 - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    eprintln!("\n--- Drive Stats ---");
    eprintln!("Cycles: {}", report.cycles);
    eprintln!("Period (ms): {period_ms}");
    eprintln!("Cycle time min/avg/max/stdev (us): {min} / {avg:.1} / {max} / {stdev:.1}");
    eprintln!("Overruns (> period): {}", report.overruns);
    eprintln!("Final drift (ticks): {:.1}", report.final_drift);
    eprintln!("-------------------\n");
}
