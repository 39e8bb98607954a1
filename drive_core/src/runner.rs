use std::sync::Arc;
use std::time::{Duration, Instant};

use drive_traits::clock::Clock;
use drive_traits::{Drive, Encoders};

use crate::builder::{MotionParams, build_controller};
use crate::cancel::CancelToken;
use crate::config::{ControlCfg, DriveMode, SafetyCfg};
use crate::error::{Report, Result};
use crate::motion::MotionController;
use crate::status::MotionStatus;
use crate::types::DriveReport;

/// Optional knobs for `drive_to_position`.
#[derive(Clone, Default)]
pub struct RunParams {
    pub control: ControlCfg,
    /// The caller should pre-merge any overrides (e.g. `max_run_ms`).
    pub safety: SafetyCfg,
    /// Defaults to `MonotonicClock`.
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
    pub cancel: Option<CancelToken>,
}

/// Drive both wheels `target_ticks` from the current pose and block until the
/// position settles, the run times out, or the move is aborted.
///
/// The encoders are zeroed first, so `target_ticks` is relative.
pub fn drive_to_position<E, D>(
    encoders: E,
    drive: D,
    target_ticks: f64,
    mode: DriveMode,
    params: RunParams,
) -> Result<DriveReport>
where
    E: Encoders,
    D: Drive,
{
    let RunParams {
        control,
        safety,
        clock,
        cancel,
    } = params;
    let mut ctrl = build_controller(
        encoders,
        drive,
        MotionParams {
            target_ticks,
            mode,
            control,
            safety,
            clock,
            cancel,
        },
    )?;
    run_controller(&mut ctrl)
}

/// Run an already-built controller to completion, starting a fresh move.
pub fn run_controller<E: Encoders, D: Drive>(
    ctrl: &mut MotionController<E, D>,
) -> Result<DriveReport> {
    run_controller_with(ctrl, |_| {})
}

/// Like [`run_controller`], calling `on_cycle` with the wall time each
/// `step()` took (including its sleep).
///
/// Motors are already zeroed by `step()` on every abort path.
pub fn run_controller_with<E, D, F>(
    ctrl: &mut MotionController<E, D>,
    mut on_cycle: F,
) -> Result<DriveReport>
where
    E: Encoders,
    D: Drive,
    F: FnMut(Duration),
{
    ctrl.begin()?;
    tracing::info!(
        target_ticks = ctrl.target(),
        mode = ctrl.mode().name(),
        "move start"
    );

    loop {
        let started = Instant::now();
        let status = ctrl.step()?;
        on_cycle(started.elapsed());
        match status {
            MotionStatus::Running => continue,
            MotionStatus::Done => {
                let report = ctrl.report();
                tracing::info!(
                    final_position = report.final_position,
                    final_drift = report.final_drift,
                    cycles = report.cycles,
                    elapsed_ms = crate::util::as_ms(report.elapsed),
                    "move complete"
                );
                return Ok(report);
            }
            MotionStatus::Aborted(e) => {
                tracing::error!(error = %e, cycles = ctrl.cycles(), "move aborted");
                return Err(Report::new(e));
            }
        }
    }
}
