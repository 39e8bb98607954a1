//! The drive-to-position control loop (`MotionController`).
//!
//! Each `step()` is one fixed-period cycle: read encoders, run the position
//! and drift loops, clamp and mix, slew-limit, write the motors, update the
//! completion detector, then sleep to the next period boundary. Steps never
//! reorder; the slew limiter always sees this cycle's clamped command.

use std::sync::Arc;
use std::time::{Duration, Instant};

use drive_traits::clock::Clock;
use drive_traits::{Drive, Encoders};
use eyre::WrapErr;

use crate::builder::{Missing, MotionBuilder};
use crate::cancel::CancelToken;
use crate::completion::CompletionDetector;
use crate::config::{ControlCfg, DriftReference, DriveMode, PidGains, SafetyCfg};
use crate::error::{AbortReason, DriveError, Result};
use crate::hw_error::map_hw_error;
use crate::pid::PidController;
use crate::slew::SlewLimiter;
use crate::status::MotionStatus;
use crate::ticker::Ticker;
use crate::types::{DriveReport, MotionCommand};
use crate::util::{as_ms, period, saturate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Done,
}

/// Two-wheel position controller with drift correction and slew limiting.
///
/// Owns every piece of per-move state; nothing is shared between moves.
pub struct MotionController<E: Encoders, D: Drive> {
    encoders: E,
    drive: D,
    clock: Arc<dyn Clock + Send + Sync>,
    control: ControlCfg,
    safety: SafetyCfg,
    mode: DriveMode,
    target: f64,
    cancel: Option<CancelToken>,

    position_pid: PidController,
    drift_pid: PidController,
    left_slew: SlewLimiter,
    right_slew: SlewLimiter,
    completion: CompletionDetector,
    ticker: Ticker,

    phase: Phase,
    started_at: Instant,
    finished_at: Option<Instant>,
    cycles: u64,
    position: f64,
    drift: f64,
    drive_out: f64,
    drift_out: f64,
    last_command: MotionCommand,
    stall_anchor: (f64, Instant),
}

impl<E: Encoders, D: Drive> core::fmt::Debug for MotionController<E, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionController")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .field("position", &self.position)
            .field("drift", &self.drift)
            .field("cycles", &self.cycles)
            .field("done", &self.is_done())
            .finish()
    }
}

impl MotionController<Box<dyn Encoders>, Box<dyn Drive>> {
    /// Start building a boxed controller.
    pub fn builder() -> MotionBuilder<Missing, Missing, Missing> {
        MotionBuilder::default()
    }
}

impl<E: Encoders, D: Drive> MotionController<E, D> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        encoders: E,
        drive: D,
        clock: Arc<dyn Clock + Send + Sync>,
        control: ControlCfg,
        safety: SafetyCfg,
        mode: DriveMode,
        target: f64,
        cancel: Option<CancelToken>,
    ) -> Self {
        let now = clock.now();
        let position_pid =
            PidController::new(control.position, now).with_integral_range(control.integral_range);
        let drift_pid =
            PidController::new(control.drift, now).with_integral_range(control.integral_range);
        let left_slew = SlewLimiter::new(control.max_slew_step);
        let right_slew = SlewLimiter::new(control.max_slew_step);
        let completion = CompletionDetector::new(
            control.tolerance_ticks,
            Duration::from_millis(control.debounce_ms),
            now,
        );
        let ticker = Ticker::new(period(control.loop_period_ms), now);
        Self {
            encoders,
            drive,
            clock,
            control,
            safety,
            mode,
            target,
            cancel,
            position_pid,
            drift_pid,
            left_slew,
            right_slew,
            completion,
            ticker,
            phase: Phase::Running,
            started_at: now,
            finished_at: None,
            cycles: 0,
            position: 0.0,
            drift: 0.0,
            drive_out: 0.0,
            drift_out: 0.0,
            last_command: MotionCommand::ZERO,
            stall_anchor: (0.0, now),
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Averaged encoder position seen on the last cycle.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// `left - right` seen on the last cycle.
    pub fn drift(&self) -> f64 {
        self.drift
    }

    /// Position loop output after saturation, last cycle.
    pub fn drive_output(&self) -> f64 {
        self.drive_out
    }

    /// Drift loop output, last cycle (0 in position-only mode).
    pub fn drift_output(&self) -> f64 {
        self.drift_out
    }

    /// Command written to the motors on the last cycle.
    pub fn last_command(&self) -> MotionCommand {
        self.last_command
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Time since the move started (frozen once done).
    pub fn elapsed(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(|| self.clock.now());
        end.saturating_duration_since(self.started_at)
    }

    pub fn report(&self) -> DriveReport {
        DriveReport {
            target_ticks: self.target,
            final_position: self.position,
            final_drift: self.drift,
            cycles: self.cycles,
            elapsed: self.elapsed(),
            overruns: self.ticker.overruns(),
        }
    }

    /// Zero the encoders and reset all per-move state. Call before a new move.
    pub fn begin(&mut self) -> Result<()> {
        self.encoders
            .reset()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("resetting encoders")?;

        let now = self.clock.now();
        self.position_pid.reset(now);
        self.drift_pid.reset(now);
        self.left_slew.reset();
        self.right_slew.reset();
        self.completion.reset(now);
        self.ticker.reset(now);
        self.phase = Phase::Running;
        self.started_at = now;
        self.finished_at = None;
        self.cycles = 0;
        self.position = 0.0;
        self.drift = 0.0;
        self.drive_out = 0.0;
        self.drift_out = 0.0;
        self.last_command = MotionCommand::ZERO;
        self.stall_anchor = (0.0, now);
        Ok(())
    }

    /// Replace both loops' gains; controller state restarts at the current time.
    pub fn set_gains(&mut self, position: PidGains, drift: PidGains) {
        let now = self.clock.now();
        self.control.position = position;
        self.control.drift = drift;
        self.position_pid.set_gains(position, now);
        self.drift_pid.set_gains(drift, now);
    }

    /// Zero both motors.
    pub fn stop(&mut self) -> Result<()> {
        self.apply(MotionCommand::ZERO)
    }

    /// One control cycle.
    pub fn step(&mut self) -> Result<MotionStatus> {
        if self.phase == Phase::Done {
            return Ok(MotionStatus::Done);
        }

        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            self.stop_best_effort("cancellation");
            return Ok(MotionStatus::Aborted(DriveError::Abort(
                AbortReason::Cancelled,
            )));
        }

        let now = self.clock.now();

        // Safety: hard runtime cap
        let elapsed_ms = as_ms(now.saturating_duration_since(self.started_at));
        if elapsed_ms >= self.safety.max_run_ms {
            self.stop_best_effort("max-run cap");
            return Ok(MotionStatus::Aborted(DriveError::Timeout {
                elapsed_ms,
                max_run_ms: self.safety.max_run_ms,
            }));
        }

        let (left, right) = match self.read_encoders() {
            Ok(pair) => pair,
            Err(e) => {
                self.stop_best_effort("encoder read failure");
                return Err(e);
            }
        };

        let cmd = self.compute(now, left, right);
        if let Err(e) = self.apply(cmd) {
            self.stop_best_effort("motor write failure");
            return Err(e);
        }
        self.cycles = self.cycles.saturating_add(1);

        let abs_err = (self.target - self.position).abs();
        tracing::trace!(
            cycle = self.cycles,
            left,
            right,
            error = abs_err,
            drive_out = self.drive_out,
            drift_out = self.drift_out,
            cmd_left = cmd.left,
            cmd_right = cmd.right,
            "control cycle"
        );

        if self.completion.update(now, abs_err) {
            self.apply(MotionCommand::ZERO)?;
            self.phase = Phase::Done;
            self.finished_at = Some(now);
            tracing::debug!(
                position = self.position,
                drift = self.drift,
                cycles = self.cycles,
                "target settled"
            );
            return Ok(MotionStatus::Done);
        }

        if self.stalled(now, abs_err) {
            self.stop_best_effort("stall watchdog");
            return Ok(MotionStatus::Aborted(DriveError::Abort(
                AbortReason::Stalled,
            )));
        }

        self.ticker.wait(&*self.clock);
        Ok(MotionStatus::Running)
    }

    // ── Private: per-cycle pieces ────────────────────────────────────────────

    fn read_encoders(&mut self) -> Result<(i32, i32)> {
        let left = self
            .encoders
            .read_left()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading left encoder")?;
        let right = self
            .encoders
            .read_right()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading right encoder")?;
        Ok((left, right))
    }

    /// Controller math for one cycle: PID loops, clamp, mix, slew, clamp.
    fn compute(&mut self, now: Instant, left: i32, right: i32) -> MotionCommand {
        let (l, r) = (f64::from(left), f64::from(right));
        self.position = (l + r) / 2.0;
        self.drift = l - r;

        let raw_drive = self
            .position_pid
            .calculate(now, self.target, self.position);
        self.drive_out = saturate(raw_drive, self.control.drive_limit);

        self.drift_out = if self.mode.uses_drift() {
            let reference = match self.control.drift_reference {
                DriftReference::Zero => 0.0,
                DriftReference::PositionTarget => self.target,
            };
            self.drift_pid.calculate(now, reference, self.drift)
        } else {
            0.0
        };

        let limit = self.control.power_limit;
        let raw = mix(self.drive_out, self.drift_out).clamped(limit);
        if self.mode.uses_slew() {
            MotionCommand::new(
                self.left_slew.limit(raw.left),
                self.right_slew.limit(raw.right),
            )
            .clamped(limit)
        } else {
            raw
        }
    }

    fn apply(&mut self, cmd: MotionCommand) -> Result<()> {
        self.drive
            .set_left_power(cmd.left)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("set_left_power")?;
        self.drive
            .set_right_power(cmd.right)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("set_right_power")?;
        self.last_command = cmd;
        Ok(())
    }

    fn stop_best_effort(&mut self, why: &'static str) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "motor stop failed on {why}");
        }
    }

    /// No-progress watchdog: true when the averaged position has moved less
    /// than `stall_ticks` for `stall_ms` while outside tolerance.
    fn stalled(&mut self, now: Instant, abs_err: f64) -> bool {
        if !self.safety.stall_watchdog_enabled() {
            return false;
        }
        let (anchor_pos, anchor_at) = self.stall_anchor;
        if abs_err <= self.control.tolerance_ticks
            || (self.position - anchor_pos).abs() >= self.safety.stall_ticks
        {
            self.stall_anchor = (self.position, now);
            return false;
        }
        as_ms(now.saturating_duration_since(anchor_at)) >= self.safety.stall_ms
    }
}

/// Blend the position and drift outputs into left/right commands.
///
/// `drift_out` is the drift loop's response to `left - right`; a positive
/// drift (left ahead) yields a negative `drift_out`, which lowers the left
/// command and raises the right one.
#[inline]
pub(crate) fn mix(drive_out: f64, drift_out: f64) -> MotionCommand {
    MotionCommand::new(drive_out + drift_out, drive_out - drift_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingDrive, ScriptedEncoders};
    use drive_traits::clock::ManualClock;

    fn controller(
        encoders: ScriptedEncoders,
        drive: RecordingDrive,
        clock: &ManualClock,
        control: ControlCfg,
        mode: DriveMode,
        target: f64,
    ) -> MotionController<ScriptedEncoders, RecordingDrive> {
        MotionController::new(
            encoders,
            drive,
            Arc::new(clock.clone()),
            control,
            SafetyCfg::default(),
            mode,
            target,
            None,
        )
    }

    #[test]
    fn mix_pulls_faster_wheel_down() {
        let cmd = mix(50.0, -200.0);
        assert_eq!(cmd, MotionCommand::new(-150.0, 250.0));
    }

    #[test]
    fn first_cycle_saturates_position_output() {
        let clock = ManualClock::new();
        let drive = RecordingDrive::new();
        let mut c = controller(
            ScriptedEncoders::constant(0, 0),
            drive.clone(),
            &clock,
            ControlCfg::default(),
            DriveMode::PositionOnly,
            1000.0,
        );
        clock.advance(Duration::from_millis(20));
        assert!(matches!(c.step().unwrap(), MotionStatus::Running));
        assert_eq!(c.drive_output(), 100.0);
        assert_eq!(drive.last(), Some(MotionCommand::new(100.0, 100.0)));
    }

    #[test]
    fn drift_correction_scenario() {
        let clock = ManualClock::new();
        let control = ControlCfg {
            position: PidGains::p(0.0),
            drift: PidGains::p(1.0),
            ..ControlCfg::default()
        };
        let mut c = controller(
            ScriptedEncoders::constant(500, 300),
            RecordingDrive::new(),
            &clock,
            control,
            DriveMode::WithDriftCorrection,
            400.0,
        );
        clock.advance(Duration::from_millis(20));
        let cmd = c.compute(clock.now(), 500, 300);
        assert_eq!(c.drift(), 200.0);
        assert_eq!(c.drift_output(), -200.0);
        // -200 / +200 before the actuator clamp
        assert_eq!(cmd, MotionCommand::new(-127.0, 127.0));
        assert!(cmd.left < cmd.right);
    }

    #[test]
    fn legacy_drift_reference_uses_target() {
        let clock = ManualClock::new();
        let control = ControlCfg {
            position: PidGains::p(0.0),
            drift: PidGains::p(0.1),
            drift_reference: DriftReference::PositionTarget,
            ..ControlCfg::default()
        };
        let mut c = controller(
            ScriptedEncoders::constant(0, 0),
            RecordingDrive::new(),
            &clock,
            control,
            DriveMode::WithDriftCorrection,
            300.0,
        );
        clock.advance(Duration::from_millis(20));
        c.compute(clock.now(), 0, 0);
        assert!((c.drift_output() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn slew_mode_ramps_commands() {
        let clock = ManualClock::new();
        let drive = RecordingDrive::new();
        let mut c = controller(
            ScriptedEncoders::constant(0, 0),
            drive.clone(),
            &clock,
            ControlCfg::default(),
            DriveMode::WithDriftAndSlew,
            1000.0,
        );
        for _ in 0..3 {
            c.step().unwrap();
        }
        let lefts: Vec<f64> = drive.commands().iter().map(|c| c.left).collect();
        assert_eq!(lefts, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn already_at_target_waits_full_debounce() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        let drive = RecordingDrive::new();
        let mut c = controller(
            ScriptedEncoders::constant(0, 0),
            drive.clone(),
            &clock,
            ControlCfg::default(),
            DriveMode::WithDriftAndSlew,
            0.0,
        );
        let mut done_at = None;
        for _ in 0..100 {
            let at = clock.ms_since(t0);
            if let MotionStatus::Done = c.step().unwrap() {
                done_at = Some(at);
                break;
            }
        }
        // cycles at 0, 20, ..., 240 keep running; 260 ms is the first > 250 ms
        assert_eq!(done_at, Some(260));
        assert_eq!(c.cycles(), 14);
        assert_eq!(drive.last(), Some(MotionCommand::ZERO));
        assert!(matches!(c.step().unwrap(), MotionStatus::Done));
    }
}
