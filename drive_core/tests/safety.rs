use std::sync::Arc;

use drive_core::mocks::RecordingDrive;
use drive_core::{
    AbortReason, CancelToken, DriveError, DriveMode, RunParams, SafetyCfg, drive_to_position,
};
use drive_hardware::{SimDrivetrain, SimParams};
use drive_traits::{Drive, ManualClock};
use rstest::rstest;

fn stalled_sim() -> SimDrivetrain {
    SimDrivetrain::new(SimParams {
        stalled: true,
        ..SimParams::default()
    })
}

fn params(clock: &ManualClock, safety: SafetyCfg, cancel: Option<CancelToken>) -> RunParams {
    RunParams {
        safety,
        clock: Some(Arc::new(clock.clone())),
        cancel,
        ..RunParams::default()
    }
}

#[rstest]
#[case(DriveMode::PositionOnly)]
#[case(DriveMode::WithDriftAndSlew)]
fn unreachable_target_times_out_and_stops_motors(#[case] mode: DriveMode) {
    let clock = ManualClock::new();
    let sim = stalled_sim();
    let safety = SafetyCfg {
        max_run_ms: 500,
        ..SafetyCfg::default()
    };
    let err = drive_to_position(
        sim.encoders(),
        sim.motors(),
        1000.0,
        mode,
        params(&clock, safety, None),
    )
    .expect_err("stalled drivetrain cannot reach target");

    match err.downcast_ref::<DriveError>() {
        Some(DriveError::Timeout {
            elapsed_ms,
            max_run_ms,
        }) => {
            assert_eq!(*max_run_ms, 500);
            assert!(*elapsed_ms >= 500 && *elapsed_ms < 520, "{elapsed_ms}");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(sim.powers(), (0.0, 0.0));
    // timeout check runs before any further read
    assert!(clock.elapsed().as_millis() <= 520);
}

#[rstest]
fn cancelled_before_start_aborts_immediately() {
    let clock = ManualClock::new();
    let sim = stalled_sim();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = drive_to_position(
        sim.encoders(),
        sim.motors(),
        1000.0,
        DriveMode::default(),
        params(&clock, SafetyCfg::default(), Some(cancel)),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Abort(AbortReason::Cancelled))
    ));
    assert_eq!(sim.powers(), (0.0, 0.0));
}

/// Drive that trips a cancel token after a fixed number of writes.
struct CancelAfter {
    inner: RecordingDrive,
    token: CancelToken,
    remaining: u32,
}

impl Drive for CancelAfter {
    fn set_left_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.token.cancel();
        }
        self.inner.set_left_power(power)
    }

    fn set_right_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.inner.set_right_power(power)
    }
}

#[rstest]
fn cancellation_mid_run_stops_at_next_cycle() {
    let clock = ManualClock::new();
    let sim = stalled_sim();
    let token = CancelToken::new();
    let recording = RecordingDrive::new();
    let drive = CancelAfter {
        inner: recording.clone(),
        token: token.clone(),
        remaining: 5,
    };
    let err = drive_to_position(
        sim.encoders(),
        drive,
        1000.0,
        DriveMode::WithDriftAndSlew,
        params(&clock, SafetyCfg::default(), Some(token)),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Abort(AbortReason::Cancelled))
    ));
    let cmds = recording.commands();
    // five control cycles, then the zero command(s) on abort
    assert!(cmds.len() >= 6);
    assert_eq!(cmds[4].left, 50.0);
    assert_eq!(cmds.last().map(|c| c.left), Some(0.0));
}

#[rstest]
fn stall_watchdog_aborts_before_timeout() {
    let clock = ManualClock::new();
    let sim = stalled_sim();
    let safety = SafetyCfg {
        max_run_ms: 5_000,
        stall_ticks: 1.0,
        stall_ms: 200,
    };
    let err = drive_to_position(
        sim.encoders(),
        sim.motors(),
        1000.0,
        DriveMode::PositionOnly,
        params(&clock, safety, None),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Abort(AbortReason::Stalled))
    ));
    assert!(clock.elapsed().as_millis() < 300);
    assert_eq!(sim.powers(), (0.0, 0.0));
}

#[rstest]
fn encoder_fault_surfaces_as_typed_hardware_fault() {
    let clock = ManualClock::new();
    let sim = SimDrivetrain::new(SimParams {
        encoder_fault: true,
        ..SimParams::default()
    });
    let err = drive_to_position(
        sim.encoders(),
        sim.motors(),
        1000.0,
        DriveMode::default(),
        params(&clock, SafetyCfg::default(), None),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("reading left encoder"));
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::HardwareFault(_))
    ));
    assert_eq!(sim.powers(), (0.0, 0.0));
}

#[rstest]
fn abort_zeroes_motors_exactly_once() {
    let clock = ManualClock::new();
    let drive = RecordingDrive::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut ctrl = drive_core::MotionController::builder()
        .with_encoders(drive_core::mocks::ScriptedEncoders::constant(0, 0))
        .with_drive(drive.clone())
        .with_target_ticks(1000.0)
        .with_clock(Arc::new(clock))
        .with_cancel(cancel)
        .build()
        .unwrap();

    let err = drive_core::run_controller(&mut ctrl).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Abort(AbortReason::Cancelled))
    ));
    assert_eq!(drive.commands(), vec![drive_core::MotionCommand::ZERO]);
}
