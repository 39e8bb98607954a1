#![no_main]
use std::sync::Arc;

use drive_core::mocks::{RecordingDrive, ScriptedEncoders};
use drive_core::{ControlCfg, DriveMode, MotionParams, PidGains, build_controller};
use drive_traits::ManualClock;
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    target: i32,
    mode: u8,
    gains: [u8; 4],
    readings: Vec<(i32, i32)>,
}

fuzz_target!(|input: Input| {
    let mode = match input.mode % 3 {
        0 => DriveMode::PositionOnly,
        1 => DriveMode::WithDriftCorrection,
        _ => DriveMode::WithDriftAndSlew,
    };
    let [kp, ki, kd, kf] = input.gains.map(|g| f64::from(g) / 64.0);
    let control = ControlCfg {
        position: PidGains::new(kp, ki, kd, kf),
        drift: PidGains::new(kp, ki, kd, 0.0),
        ..ControlCfg::default()
    };
    let steps = input.readings.len().min(512);
    let drive = RecordingDrive::new();
    let Ok(mut ctrl) = build_controller(
        ScriptedEncoders::new(input.readings),
        drive.clone(),
        MotionParams {
            target_ticks: f64::from(input.target),
            mode,
            control,
            clock: Some(Arc::new(ManualClock::new())),
            ..MotionParams::default()
        },
    ) else {
        return;
    };
    if ctrl.begin().is_err() {
        return;
    }
    for _ in 0..steps {
        if ctrl.step().is_err() || ctrl.is_done() {
            break;
        }
    }
    for cmd in drive.commands() {
        assert!(cmd.left.is_finite() && cmd.left.abs() <= 127.0);
        assert!(cmd.right.is_finite() && cmd.right.abs() <= 127.0);
    }
});
