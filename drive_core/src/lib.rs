#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core drive-to-position logic (hardware-agnostic).
//!
//! This crate provides the closed-loop position controller for a two-wheel
//! differential drive. All hardware interactions go through
//! `drive_traits::Encoders` and `drive_traits::Drive`.
//!
//! ## Architecture
//!
//! - **PID+F** (`pid`): derivative on measurement, integral reset on
//!   overshoot or outside the integral range
//! - **Slew limiting** (`slew`): per-cycle bound on each motor command
//! - **Completion** (`completion`): tolerance band with debounce, latching
//! - **Control loop** (`motion`): position and drift loops, mixing, clamps
//! - **Safety**: hard run-time cap, cancellation, optional stall watchdog
//! - **Timing** (`ticker`): fixed-period scheduling on an injectable clock
//!
//! ## Units
//!
//! Positions are encoder ticks (`f64` internally, averaged from two `i32`
//! readings). Motor commands are in actuator units, `±power_limit`.

pub mod builder;
pub mod cancel;
pub mod completion;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod pid;
pub mod runner;
pub mod slew;
pub mod status;
pub mod ticker;
pub mod types;
pub mod util;

pub use builder::{BoxedMotion, Missing, MotionBuilder, MotionParams, Set, build_controller};
pub use cancel::CancelToken;
pub use completion::CompletionDetector;
pub use config::{ControlCfg, DriftReference, DriveMode, PidGains, SafetyCfg};
pub use error::{AbortReason, BuildError, DriveError, Report, Result};
pub use motion::MotionController;
pub use pid::PidController;
pub use runner::{RunParams, drive_to_position, run_controller, run_controller_with};
pub use slew::SlewLimiter;
pub use status::MotionStatus;
pub use ticker::Ticker;
pub use types::{DriveReport, MotionCommand};
