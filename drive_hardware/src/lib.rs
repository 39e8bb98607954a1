//! Simulated two-wheel drivetrain.
//!
//! `SimDrivetrain` owns a shared model of both wheels; `encoders()` and
//! `motors()` hand out handles implementing `drive_traits::Encoders` and
//! `drive_traits::Drive` over that model. Motion is cycle-based: every
//! `read_left()` advances each wheel by `power * ticks_per_power`, i.e. one
//! control period of travel at the last commanded power.

pub mod error;

use std::sync::{Arc, Mutex, MutexGuard};

use drive_traits::{Drive, Encoders};

use crate::error::HwError;

/// Physical parameters of the simulated drivetrain.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Left wheel travel per cycle per unit of power.
    pub left_ticks_per_power: f64,
    /// Right wheel travel per cycle per unit of power.
    pub right_ticks_per_power: f64,
    /// Wheels do not move regardless of power (mechanical stall).
    pub stalled: bool,
    /// Every encoder read fails.
    pub encoder_fault: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            left_ticks_per_power: 0.1,
            right_ticks_per_power: 0.1,
            stalled: false,
            encoder_fault: false,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    params: SimParams,
    left_pos: f64,
    right_pos: f64,
    left_power: f64,
    right_power: f64,
    left_history: Vec<f64>,
    right_history: Vec<f64>,
    resets: u32,
}

impl SimState {
    fn advance(&mut self) {
        if self.params.stalled {
            return;
        }
        self.left_pos += self.left_power * self.params.left_ticks_per_power;
        self.right_pos += self.right_power * self.params.right_ticks_per_power;
    }
}

/// Shared simulated drivetrain model.
#[derive(Debug, Clone, Default)]
pub struct SimDrivetrain {
    state: Arc<Mutex<SimState>>,
}

impl SimDrivetrain {
    pub fn new(params: SimParams) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                params,
                ..SimState::default()
            })),
        }
    }

    /// Place the wheels at absolute encoder positions (before a reset is
    /// issued these are what the controller reads).
    pub fn set_positions(&self, left: i32, right: i32) {
        if let Ok(mut s) = self.state.lock() {
            s.left_pos = f64::from(left);
            s.right_pos = f64::from(right);
        }
    }

    pub fn set_stalled(&self, stalled: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.params.stalled = stalled;
        }
    }

    /// Encoder handle over the shared model.
    pub fn encoders(&self) -> SimEncoders {
        SimEncoders {
            state: Arc::clone(&self.state),
        }
    }

    /// Motor handle over the shared model.
    pub fn motors(&self) -> SimMotors {
        SimMotors {
            state: Arc::clone(&self.state),
        }
    }

    /// Current (left, right) wheel positions in ticks.
    pub fn positions(&self) -> (f64, f64) {
        self.state
            .lock()
            .map(|s| (s.left_pos, s.right_pos))
            .unwrap_or_default()
    }

    /// Last commanded (left, right) power.
    pub fn powers(&self) -> (f64, f64) {
        self.state
            .lock()
            .map(|s| (s.left_power, s.right_power))
            .unwrap_or_default()
    }

    /// Every power written to the left and right motors, in order.
    pub fn history(&self) -> (Vec<f64>, Vec<f64>) {
        self.state
            .lock()
            .map(|s| (s.left_history.clone(), s.right_history.clone()))
            .unwrap_or_default()
    }

    /// Number of times the encoders were zeroed.
    pub fn resets(&self) -> u32 {
        self.state.lock().map(|s| s.resets).unwrap_or_default()
    }
}

fn lock(state: &Mutex<SimState>) -> Result<MutexGuard<'_, SimState>, HwError> {
    state.lock().map_err(|_| HwError::Poisoned)
}

fn to_ticks(pos: f64) -> i32 {
    pos.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Encoder side of a `SimDrivetrain`.
#[derive(Debug, Clone)]
pub struct SimEncoders {
    state: Arc<Mutex<SimState>>,
}

impl Encoders for SimEncoders {
    fn read_left(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let mut s = lock(&self.state)?;
        if s.params.encoder_fault {
            return Err(Box::new(HwError::EncoderFault("left channel not responding")));
        }
        s.advance();
        tracing::trace!(left = s.left_pos, right = s.right_pos, "sim wheels advanced");
        Ok(to_ticks(s.left_pos))
    }

    fn read_right(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let s = lock(&self.state)?;
        if s.params.encoder_fault {
            return Err(Box::new(HwError::EncoderFault("right channel not responding")));
        }
        Ok(to_ticks(s.right_pos))
    }

    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = lock(&self.state)?;
        s.left_pos = 0.0;
        s.right_pos = 0.0;
        s.resets = s.resets.saturating_add(1);
        Ok(())
    }
}

/// Motor side of a `SimDrivetrain`; records every command.
#[derive(Debug, Clone)]
pub struct SimMotors {
    state: Arc<Mutex<SimState>>,
}

impl Drive for SimMotors {
    fn set_left_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !power.is_finite() {
            return Err(Box::new(HwError::MotorFault("non-finite left power")));
        }
        let mut s = lock(&self.state)?;
        s.left_power = power;
        s.left_history.push(power);
        Ok(())
    }

    fn set_right_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !power.is_finite() {
            return Err(Box::new(HwError::MotorFault("non-finite right power")));
        }
        let mut s = lock(&self.state)?;
        s.right_power = power;
        s.right_history.push(power);
        Ok(())
    }
}
