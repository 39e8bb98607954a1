use std::time::Duration;

use crate::util::saturate;

/// Left/right motor powers for one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionCommand {
    pub left: f64,
    pub right: f64,
}

impl MotionCommand {
    pub const ZERO: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Both channels saturated to `±limit`.
    pub fn clamped(self, limit: f64) -> Self {
        Self {
            left: saturate(self.left, limit),
            right: saturate(self.right, limit),
        }
    }
}

/// Outcome of a completed move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveReport {
    /// Target in ticks, relative to the pose at the start of the move.
    pub target_ticks: f64,
    /// Averaged encoder position on the final cycle.
    pub final_position: f64,
    /// `left - right` on the final cycle.
    pub final_drift: f64,
    pub cycles: u64,
    pub elapsed: Duration,
    /// Cycles whose work ran past the loop period.
    pub overruns: u64,
}
