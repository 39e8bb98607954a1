//! Status returned from each control loop iteration.

use crate::error::DriveError;

/// Public status of a single step of the motion loop.
#[derive(Debug)]
pub enum MotionStatus {
    /// Keep going; not settled yet.
    Running,
    /// Target reached and settled; motors already zeroed.
    Done,
    /// Aborted with a typed error; motors have been asked to stop.
    Aborted(DriveError),
}
