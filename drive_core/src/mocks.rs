//! Test and helper mocks for drive_core.

use std::sync::{Arc, Mutex};

use drive_traits::{Drive, Encoders};

use crate::types::MotionCommand;

/// Encoders that replay a fixed `(left, right)` sequence, then repeat the
/// last pair. `reset()` is counted but does not rewind the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEncoders {
    seq: Vec<(i32, i32)>,
    idx: usize,
    pending_right: i32,
    resets: Arc<Mutex<u32>>,
}

impl ScriptedEncoders {
    pub fn new(seq: impl Into<Vec<(i32, i32)>>) -> Self {
        Self {
            seq: seq.into(),
            ..Self::default()
        }
    }

    /// Encoders stuck at one reading.
    pub fn constant(left: i32, right: i32) -> Self {
        Self::new(vec![(left, right)])
    }

    /// Shared reset counter (clones observe the same count).
    pub fn resets(&self) -> u32 {
        self.resets.lock().map(|g| *g).unwrap_or_default()
    }
}

impl Encoders for ScriptedEncoders {
    fn read_left(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let (l, r) = if self.idx < self.seq.len() {
            let pair = self.seq[self.idx];
            self.idx += 1;
            pair
        } else {
            self.seq.last().copied().unwrap_or((0, 0))
        };
        self.pending_right = r;
        Ok(l)
    }

    fn read_right(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.pending_right)
    }

    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut n) = self.resets.lock() {
            *n = n.saturating_add(1);
        }
        Ok(())
    }
}

/// Drive that records every command. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDrive {
    left: Arc<Mutex<Vec<f64>>>,
    right: Arc<Mutex<Vec<f64>>>,
}

impl RecordingDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands paired by cycle, in order.
    pub fn commands(&self) -> Vec<MotionCommand> {
        let left = self.left.lock().map(|g| g.clone()).unwrap_or_default();
        let right = self.right.lock().map(|g| g.clone()).unwrap_or_default();
        left.into_iter()
            .zip(right)
            .map(|(l, r)| MotionCommand::new(l, r))
            .collect()
    }

    pub fn last(&self) -> Option<MotionCommand> {
        self.commands().last().copied()
    }
}

impl Drive for RecordingDrive {
    fn set_left_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut v) = self.left.lock() {
            v.push(power);
        }
        Ok(())
    }

    fn set_right_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut v) = self.right.lock() {
            v.push(power);
        }
        Ok(())
    }
}
