//! Debounced completion detection.

use std::time::{Duration, Instant};

/// Reports "done" once the error has stayed within tolerance for longer than
/// the debounce window. Any excursion outside tolerance restarts the window.
/// The window starts at construction time, so a move that begins inside
/// tolerance still waits the full debounce. Latches once done.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    tolerance: f64,
    debounce: Duration,
    last_out_of_tolerance: Instant,
    done: bool,
}

impl CompletionDetector {
    pub fn new(tolerance: f64, debounce: Duration, start: Instant) -> Self {
        Self {
            tolerance,
            debounce,
            last_out_of_tolerance: start,
            done: false,
        }
    }

    /// Restart the window at `start` and clear the latch.
    pub fn reset(&mut self, start: Instant) {
        self.last_out_of_tolerance = start;
        self.done = false;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Time `now` has spent continuously within tolerance.
    pub fn settled_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_out_of_tolerance)
    }

    /// Feed this cycle's error; returns true once done.
    pub fn update(&mut self, now: Instant, error: f64) -> bool {
        if self.done {
            return true;
        }
        if error.abs() > self.tolerance || error.is_nan() {
            self.last_out_of_tolerance = now;
        }
        if self.settled_for(now) > self.debounce {
            self.done = true;
        }
        self.done
    }
}
