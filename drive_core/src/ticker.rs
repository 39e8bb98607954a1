//! Fixed-period tick source for the control loop.

use std::time::{Duration, Instant};

use drive_traits::clock::Clock;

/// Sleeps until the next period boundary measured from a fixed start.
///
/// Boundaries are `start + k * period`, so per-cycle work does not
/// accumulate into drift. A cycle that runs past its boundary counts as an
/// overrun and the schedule restarts from the late instant.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
    ticks: u64,
    overruns: u64,
}

impl Ticker {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
            ticks: 0,
            overruns: 0,
        }
    }

    /// Restart the schedule at `start`.
    pub fn reset(&mut self, start: Instant) {
        self.next = start + self.period;
        self.ticks = 0;
        self.overruns = 0;
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed waits.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Cycles that finished after their boundary.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Block until the next boundary.
    pub fn wait(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        if now < self.next {
            clock.sleep(self.next - now);
            self.next += self.period;
        } else {
            self.overruns = self.overruns.saturating_add(1);
            tracing::trace!(
                late_us = u64::try_from(now.saturating_duration_since(self.next).as_micros())
                    .unwrap_or(u64::MAX),
                "control cycle overran its period"
            );
            self.next = now + self.period;
        }
        self.ticks = self.ticks.saturating_add(1);
    }
}
