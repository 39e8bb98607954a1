//! Per-channel slew-rate limiter.

/// Bounds how far one output may move per control cycle.
///
/// The stored state is always the value actually commanded, never the
/// requested one, so a large request is reached over several cycles.
#[derive(Debug, Clone)]
pub struct SlewLimiter {
    max_step: f64,
    last_output: f64,
}

impl SlewLimiter {
    /// Limiter starting from a stopped output.
    pub fn new(max_step: f64) -> Self {
        Self {
            max_step,
            last_output: 0.0,
        }
    }

    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.last_output = 0.0;
    }

    /// Move towards `desired` by at most `max_step`.
    pub fn limit(&mut self, desired: f64) -> f64 {
        // NaN compares false everywhere below; hold the last output instead.
        if desired.is_nan() {
            return self.last_output;
        }
        let delta = desired - self.last_output;
        let out = if delta > self.max_step {
            self.last_output + self.max_step
        } else if delta < -self.max_step {
            self.last_output - self.max_step
        } else {
            desired
        };
        self.last_output = out;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_changes_pass_through() {
        let mut s = SlewLimiter::new(10.0);
        assert_eq!(s.limit(7.0), 7.0);
        assert_eq!(s.limit(-3.0), -3.0);
    }

    #[test]
    fn large_jumps_ramp_in_both_directions() {
        let mut s = SlewLimiter::new(10.0);
        assert_eq!(s.limit(100.0), 10.0);
        assert_eq!(s.limit(100.0), 20.0);
        assert_eq!(s.last_output(), 20.0);
        assert_eq!(s.limit(-100.0), 10.0);
        assert_eq!(s.limit(-100.0), 0.0);
    }

    #[test]
    fn converges_within_ceil_delta_over_step() {
        let mut s = SlewLimiter::new(10.0);
        let target = 127.0;
        let cycles = (target / s.max_step()).ceil() as usize;
        let mut out = 0.0;
        for _ in 0..cycles {
            out = s.limit(target);
        }
        assert_eq!(out, target);
        // once caught up the request passes straight through
        assert_eq!(s.limit(target), target);
    }

    #[test]
    fn nan_request_holds_last_output() {
        let mut s = SlewLimiter::new(10.0);
        s.limit(5.0);
        assert_eq!(s.limit(f64::NAN), 5.0);
        assert_eq!(s.limit(f64::INFINITY), 15.0);
    }
}
