//! PID+F controller with derivative-on-measurement and anti-windup.
//!
//! Time is passed in explicitly (`now`) so the controller stays a plain
//! value type; whoever owns the clock decides what "now" is.

use std::time::Instant;

use crate::config::PidGains;

/// Single-input single-output PID+F controller.
///
/// `output = kP*e + kI*∫e dt − kD*d(measurement)/dt + kF*target`
///
/// - The derivative acts on the measurement rather than the error, so a step
///   in the target produces no derivative kick. With a constant target this
///   equals `kD * d(error)/dt`.
/// - The integral resets to zero when `|e|` exceeds the integral range, or
///   when the error sign says the measurement has passed the target.
/// - A zero time step contributes no derivative.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral_range: f64,
    last_timestamp: Instant,
    last_measurement: Option<f64>,
    integral: f64,
}

impl PidController {
    /// New controller whose first time step is measured from `now`.
    pub fn new(gains: PidGains, now: Instant) -> Self {
        Self {
            gains,
            integral_range: f64::INFINITY,
            last_timestamp: now,
            last_measurement: None,
            integral: 0.0,
        }
    }

    /// Reset the integral whenever |error| exceeds `range`.
    pub fn with_integral_range(mut self, range: f64) -> Self {
        self.integral_range = range;
        self
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Replace the gains and restart from a clean state at `now`.
    pub fn set_gains(&mut self, gains: PidGains, now: Instant) {
        self.gains = gains;
        self.reset(now);
    }

    /// Clear integral and derivative history; the next time step starts at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.last_timestamp = now;
        self.last_measurement = None;
        self.integral = 0.0;
    }

    /// Current value of the integral accumulator (error × seconds).
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// One controller update using the configured integral range.
    pub fn calculate(&mut self, now: Instant, target: f64, measurement: f64) -> f64 {
        self.calculate_with_range(now, target, measurement, self.integral_range)
    }

    /// One controller update with an explicit integral range.
    pub fn calculate_with_range(
        &mut self,
        now: Instant,
        target: f64,
        measurement: f64,
        integral_range: f64,
    ) -> f64 {
        let dt = now.saturating_duration_since(self.last_timestamp).as_secs_f64();
        self.last_timestamp = now;

        let error = target - measurement;

        self.integral += error * dt;
        if error.abs() > integral_range || overshot(target, error) {
            self.integral = 0.0;
        }

        let derivative = match self.last_measurement {
            Some(prev) if dt > 0.0 => (measurement - prev) / dt,
            _ => 0.0,
        };
        self.last_measurement = Some(measurement);

        let g = &self.gains;
        g.kp * error + g.ki * self.integral - g.kd * derivative + g.kf * target
    }
}

/// Error sign opposite to the target sign: the measurement went past the target.
#[inline]
fn overshot(target: f64, error: f64) -> bool {
    (target > 0.0 && error < 0.0) || (target < 0.0 && error > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DT: Duration = Duration::from_millis(20);

    #[test]
    fn proportional_output_on_first_call() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::p(0.5), t0);
        assert_eq!(pid.calculate(t0 + DT, 1000.0, 0.0), 500.0);
    }

    #[test]
    fn feedforward_scales_target() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 0.0, 0.1), t0);
        assert!((pid.calculate(t0 + DT, 200.0, 150.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn integral_accumulates_error_times_seconds() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0, 0.0), t0);
        pid.calculate(t0 + DT, 100.0, 50.0);
        pid.calculate(t0 + DT * 2, 100.0, 50.0);
        assert!((pid.integral() - 2.0).abs() < 1e-9); // 50 * 0.02 * 2
    }

    #[test]
    fn integral_resets_on_overshoot() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0, 0.0), t0);
        for k in 1..=5 {
            pid.calculate(t0 + DT * k, 100.0, 50.0);
        }
        assert!(pid.integral() > 0.0);
        pid.calculate(t0 + DT * 6, 100.0, 110.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn integral_resets_on_overshoot_for_negative_target() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0, 0.0), t0);
        pid.calculate(t0 + DT, -100.0, -20.0);
        assert!(pid.integral() < 0.0);
        pid.calculate(t0 + DT * 2, -100.0, -120.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn integral_resets_outside_range() {
        let t0 = Instant::now();
        let mut pid =
            PidController::new(PidGains::new(0.0, 1.0, 0.0, 0.0), t0).with_integral_range(30.0);
        pid.calculate(t0 + DT, 100.0, 50.0);
        assert_eq!(pid.integral(), 0.0);
        pid.calculate(t0 + DT * 2, 100.0, 80.0);
        assert!(pid.integral() > 0.0);
    }

    #[test]
    fn zero_time_step_skips_derivative() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0, 0.0), t0);
        pid.calculate(t0 + DT, 100.0, 0.0);
        let out = pid.calculate(t0 + DT, 100.0, 40.0);
        assert_eq!(out, 0.0);
        assert!(out.is_finite());
    }

    #[test]
    fn derivative_acts_on_measurement_not_target() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0, 0.0), t0);
        pid.calculate(t0 + DT, 100.0, 10.0);
        // target jumps, measurement unchanged: no kick
        assert_eq!(pid.calculate(t0 + DT * 2, 5000.0, 10.0), 0.0);
        // measurement rising 10 ticks over 20 ms damps the output
        let out = pid.calculate(t0 + DT * 3, 5000.0, 20.0);
        assert!((out + 500.0).abs() < 1e-9);
    }

    #[test]
    fn set_gains_resets_state() {
        let t0 = Instant::now();
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0, 0.0), t0);
        pid.calculate(t0 + DT, 100.0, 0.0);
        assert!(pid.integral() > 0.0);
        pid.set_gains(PidGains::p(2.0), t0 + DT);
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.gains(), PidGains::p(2.0));
        assert_eq!(pid.calculate(t0 + DT * 2, 10.0, 0.0), 20.0);
    }
}
