//! Small numeric and timing helpers shared by the controller.

use std::time::Duration;

/// Sign-preserving saturation: values beyond `±limit` become `±limit`.
/// NaN maps to 0 so nothing undefined reaches an actuator.
#[inline]
pub fn saturate(value: f64, limit: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value.abs() > limit {
        limit.copysign(value)
    } else {
        value
    }
}

/// Loop period as a `Duration`, at least 1 ms.
#[inline]
pub fn period(loop_period_ms: u64) -> Duration {
    Duration::from_millis(loop_period_ms.max(1))
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn as_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
