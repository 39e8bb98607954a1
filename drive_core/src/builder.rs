//! Type-state builder for `MotionController` and generic `build_controller`.
//!
//! The builder enforces at compile time that encoders, drive and target are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use drive_traits::clock::{Clock, MonotonicClock};
use drive_traits::{Drive, Encoders};

use crate::cancel::CancelToken;
use crate::config::{ControlCfg, DriftReference, DriveMode, SafetyCfg};
use crate::error::{BuildError, Result};
use crate::motion::MotionController;

/// Dynamically dispatched controller produced by `MotionBuilder`.
pub type BoxedMotion = MotionController<Box<dyn Encoders>, Box<dyn Drive>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Everything a controller needs besides its hardware.
#[derive(Clone, Default)]
pub struct MotionParams {
    pub target_ticks: f64,
    pub mode: DriveMode,
    pub control: ControlCfg,
    pub safety: SafetyCfg,
    /// Defaults to `MonotonicClock`.
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
    pub cancel: Option<CancelToken>,
}

impl core::fmt::Debug for MotionParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionParams")
            .field("target_ticks", &self.target_ticks)
            .field("mode", &self.mode)
            .field("control", &self.control)
            .field("safety", &self.safety)
            .field("custom_clock", &self.clock.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Builder for `MotionController`. All fields are validated on `build()`.
pub struct MotionBuilder<E, D, T> {
    encoders: Option<Box<dyn Encoders>>,
    drive: Option<Box<dyn Drive>>,
    target_ticks: Option<f64>,
    mode: Option<DriveMode>,
    control: Option<ControlCfg>,
    safety: Option<SafetyCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cancel: Option<CancelToken>,
    _e: PhantomData<E>,
    _d: PhantomData<D>,
    _t: PhantomData<T>,
}

impl Default for MotionBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            encoders: None,
            drive: None,
            target_ticks: None,
            mode: None,
            control: None,
            safety: None,
            clock: None,
            cancel: None,
            _e: PhantomData,
            _d: PhantomData,
            _t: PhantomData,
        }
    }
}

#[inline]
fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate parameters and construct a `MotionController`.
///
/// Shared by `MotionBuilder::try_build()` and `build_controller()`.
fn validate_and_build<E: Encoders, D: Drive>(
    encoders: E,
    drive: D,
    params: MotionParams,
) -> Result<MotionController<E, D>> {
    let MotionParams {
        target_ticks,
        mode,
        control,
        safety,
        clock,
        cancel,
    } = params;

    // ── Validation ───────────────────────────────────────────────────────────
    if !target_ticks.is_finite() {
        return Err(invalid("target ticks must be finite"));
    }
    if !control.position.is_finite() || !control.drift.is_finite() {
        return Err(invalid("PID gains must be finite"));
    }
    if !control.tolerance_ticks.is_finite() || control.tolerance_ticks < 0.0 {
        return Err(invalid("tolerance_ticks must be >= 0"));
    }
    if control.loop_period_ms == 0 {
        return Err(invalid("loop_period_ms must be > 0"));
    }
    if !control.max_slew_step.is_finite() || control.max_slew_step <= 0.0 {
        return Err(invalid("max_slew_step must be > 0"));
    }
    if control.integral_range.is_nan() || control.integral_range <= 0.0 {
        return Err(invalid("integral_range must be > 0"));
    }
    if !control.drive_limit.is_finite() || control.drive_limit <= 0.0 {
        return Err(invalid("drive_limit must be > 0"));
    }
    if !control.power_limit.is_finite() || control.power_limit <= 0.0 {
        return Err(invalid("power_limit must be > 0"));
    }
    if control.drive_limit > control.power_limit {
        return Err(invalid("drive_limit must be <= power_limit"));
    }
    if safety.max_run_ms == 0 {
        return Err(invalid("max_run_ms must be >= 1"));
    }
    if !safety.stall_ticks.is_finite() || safety.stall_ticks < 0.0 {
        return Err(invalid("stall_ticks must be >= 0"));
    }

    if mode.uses_drift() && control.drift_reference == DriftReference::PositionTarget {
        tracing::warn!(
            target_ticks,
            "drift loop references the position target; wheels will be driven apart"
        );
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };

    Ok(MotionController::new(
        encoders,
        drive,
        clock,
        control,
        safety,
        mode,
        target_ticks,
        cancel,
    ))
}

impl<E, D, T> MotionBuilder<E, D, T> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<BoxedMotion> {
        let encoders = self
            .encoders
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoders))?;
        let drive = self
            .drive
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDrive))?;
        let target_ticks = self
            .target_ticks
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTarget))?;

        validate_and_build(
            encoders,
            drive,
            MotionParams {
                target_ticks,
                mode: self.mode.unwrap_or_default(),
                control: self.control.unwrap_or_default(),
                safety: self.safety.unwrap_or_default(),
                clock: self.clock,
                cancel: self.cancel,
            },
        )
    }

    /// Rebuild with different type-state markers, keeping every field.
    fn retag<E2, D2, T2>(self) -> MotionBuilder<E2, D2, T2> {
        MotionBuilder {
            encoders: self.encoders,
            drive: self.drive,
            target_ticks: self.target_ticks,
            mode: self.mode,
            control: self.control,
            safety: self.safety,
            clock: self.clock,
            cancel: self.cancel,
            _e: PhantomData,
            _d: PhantomData,
            _t: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<E, D, T> MotionBuilder<E, D, T> {
    pub fn with_mode(mut self, mode: DriveMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Abort the move when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

// Setters that advance type-state
impl<D, T> MotionBuilder<Missing, D, T> {
    pub fn with_encoders(self, encoders: impl Encoders + 'static) -> MotionBuilder<Set, D, T> {
        let mut next = self.retag::<Set, D, T>();
        next.encoders = Some(Box::new(encoders));
        next
    }
}

impl<E, T> MotionBuilder<E, Missing, T> {
    pub fn with_drive(self, drive: impl Drive + 'static) -> MotionBuilder<E, Set, T> {
        let mut next = self.retag::<E, Set, T>();
        next.drive = Some(Box::new(drive));
        next
    }
}

impl<E, D> MotionBuilder<E, D, Missing> {
    /// Target position in encoder ticks, relative to the pose at `begin()`.
    pub fn with_target_ticks(self, ticks: f64) -> MotionBuilder<E, D, Set> {
        let mut next = self.retag::<E, D, Set>();
        next.target_ticks = Some(ticks);
        next
    }
}

impl MotionBuilder<Set, Set, Set> {
    /// Validate and build. Only available when encoders, drive and target are set.
    pub fn build(self) -> Result<BoxedMotion> {
        self.try_build()
    }
}

/// Build a statically dispatched controller from concrete encoders and drive.
///
/// Delegates to the shared validation used by the builder.
pub fn build_controller<E, D>(
    encoders: E,
    drive: D,
    params: MotionParams,
) -> Result<MotionController<E, D>>
where
    E: Encoders,
    D: Drive,
{
    validate_and_build(encoders, drive, params)
}
