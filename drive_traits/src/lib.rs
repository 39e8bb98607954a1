pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Quadrature encoders on the left and right wheels, in ticks.
pub trait Encoders {
    fn read_left(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
    fn read_right(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
    /// Zero both counters.
    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Left/right motor outputs. Power is signed; the valid range belongs to the
/// actuator (e.g. -127..=127).
pub trait Drive {
    fn set_left_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_right_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Encoders + ?Sized> Encoders for Box<T> {
    fn read_left(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_left()
    }
    fn read_right(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_right()
    }
    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).reset()
    }
}

impl<T: Drive + ?Sized> Drive for Box<T> {
    fn set_left_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_left_power(power)
    }
    fn set_right_power(
        &mut self,
        power: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_right_power(power)
    }
}
