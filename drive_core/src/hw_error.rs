//! Maps `Box<dyn Error>` from trait boundaries to typed `DriveError`.
//!
//! The traits in `drive_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `drive_hardware::error::HwError` downcasting.

use crate::error::DriveError;

/// Map a trait-boundary error to a typed `DriveError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DriveError {
    #[cfg(feature = "hardware-errors")]
    {
        use drive_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return DriveError::HardwareFault(hw.to_string());
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("fault") {
        DriveError::HardwareFault(s)
    } else {
        DriveError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_fall_back_to_strings() {
        let e = std::io::Error::other("bus glitch");
        assert!(matches!(map_hw_error(&e), DriveError::Hardware(s) if s == "bus glitch"));
        let e = std::io::Error::other("Motor FAULT latched");
        assert!(matches!(map_hw_error(&e), DriveError::HardwareFault(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use drive_hardware::error::HwError;
        let e = HwError::EncoderFault("left channel not responding");
        assert!(matches!(map_hw_error(&e), DriveError::HardwareFault(_)));
        // "motor fault" would also match the string fallback; Poisoned would not
        assert!(matches!(
            map_hw_error(&HwError::Poisoned),
            DriveError::HardwareFault(s) if s == "drivetrain state poisoned"
        ));
    }
}
