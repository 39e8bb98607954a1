use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("encoder fault: {0}")]
    EncoderFault(&'static str),
    #[error("motor fault: {0}")]
    MotorFault(&'static str),
    #[error("drivetrain state poisoned")]
    Poisoned,
}
