use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("{var}={value:?}: {reason}")]
    InvalidFaultSpec {
        var: String,
        value: String,
        reason: &'static str,
    },
    #[error("simulated bus has no servo with id {0}")]
    UnknownServo(u8),
}

pub type Result<T> = std::result::Result<T, SimError>;
