use thiserror::Error;
use trot_traits::ActuatorId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("actuator {id}: communication timeout")]
    CommTimeout { id: ActuatorId },
    #[error("actuator {id}: hardware error: {message}")]
    Hardware { id: ActuatorId, message: String },
    #[error("health check failed: {0}")]
    HealthViolation(String),
}

impl TrotError {
    pub(crate) fn unknown_actuator(id: ActuatorId) -> Self {
        TrotError::Config(format!("actuator {id} has no calibration entry"))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing actuator bus")]
    MissingBus,
    #[error("missing calibration table")]
    MissingCalibration,
    #[error("leg or probe references unknown actuator {0}")]
    UnknownActuator(ActuatorId),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
