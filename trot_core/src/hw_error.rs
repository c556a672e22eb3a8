//! Maps `ActuatorError` from the trait boundary to the typed `TrotError`.
//!
//! `CapabilityMissing` is deliberately absent from `TrotError`: callers that
//! can meet it (health reads, indicator, torque release) handle it before
//! mapping, and anywhere else it is a hardware fault.

use crate::error::TrotError;
use trot_traits::ActuatorError;

/// Map a bus error to a typed `TrotError`.
pub fn map_hw_error(e: &ActuatorError) -> TrotError {
    match e {
        ActuatorError::CommTimeout { id } => TrotError::CommTimeout { id: *id },
        ActuatorError::Bus { id, message } => TrotError::Hardware {
            id: *id,
            message: message.clone(),
        },
        ActuatorError::CapabilityMissing { id, .. } => TrotError::Hardware {
            id: *id,
            message: e.to_string(),
        },
    }
}

impl From<ActuatorError> for TrotError {
    fn from(e: ActuatorError) -> Self {
        map_hw_error(&e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trot_traits::ActuatorId;

    #[test]
    fn timeout_keeps_its_identity() {
        let id = ActuatorId(6);
        assert_eq!(
            map_hw_error(&ActuatorError::CommTimeout { id }),
            TrotError::CommTimeout { id }
        );
    }

    #[test]
    fn bus_and_capability_errors_become_hardware_faults() {
        let id = ActuatorId(2);
        let e: TrotError = ActuatorError::Bus {
            id,
            message: "checksum mismatch".into(),
        }
        .into();
        assert!(matches!(e, TrotError::Hardware { message, .. } if message == "checksum mismatch"));

        let e = map_hw_error(&ActuatorError::CapabilityMissing {
            id,
            capability: "indicator",
        });
        assert!(e.to_string().contains("does not support indicator"));
    }
}
