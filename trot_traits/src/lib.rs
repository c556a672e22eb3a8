//! Hardware seam for the trot controller.
//!
//! Everything the core needs from a joint actuator goes through [`Actuator`].
//! Bus framing, checksums and per-model encodings live behind it.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::fmt;
use std::time::Duration;

/// Bus address of one joint actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActuatorId(pub u8);

impl ActuatorId {
    /// Highest id a servo bus will address; 254 is broadcast.
    pub const MAX: u8 = 253;

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u8> for ActuatorId {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// Optional features of a given actuator, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub current_sense: bool,
    pub position_sense: bool,
    pub indicator: bool,
    pub torque_release: bool,
}

impl Capabilities {
    /// Every optional feature present.
    pub const FULL: Self = Self {
        current_sense: true,
        position_sense: true,
        indicator: true,
        torque_release: true,
    };
}

/// Ways to make an actuator stop holding its position, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMechanism {
    /// Dedicated torque-disable register.
    TorqueOff,
    /// Motor unload command (load/unload toggle on bus servos).
    Unload,
}

impl ReleaseMechanism {
    pub const ORDERED: [Self; 2] = [Self::TorqueOff, Self::Unload];

    pub fn name(self) -> &'static str {
        match self {
            ReleaseMechanism::TorqueOff => "torque_off",
            ReleaseMechanism::Unload => "unload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuatorError {
    #[error("actuator {id} did not reply (communication timeout)")]
    CommTimeout { id: ActuatorId },
    #[error("actuator {id} does not support {capability}")]
    CapabilityMissing {
        id: ActuatorId,
        capability: &'static str,
    },
    #[error("actuator {id} bus error: {message}")]
    Bus { id: ActuatorId, message: String },
}

impl ActuatorError {
    pub fn id(&self) -> ActuatorId {
        match self {
            ActuatorError::CommTimeout { id }
            | ActuatorError::CapabilityMissing { id, .. }
            | ActuatorError::Bus { id, .. } => *id,
        }
    }

    /// True for failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ActuatorError::CapabilityMissing { .. })
    }
}

pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// A bus of joint actuators. Every call must be bounded by the implementation's
/// own timeout and report `CommTimeout` rather than block.
pub trait Actuator {
    /// Optional features of `id`; queried once when a session is built.
    fn capabilities(&mut self, id: ActuatorId) -> Capabilities;

    /// Start a timed move to `angle_deg`; returns once the command is on the bus.
    fn move_to(
        &mut self,
        id: ActuatorId,
        angle_deg: f32,
        duration: Duration,
    ) -> ActuatorResult<()>;

    fn set_angle_limits(
        &mut self,
        id: ActuatorId,
        min_deg: f32,
        max_deg: f32,
    ) -> ActuatorResult<()>;

    /// Internal temperature in degrees Celsius.
    fn read_temperature(&mut self, id: ActuatorId) -> ActuatorResult<f32>;

    /// Supply voltage seen by `id`, in millivolts.
    fn read_bus_voltage(&mut self, id: ActuatorId) -> ActuatorResult<f32>;

    /// Current draw in milliamps.
    fn read_current(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        Err(ActuatorError::CapabilityMissing {
            id,
            capability: "current sensing",
        })
    }

    /// Present physical angle in degrees.
    fn read_position(&mut self, id: ActuatorId) -> ActuatorResult<f32>;

    fn set_indicator(&mut self, id: ActuatorId, _on: bool) -> ActuatorResult<()> {
        Err(ActuatorError::CapabilityMissing {
            id,
            capability: "indicator",
        })
    }

    fn release_torque(
        &mut self,
        id: ActuatorId,
        mechanism: ReleaseMechanism,
    ) -> ActuatorResult<()> {
        Err(ActuatorError::CapabilityMissing {
            id,
            capability: mechanism.name(),
        })
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn capabilities(&mut self, id: ActuatorId) -> Capabilities {
        (**self).capabilities(id)
    }
    fn move_to(
        &mut self,
        id: ActuatorId,
        angle_deg: f32,
        duration: Duration,
    ) -> ActuatorResult<()> {
        (**self).move_to(id, angle_deg, duration)
    }
    fn set_angle_limits(
        &mut self,
        id: ActuatorId,
        min_deg: f32,
        max_deg: f32,
    ) -> ActuatorResult<()> {
        (**self).set_angle_limits(id, min_deg, max_deg)
    }
    fn read_temperature(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        (**self).read_temperature(id)
    }
    fn read_bus_voltage(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        (**self).read_bus_voltage(id)
    }
    fn read_current(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        (**self).read_current(id)
    }
    fn read_position(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        (**self).read_position(id)
    }
    fn set_indicator(&mut self, id: ActuatorId, on: bool) -> ActuatorResult<()> {
        (**self).set_indicator(id, on)
    }
    fn release_torque(
        &mut self,
        id: ActuatorId,
        mechanism: ReleaseMechanism,
    ) -> ActuatorResult<()> {
        (**self).release_torque(id, mechanism)
    }
}
