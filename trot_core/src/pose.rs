//! Semantic joint targets to calibrated, range-clamped actuator commands.

use std::collections::BTreeMap;
use std::time::Duration;

use trot_traits::{Actuator, ActuatorId};

use crate::calibration::{ActuatorUnit, CalibrationTable};
use crate::error::TrotError;
use crate::legs::LegAssembly;

/// Last committed (post-offset, post-clamp) angle per actuator.
///
/// Only `PoseMapper` writes it; everything else gets `&` access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedAngles {
    angles: BTreeMap<ActuatorId, f32>,
}

impl ExpectedAngles {
    pub fn get(&self, id: ActuatorId) -> Option<f32> {
        self.angles.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActuatorId, f32)> + '_ {
        self.angles.iter().map(|(k, v)| (*k, *v))
    }

    pub(crate) fn record(&mut self, id: ActuatorId, angle: f32) {
        self.angles.insert(id, angle);
    }
}

/// Calibrate and clamp `target_deg` for `unit`.
///
/// Never refuses a number: out-of-range and infinite targets land on the
/// nearest bound. NaN has no nearest bound and is rejected.
pub fn commit_angle(unit: &ActuatorUnit, target_deg: f32) -> Result<f32, TrotError> {
    if target_deg.is_nan() {
        return Err(TrotError::Config(format!(
            "target angle for actuator {} is NaN",
            unit.id
        )));
    }
    Ok(unit.calibrated(target_deg))
}

#[derive(Debug, Clone)]
pub struct PoseMapper {
    calibration: CalibrationTable,
    expected: ExpectedAngles,
}

impl PoseMapper {
    pub fn new(calibration: CalibrationTable) -> Self {
        Self {
            calibration,
            expected: ExpectedAngles::default(),
        }
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    pub fn expected(&self) -> &ExpectedAngles {
        &self.expected
    }

    /// Command one joint; returns the angle actually sent.
    ///
    /// The expected table is updated before the move goes out, so a move the
    /// bus drops still shows up as a position mismatch at the next check.
    pub fn set_joint_angle(
        &mut self,
        bus: &mut dyn Actuator,
        id: ActuatorId,
        target_deg: f32,
        duration: Duration,
    ) -> Result<f32, TrotError> {
        let unit = self.calibration.get(id)?;
        let committed = commit_angle(unit, target_deg)?;
        self.expected.record(id, committed);
        tracing::trace!(actuator = %id, target_deg, committed, "move");
        bus.move_to(id, committed, duration)?;
        Ok(committed)
    }

    /// Hip then knee. Both are attempted; a hardware or configuration error
    /// wins over a timeout so the caller never tolerates a real fault.
    pub fn set_leg_angles(
        &mut self,
        bus: &mut dyn Actuator,
        leg: &LegAssembly,
        hip_deg: f32,
        knee_deg: f32,
        duration: Duration,
    ) -> Result<(), TrotError> {
        let hip = self.set_joint_angle(bus, leg.hip, hip_deg, duration);
        let knee = self.set_joint_angle(bus, leg.knee, knee_deg, duration);
        match (hip, knee) {
            (Err(TrotError::CommTimeout { .. }), Err(e)) => Err(e),
            (hip, knee) => hip.and(knee).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ActuatorUnit;
    use crate::legs::{LegPosition, NeutralPoses};
    use trot_traits::{ActuatorError, ActuatorResult, Capabilities};

    /// Hip 1 times out, knee 2 reports `knee_error`.
    struct FailingLeg {
        knee_error: ActuatorError,
    }

    impl Actuator for FailingLeg {
        fn capabilities(&mut self, _id: ActuatorId) -> Capabilities {
            Capabilities::FULL
        }
        fn move_to(&mut self, id: ActuatorId, _: f32, _: Duration) -> ActuatorResult<()> {
            match id.get() {
                1 => Err(ActuatorError::CommTimeout { id }),
                _ => Err(self.knee_error.clone()),
            }
        }
        fn set_angle_limits(&mut self, _: ActuatorId, _: f32, _: f32) -> ActuatorResult<()> {
            Ok(())
        }
        fn read_temperature(&mut self, _: ActuatorId) -> ActuatorResult<f32> {
            Ok(25.0)
        }
        fn read_bus_voltage(&mut self, _: ActuatorId) -> ActuatorResult<f32> {
            Ok(7400.0)
        }
        fn read_position(&mut self, _: ActuatorId) -> ActuatorResult<f32> {
            Ok(90.0)
        }
    }

    fn mapper() -> PoseMapper {
        let table = CalibrationTable::new(
            [1u8, 2].map(|id| ActuatorUnit::new(id, 0.0, 0.0, 180.0)),
        )
        .unwrap();
        PoseMapper::new(table)
    }

    #[test]
    fn knee_fault_wins_over_hip_timeout() {
        let mut bus = FailingLeg {
            knee_error: ActuatorError::Bus {
                id: ActuatorId(2),
                message: "overload protection tripped".into(),
            },
        };
        let leg = LegAssembly::new(LegPosition::FrontLeft, 1, 2, false, &NeutralPoses::default());
        let err = mapper()
            .set_leg_angles(&mut bus, &leg, 90.0, 90.0, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, TrotError::Hardware { id: ActuatorId(2), .. }), "{err}");
    }

    #[test]
    fn two_timeouts_report_the_hip() {
        let mut bus = FailingLeg {
            knee_error: ActuatorError::CommTimeout { id: ActuatorId(2) },
        };
        let leg = LegAssembly::new(LegPosition::FrontLeft, 1, 2, false, &NeutralPoses::default());
        let err = mapper()
            .set_leg_angles(&mut bus, &leg, 90.0, 90.0, Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, TrotError::CommTimeout { id: ActuatorId(1) });
    }
}
