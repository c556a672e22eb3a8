//! Per-actuator calibration: offset, safe range and resolved capabilities.

use std::collections::BTreeMap;

use trot_traits::{ActuatorId, Capabilities};

use crate::error::{BuildError, TrotError};

/// One joint actuator as the core sees it. Built once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorUnit {
    pub id: ActuatorId,
    /// Added to every semantic angle before clamping.
    pub offset_deg: f32,
    pub min_deg: f32,
    pub max_deg: f32,
    pub caps: Capabilities,
}

impl ActuatorUnit {
    pub fn new(id: impl Into<ActuatorId>, offset_deg: f32, min_deg: f32, max_deg: f32) -> Self {
        Self {
            id: id.into(),
            offset_deg,
            min_deg,
            max_deg,
            caps: Capabilities::default(),
        }
    }

    pub fn with_caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// `clamp(target + offset, min, max)`.
    ///
    /// Infinite targets land on the nearest bound; NaN is the caller's problem
    /// (see `pose::commit_angle`).
    #[inline]
    pub fn calibrated(&self, target_deg: f32) -> f32 {
        (target_deg + self.offset_deg).clamp(self.min_deg, self.max_deg)
    }
}

/// Lookup table id -> unit, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct CalibrationTable {
    units: BTreeMap<ActuatorId, ActuatorUnit>,
}

impl CalibrationTable {
    pub fn new(units: impl IntoIterator<Item = ActuatorUnit>) -> Result<Self, BuildError> {
        let mut map = BTreeMap::new();
        for u in units {
            if u.id.get() == 0 || u.id.get() > ActuatorId::MAX {
                return Err(BuildError::InvalidConfig("actuator id must be in 1..=253"));
            }
            if !(u.offset_deg.is_finite() && u.min_deg.is_finite() && u.max_deg.is_finite()) {
                return Err(BuildError::InvalidConfig("calibration values must be finite"));
            }
            if u.min_deg >= u.max_deg {
                return Err(BuildError::InvalidConfig("min_deg must be < max_deg"));
            }
            if map.insert(u.id, u).is_some() {
                return Err(BuildError::InvalidConfig("duplicate actuator id"));
            }
        }
        if map.is_empty() {
            return Err(BuildError::InvalidConfig("calibration table is empty"));
        }
        Ok(Self { units: map })
    }

    pub fn get(&self, id: ActuatorId) -> Result<&ActuatorUnit, TrotError> {
        self.units
            .get(&id)
            .ok_or_else(|| TrotError::unknown_actuator(id))
    }

    pub fn contains(&self, id: ActuatorId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ActuatorId> + '_ {
        self.units.keys().copied()
    }

    pub fn units(&self) -> impl Iterator<Item = &ActuatorUnit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Record what the bus reported for `id`.
    pub(crate) fn set_capabilities(&mut self, id: ActuatorId, caps: Capabilities) {
        if let Some(u) = self.units.get_mut(&id) {
            u.caps = caps;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrated_clamps_to_the_safe_range() {
        let u = ActuatorUnit::new(3, 10.0, 40.0, 200.0);
        assert_eq!(u.calibrated(195.0), 200.0);
        assert_eq!(u.calibrated(100.0), 110.0);
        assert_eq!(u.calibrated(-500.0), 40.0);
        assert_eq!(u.calibrated(f32::INFINITY), 200.0);
        assert_eq!(u.calibrated(f32::NEG_INFINITY), 40.0);
    }

    #[test]
    fn unknown_id_is_a_configuration_error() {
        let t = CalibrationTable::new([ActuatorUnit::new(1, 0.0, 40.0, 200.0)]).unwrap();
        let err = t.get(ActuatorId(9)).unwrap_err();
        assert!(matches!(err, TrotError::Config(_)));
        assert!(err.to_string().contains("#9"));
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(CalibrationTable::new([]).is_err());
        assert_eq!(
            CalibrationTable::new([
                ActuatorUnit::new(1, 0.0, 40.0, 200.0),
                ActuatorUnit::new(1, 5.0, 40.0, 200.0),
            ])
            .unwrap_err(),
            BuildError::InvalidConfig("duplicate actuator id")
        );
        assert!(CalibrationTable::new([ActuatorUnit::new(2, 0.0, 90.0, 90.0)]).is_err());
        assert!(CalibrationTable::new([ActuatorUnit::new(0, 0.0, 40.0, 200.0)]).is_err());
        assert!(CalibrationTable::new([ActuatorUnit::new(2, f32::NAN, 40.0, 200.0)]).is_err());
    }
}
