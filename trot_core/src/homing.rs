//! Pre-gait homing: check health, send every joint to one angle, confirm it
//! got there.

use trot_traits::ActuatorId;

use crate::error::{Result, TrotError};
use crate::health::HealthReport;
use crate::session::TrotSession;

#[derive(Debug, Clone, PartialEq)]
pub struct HomedJoint {
    pub id: ActuatorId,
    /// Committed angle (home angle after offset and clamp).
    pub target: f32,
    pub position: Option<f32>,
}

impl HomedJoint {
    pub fn error(&self) -> Option<f32> {
        self.position.map(|p| (p - self.target).abs())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomingReport {
    pub start_positions: Vec<(ActuatorId, Option<f32>)>,
    pub preflight: HealthReport,
    pub joints: Vec<HomedJoint>,
    pub tolerance_deg: f32,
}

impl HomingReport {
    /// Joints that did not reply or are outside tolerance.
    pub fn off_home(&self) -> Vec<ActuatorId> {
        self.joints
            .iter()
            .filter(|j| j.error().is_none_or(|e| e > self.tolerance_deg))
            .map(|j| j.id)
            .collect()
    }

    pub fn all_home(&self) -> bool {
        self.off_home().is_empty()
    }
}

impl TrotSession {
    /// Log positions, run a pre-flight check, move every actuator to the home
    /// angle and verify it.
    ///
    /// A failed pre-flight check returns `TrotError::HealthViolation` before
    /// anything moves. A joint that misses home is reported, not raised.
    pub fn home(&mut self) -> Result<HomingReport> {
        let cfg = self.homing;
        let ids: Vec<ActuatorId> = self.mapper.calibration().ids().collect();

        let start_positions: Vec<_> = ids
            .iter()
            .map(|&id| {
                let pos = self.bus.read_position(id);
                match &pos {
                    Ok(deg) => tracing::info!(actuator = %id, position_deg = *deg, "current position"),
                    Err(e) => tracing::warn!(actuator = %id, error = %e, "did not reply"),
                }
                (id, pos.ok())
            })
            .collect();

        let preflight = self.check_health();
        if !preflight.is_pass() {
            return Err(eyre::Report::new(TrotError::HealthViolation(
                preflight.summary(),
            )));
        }

        tracing::info!(home_deg = cfg.home_deg, move_ms = cfg.move_duration.as_millis() as u64, "moving to home");
        for &id in &ids {
            if let Err(e) =
                self.mapper
                    .set_joint_angle(&mut *self.bus, id, cfg.home_deg, cfg.move_duration)
            {
                tracing::warn!(actuator = %id, error = %e, "home move failed");
            }
        }
        self.clock
            .sleep(cfg.move_duration.saturating_add(cfg.settle_margin));

        let joints: Vec<HomedJoint> = ids
            .iter()
            .map(|&id| {
                let target = self.mapper.expected().get(id).unwrap_or(cfg.home_deg);
                let position = self.bus.read_position(id).ok();
                let joint = HomedJoint {
                    id,
                    target,
                    position,
                };
                match joint.error() {
                    Some(err) if err <= cfg.tolerance_deg => {
                        tracing::info!(actuator = %id, error_deg = err, "at home");
                    }
                    Some(err) => tracing::warn!(actuator = %id, error_deg = err, "did not reach home"),
                    None => tracing::warn!(actuator = %id, "no reply during verify"),
                }
                joint
            })
            .collect();

        let report = HomingReport {
            start_positions,
            preflight,
            joints,
            tolerance_deg: cfg.tolerance_deg,
        };
        if report.all_home() {
            tracing::info!("robot reached home state");
        }
        Ok(report)
    }
}
