//! Safe power-down: park, diagnose, release torque.
//!
//! Every step is best-effort and a failing step never skips the ones after
//! it. Running it again is safe and ends in the same state.

use trot_traits::{Actuator, ActuatorError, ActuatorId, Clock, ReleaseMechanism};

use crate::config::ShutdownCfg;
use crate::gait::GaitSequencer;
use crate::health::{HealthMonitor, HealthReport};
use crate::pose::PoseMapper;

/// What each shutdown step achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownOutcome {
    /// Position read before parking; `None` when the read failed.
    pub positions: Vec<(ActuatorId, Option<f32>)>,
    /// Joints whose park move could not be sent.
    pub neutral_failures: usize,
    pub diagnostic: HealthReport,
    /// Mechanism that released each actuator; `None` if none worked or the
    /// actuator cannot release torque.
    pub released: Vec<(ActuatorId, Option<ReleaseMechanism>)>,
}

impl ShutdownOutcome {
    pub fn all_released(&self) -> bool {
        self.released.iter().all(|(_, m)| m.is_some())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShutdownController {
    cfg: ShutdownCfg,
    runs: u32,
}

impl ShutdownController {
    pub fn new(cfg: ShutdownCfg) -> Self {
        Self { cfg, runs: 0 }
    }

    /// Times `shutdown` has run.
    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn shutdown(
        &mut self,
        bus: &mut dyn Actuator,
        mapper: &mut PoseMapper,
        sequencer: &mut GaitSequencer,
        monitor: &HealthMonitor,
        clock: &dyn Clock,
    ) -> ShutdownOutcome {
        self.runs += 1;
        tracing::info!(run = self.runs, "shutdown started");

        // 1. where is everything
        let ids: Vec<ActuatorId> = mapper.calibration().ids().collect();
        let mut positions = Vec::with_capacity(ids.len());
        for &id in &ids {
            match bus.read_position(id) {
                Ok(deg) => {
                    tracing::info!(actuator = %id, position_deg = deg, "position before park");
                    positions.push((id, Some(deg)));
                }
                Err(e) => {
                    tracing::warn!(actuator = %id, error = %e, "position read failed");
                    positions.push((id, None));
                }
            }
        }

        // 2. park
        let neutral_failures = sequencer.park(bus, mapper, self.cfg.move_duration);
        clock.sleep(self.cfg.park_wait());

        // 3. diagnostic pass, verdict ignored
        let diagnostic = monitor.evaluate(bus, mapper.calibration(), mapper.expected(), clock);
        tracing::info!(report = %diagnostic, "post-park diagnostic");

        // 4. release torque
        let released = mapper
            .calibration()
            .units()
            .map(|u| {
                let m = if u.caps.torque_release {
                    release(bus, u.id)
                } else {
                    None
                };
                (u.id, m)
            })
            .collect();

        tracing::info!(run = self.runs, neutral_failures, "shutdown complete");
        ShutdownOutcome {
            positions,
            neutral_failures,
            diagnostic,
            released,
        }
    }
}

/// Try each mechanism in order until one takes.
fn release(bus: &mut dyn Actuator, id: ActuatorId) -> Option<ReleaseMechanism> {
    for m in ReleaseMechanism::ORDERED {
        match bus.release_torque(id, m) {
            Ok(()) => {
                tracing::debug!(actuator = %id, mechanism = m.name(), "torque released");
                return Some(m);
            }
            Err(ActuatorError::CapabilityMissing { .. }) => {}
            Err(e) => {
                tracing::warn!(actuator = %id, mechanism = m.name(), error = %e, "torque release failed");
            }
        }
    }
    None
}
