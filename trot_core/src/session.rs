//! Per-session state. Everything the loop mutates lives here; there are no
//! process-wide globals.

use std::sync::Arc;
use std::time::Instant;

use trot_traits::{Actuator, Clock};

use crate::builder::{Missing, SessionBuilder};
use crate::config::{HomingCfg, RuntimeBudget};
use crate::gait::{GaitSequencer, GaitState};
use crate::health::{HealthMonitor, HealthReport};
use crate::pose::{ExpectedAngles, PoseMapper};
use crate::shutdown::ShutdownController;

pub struct TrotSession {
    pub(crate) bus: Box<dyn Actuator>,
    pub(crate) mapper: PoseMapper,
    pub(crate) sequencer: GaitSequencer,
    pub(crate) monitor: HealthMonitor,
    pub(crate) shutdown: ShutdownController,
    pub(crate) budget: RuntimeBudget,
    pub(crate) homing: HomingCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) cancel_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) epoch: Instant,
    pub(crate) last_report: Option<HealthReport>,
}

impl core::fmt::Debug for TrotSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrotSession")
            .field("state", &self.sequencer.state())
            .field("actuators", &self.mapper.calibration().len())
            .field("budget", &self.budget)
            .field("health_checks", &self.monitor.checks_run())
            .field("shutdown_runs", &self.shutdown.runs())
            .finish()
    }
}

impl TrotSession {
    /// Start building a session.
    pub fn builder() -> SessionBuilder<Missing, Missing> {
        SessionBuilder::default()
    }

    pub fn state(&self) -> GaitState {
        self.sequencer.state()
    }

    pub fn expected(&self) -> &ExpectedAngles {
        self.mapper.expected()
    }

    pub fn mapper(&self) -> &PoseMapper {
        &self.mapper
    }

    pub fn sequencer(&self) -> &GaitSequencer {
        &self.sequencer
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn budget(&self) -> &RuntimeBudget {
        &self.budget
    }

    pub fn shutdown_runs(&self) -> u32 {
        self.shutdown.runs()
    }

    /// Most recent scheduled or manual health report.
    pub fn last_report(&self) -> Option<&HealthReport> {
        self.last_report.as_ref()
    }

    /// One health check right now, outside the polling schedule.
    pub fn check_health(&mut self) -> HealthReport {
        let report = self.monitor.run_check(
            &mut *self.bus,
            self.mapper.calibration(),
            self.mapper.expected(),
            &*self.clock,
        );
        self.last_report = Some(report.clone());
        report
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel_check.as_ref().is_some_and(|f| f())
    }
}
