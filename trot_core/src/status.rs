//! How a session ended.

use std::time::Duration;

use crate::error::{Result, TrotError};
use crate::health::HealthReport;
use crate::shutdown::ShutdownOutcome;

#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// External stop request. Not an error.
    Cancelled,
    /// `max_runtime` reached.
    BudgetExhausted,
    /// A fixed-length stand finished its hold.
    Completed,
    HealthViolation(HealthReport),
    Fault(TrotError),
}

impl ExitReason {
    pub fn is_error(&self) -> bool {
        matches!(self, ExitReason::HealthViolation(_) | ExitReason::Fault(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub exit: ExitReason,
    pub elapsed: Duration,
    pub states_advanced: u64,
    pub health_checks: u64,
    pub last_report: Option<HealthReport>,
    pub shutdown: ShutdownOutcome,
}

impl SessionSummary {
    /// `Ok` for a cancelled, timed-out or completed session, the typed error otherwise.
    /// The robot is already parked and released either way.
    pub fn into_result(self) -> Result<SessionSummary> {
        let err = match &self.exit {
            ExitReason::Cancelled | ExitReason::BudgetExhausted | ExitReason::Completed => None,
            ExitReason::HealthViolation(report) => {
                Some(TrotError::HealthViolation(report.summary()))
            }
            ExitReason::Fault(e) => Some(e.clone()),
        };
        match err {
            None => Ok(self),
            Some(e) => Err(eyre::Report::new(e)),
        }
    }
}
