//! Session loops: trot, stand, and the shared shutdown path.

use std::time::Duration;

use crate::error::TrotError;
use crate::session::TrotSession;
use crate::shutdown::ShutdownOutcome;
use crate::status::{ExitReason, SessionSummary};

impl TrotSession {
    /// Reset per-session state. Time zero for the budget and the poll schedule.
    fn begin(&mut self) {
        self.epoch = self.clock.now();
        self.monitor.begin(self.epoch);
        self.last_report = None;
    }

    /// Stand, trot until something ends the session, then shut down.
    ///
    /// Cancellation is checked once before standing and then between gait
    /// states, so the phase in flight always finishes its wait first.
    /// Shutdown runs exactly once per call.
    pub fn run(&mut self) -> SessionSummary {
        self.begin();
        tracing::info!(
            max_runtime_ms = self.budget.max_runtime.as_millis() as u64,
            poll_ms = self.budget.poll_interval.as_millis() as u64,
            step_ms = self.sequencer.timing().step.as_millis() as u64,
            "session start"
        );
        if let Some(exit) = self.cancelled_before_stand() {
            return self.finish(exit);
        }
        let exit = match self.stand() {
            Ok(()) => self.trot(),
            Err(e) => ExitReason::Fault(e),
        };
        self.finish(exit)
    }

    /// Stand and hold for `hold` (or until cancelled, out of budget or
    /// unhealthy), then shut down.
    pub fn stand_only(&mut self, hold: Duration) -> SessionSummary {
        self.begin();
        tracing::info!(hold_ms = hold.as_millis() as u64, "stand session start");
        if let Some(exit) = self.cancelled_before_stand() {
            return self.finish(exit);
        }
        let exit = match self.stand() {
            Ok(()) => self.hold(hold),
            Err(e) => ExitReason::Fault(e),
        };
        self.finish(exit)
    }

    /// Park, diagnose, release. Safe to call any number of times.
    pub fn shutdown(&mut self) -> ShutdownOutcome {
        self.shutdown.shutdown(
            &mut *self.bus,
            &mut self.mapper,
            &mut self.sequencer,
            &self.monitor,
            &*self.clock,
        )
    }

    /// A stop requested before the session starts skips the stand entirely.
    fn cancelled_before_stand(&self) -> Option<ExitReason> {
        if !self.cancelled() {
            return None;
        }
        tracing::info!("cancellation requested before standing");
        Some(ExitReason::Cancelled)
    }

    fn stand(&mut self) -> Result<(), TrotError> {
        self.sequencer
            .stand(&mut *self.bus, &mut self.mapper, &*self.clock)
    }

    fn trot(&mut self) -> ExitReason {
        loop {
            if let Some(exit) = self.interrupted() {
                return exit;
            }
            if let Err(e) = self
                .sequencer
                .advance(&mut *self.bus, &mut self.mapper, &*self.clock)
            {
                tracing::error!(error = %e, state = %self.sequencer.state(), "gait fault");
                return ExitReason::Fault(e);
            }
        }
    }

    fn hold(&mut self, hold: Duration) -> ExitReason {
        let start = self.clock.now();
        let chunk = self.sequencer.timing().phase().max(Duration::from_millis(1));
        loop {
            if let Some(exit) = self.interrupted() {
                return exit;
            }
            let held = self.clock.elapsed(start);
            if held >= hold {
                return ExitReason::Completed;
            }
            self.clock.sleep(chunk.min(hold - held));
        }
    }

    /// Cancellation, budget and scheduled health check, in that order.
    fn interrupted(&mut self) -> Option<ExitReason> {
        if self.cancelled() {
            tracing::info!(state = %self.sequencer.state(), "cancellation requested");
            return Some(ExitReason::Cancelled);
        }
        let elapsed = self.clock.elapsed(self.epoch);
        if elapsed >= self.budget.max_runtime {
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "runtime budget exhausted");
            return Some(ExitReason::BudgetExhausted);
        }
        let report = self.monitor.poll(
            &mut *self.bus,
            self.mapper.calibration(),
            self.mapper.expected(),
            &*self.clock,
        )?;
        let pass = report.is_pass();
        self.last_report = Some(report.clone());
        (!pass).then_some(ExitReason::HealthViolation(report))
    }

    fn finish(&mut self, exit: ExitReason) -> SessionSummary {
        match &exit {
            ExitReason::HealthViolation(r) => tracing::error!(report = %r, "stopping: health violation"),
            ExitReason::Fault(e) => tracing::error!(error = %e, "stopping: fault"),
            other => tracing::info!(reason = ?other, "stopping"),
        }
        let shutdown = self.shutdown();
        SessionSummary {
            exit,
            elapsed: self.clock.elapsed(self.epoch),
            states_advanced: self.sequencer.states_advanced(),
            health_checks: self.monitor.checks_run(),
            last_report: self.last_report.clone(),
            shutdown,
        }
    }
}
