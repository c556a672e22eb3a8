//! Type-state builder for `TrotSession`.
//!
//! The builder enforces at compile time that the bus and the calibration table
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use trot_traits::{Actuator, ActuatorId, Clock, MonotonicClock};

use crate::calibration::CalibrationTable;
use crate::config::{
    GaitTiming, HealthThresholds, HomingCfg, PoseParams, RetryPolicy, RuntimeBudget, ShutdownCfg,
};
use crate::error::{BuildError, Result, TrotError};
use crate::gait::GaitSequencer;
use crate::health::HealthMonitor;
use crate::legs::LegSet;
use crate::pose::PoseMapper;
use crate::session::TrotSession;
use crate::shutdown::ShutdownController;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TrotSession`. All fields are validated on `build()`.
pub struct SessionBuilder<B, C> {
    bus: Option<Box<dyn Actuator>>,
    calibration: Option<CalibrationTable>,
    legs: Option<LegSet>,
    pose: Option<PoseParams>,
    timing: Option<GaitTiming>,
    thresholds: Option<HealthThresholds>,
    retry: Option<RetryPolicy>,
    budget: Option<RuntimeBudget>,
    shutdown: Option<ShutdownCfg>,
    homing: Option<HomingCfg>,
    voltage_probe: Option<ActuatorId>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    cancel_check: Option<Box<dyn Fn() -> bool>>,
    _b: PhantomData<B>,
    _c: PhantomData<C>,
}

impl Default for SessionBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            bus: None,
            calibration: None,
            legs: None,
            pose: None,
            timing: None,
            thresholds: None,
            retry: None,
            budget: None,
            shutdown: None,
            homing: None,
            voltage_probe: None,
            clock: None,
            cancel_check: None,
            _b: PhantomData,
            _c: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate the pieces, resolve capabilities, push angle limits to the bus.
///
/// This is the only place a session is constructed.
#[allow(clippy::too_many_arguments)]
fn validate_and_build(
    mut bus: Box<dyn Actuator>,
    mut calibration: CalibrationTable,
    legs: LegSet,
    pose: PoseParams,
    timing: GaitTiming,
    thresholds: HealthThresholds,
    retry: RetryPolicy,
    budget: RuntimeBudget,
    shutdown: ShutdownCfg,
    homing: HomingCfg,
    voltage_probe: Option<ActuatorId>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    cancel_check: Option<Box<dyn Fn() -> bool>>,
) -> Result<TrotSession> {
    // ── Validation ───────────────────────────────────────────────────────────
    for id in legs.actuators() {
        if !calibration.contains(id) {
            return Err(eyre::Report::new(BuildError::UnknownActuator(id)));
        }
    }
    if let Some(id) = voltage_probe
        && !calibration.contains(id)
    {
        return Err(eyre::Report::new(BuildError::UnknownActuator(id)));
    }
    if timing.step.is_zero() {
        return Err(invalid("step period must be > 0"));
    }
    if budget.poll_interval.is_zero() {
        return Err(invalid("poll interval must be > 0"));
    }
    if budget.max_runtime.is_zero() {
        return Err(invalid("max runtime must be > 0"));
    }
    if retry.attempts == 0 {
        return Err(invalid("read attempts must be >= 1"));
    }
    if !(0.0..=1.0).contains(&pose.support_fraction) {
        return Err(invalid("support fraction must be in [0, 1]"));
    }
    if !(thresholds.min_voltage_v < thresholds.max_voltage_v) {
        return Err(invalid("voltage band is empty"));
    }
    if !(thresholds.min_current_ma < thresholds.max_current_ma) {
        return Err(invalid("current band is empty"));
    }

    // ── Hardware setup (no motion) ───────────────────────────────────────────
    let ids: Vec<ActuatorId> = calibration.ids().collect();
    for id in ids {
        let caps = bus.capabilities(id);
        calibration.set_capabilities(id, caps);
        let unit = calibration.get(id)?;
        let (min, max) = (unit.min_deg, unit.max_deg);
        bus.set_angle_limits(id, min, max).map_err(|e| {
            eyre::Report::new(TrotError::Config(format!(
                "could not apply angle limits [{min}, {max}] to actuator {id}: {e}"
            )))
        })?;
        tracing::debug!(actuator = %id, ?caps, min, max, "actuator ready");
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let mut monitor = HealthMonitor::new(thresholds, retry, budget.poll_interval);
    if let Some(id) = voltage_probe {
        monitor = monitor.with_voltage_probe(id);
    }

    Ok(TrotSession {
        bus,
        mapper: PoseMapper::new(calibration),
        sequencer: GaitSequencer::new(legs, pose, timing),
        monitor,
        shutdown: ShutdownController::new(shutdown),
        budget,
        homing,
        clock,
        cancel_check,
        epoch,
        last_report: None,
    })
}

impl<B, C> SessionBuilder<B, C> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<TrotSession> {
        let bus = self
            .bus
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBus))?;
        let calibration = self
            .calibration
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCalibration))?;

        validate_and_build(
            bus,
            calibration,
            self.legs.unwrap_or_default(),
            self.pose.unwrap_or_default(),
            self.timing.unwrap_or_default(),
            self.thresholds.unwrap_or_default(),
            self.retry.unwrap_or_default(),
            self.budget.unwrap_or_default(),
            self.shutdown.unwrap_or_default(),
            self.homing.unwrap_or_default(),
            self.voltage_probe,
            self.clock,
            self.cancel_check,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<B, C> SessionBuilder<B, C> {
    pub fn with_legs(mut self, legs: LegSet) -> Self {
        self.legs = Some(legs);
        self
    }
    pub fn with_pose(mut self, pose: PoseParams) -> Self {
        self.pose = Some(pose);
        self
    }
    pub fn with_timing(mut self, timing: GaitTiming) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
    pub fn with_budget(mut self, budget: RuntimeBudget) -> Self {
        self.budget = Some(budget);
        self
    }
    pub fn with_shutdown(mut self, shutdown: ShutdownCfg) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
    pub fn with_homing(mut self, homing: HomingCfg) -> Self {
        self.homing = Some(homing);
        self
    }
    /// Actuator whose supply voltage stands for the whole bus.
    pub fn with_voltage_probe(mut self, id: impl Into<ActuatorId>) -> Self {
        self.voltage_probe = Some(id.into());
        self
    }
    /// Polled between gait states; `true` ends the session.
    pub fn with_cancel_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.cancel_check = Some(Box::new(f));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<C> SessionBuilder<Missing, C> {
    pub fn with_bus(self, bus: impl Actuator + 'static) -> SessionBuilder<Set, C> {
        SessionBuilder {
            bus: Some(Box::new(bus)),
            calibration: self.calibration,
            legs: self.legs,
            pose: self.pose,
            timing: self.timing,
            thresholds: self.thresholds,
            retry: self.retry,
            budget: self.budget,
            shutdown: self.shutdown,
            homing: self.homing,
            voltage_probe: self.voltage_probe,
            clock: self.clock,
            cancel_check: self.cancel_check,
            _b: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<B> SessionBuilder<B, Missing> {
    pub fn with_calibration(self, calibration: CalibrationTable) -> SessionBuilder<B, Set> {
        SessionBuilder {
            bus: self.bus,
            calibration: Some(calibration),
            legs: self.legs,
            pose: self.pose,
            timing: self.timing,
            thresholds: self.thresholds,
            retry: self.retry,
            budget: self.budget,
            shutdown: self.shutdown,
            homing: self.homing,
            voltage_probe: self.voltage_probe,
            clock: self.clock,
            cancel_check: self.cancel_check,
            _b: PhantomData,
            _c: PhantomData,
        }
    }
}

impl SessionBuilder<Set, Set> {
    /// Validate and build the session. Only available once bus and calibration are set.
    pub fn build(self) -> Result<TrotSession> {
        self.try_build()
    }
}
