//! Periodic telemetry checks with bounded retries and aggregated verdicts.
//!
//! A check never fails fast: every actuator and every metric is read, and all
//! faults end up in one `HealthReport`.

use std::fmt;
use std::time::{Duration, Instant};

use trot_traits::{Actuator, ActuatorError, ActuatorId, ActuatorResult, Clock};

use crate::calibration::CalibrationTable;
use crate::config::{HealthThresholds, RetryPolicy};
use crate::pose::ExpectedAngles;
use crate::util::{Exhausted, retry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Voltage,
    Current,
    Position,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Temperature => "temperature",
            Metric::Voltage => "bus voltage",
            Metric::Current => "current",
            Metric::Position => "position",
        })
    }
}

/// One threshold breach or unrecovered read, with enough detail to diagnose
/// without touching the hardware again.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Overheat {
        id: ActuatorId,
        temp_c: f32,
        max_c: f32,
    },
    Power {
        id: ActuatorId,
        volts: f32,
        min_v: f32,
        max_v: f32,
    },
    Electrical {
        id: ActuatorId,
        current_ma: f32,
        min_ma: f32,
        max_ma: f32,
    },
    PossiblyStuck {
        id: ActuatorId,
        position: f32,
        expected: f32,
        tolerance: f32,
    },
    Comm {
        id: ActuatorId,
        metric: Metric,
        attempts: u8,
        error: String,
    },
}

impl Fault {
    pub fn actuator(&self) -> ActuatorId {
        match self {
            Fault::Overheat { id, .. }
            | Fault::Power { id, .. }
            | Fault::Electrical { id, .. }
            | Fault::PossiblyStuck { id, .. }
            | Fault::Comm { id, .. } => *id,
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            Fault::Overheat { .. } => Metric::Temperature,
            Fault::Power { .. } => Metric::Voltage,
            Fault::Electrical { .. } => Metric::Current,
            Fault::PossiblyStuck { .. } => Metric::Position,
            Fault::Comm { metric, .. } => *metric,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Fault::Overheat { .. } => "overheat",
            Fault::Power { .. } => "power",
            Fault::Electrical { .. } => "electrical",
            Fault::PossiblyStuck { .. } => "possibly_stuck",
            Fault::Comm { .. } => "communication",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Overheat { id, temp_c, max_c } => write!(
                f,
                "overheat: actuator {id} temperature {temp_c:.1} C exceeds ceiling {max_c:.1} C"
            ),
            Fault::Power {
                id,
                volts,
                min_v,
                max_v,
            } => write!(
                f,
                "power fault: bus voltage {volts:.2} V (read on actuator {id}) outside [{min_v:.2} V, {max_v:.2} V]"
            ),
            Fault::Electrical {
                id,
                current_ma,
                min_ma,
                max_ma,
            } => write!(
                f,
                "electrical fault: actuator {id} current {current_ma:.0} mA outside [{min_ma:.0} mA, {max_ma:.0} mA]"
            ),
            Fault::PossiblyStuck {
                id,
                position,
                expected,
                tolerance,
            } => write!(
                f,
                "possibly stuck: actuator {id} position {position:.1} deg vs expected {expected:.1} deg (tolerance {tolerance:.1} deg)"
            ),
            Fault::Comm {
                id,
                metric,
                attempts,
                error,
            } => write!(
                f,
                "communication failure: actuator {id} {metric} unreadable after {attempts} attempt(s): {error}"
            ),
        }
    }
}

/// Everything one check learned about one actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorHealth {
    pub id: ActuatorId,
    pub comm_ok: bool,
    pub temperature_c: Option<f32>,
    pub current_ma: Option<f32>,
    /// Only set on the voltage probe.
    pub voltage_v: Option<f32>,
    pub position_deg: Option<f32>,
    /// `position - expected`, when both are known.
    pub position_delta: Option<f32>,
    pub faults: Vec<Fault>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub actuators: Vec<ActuatorHealth>,
}

impl HealthReport {
    pub fn verdict(&self) -> Verdict {
        if self.actuators.iter().all(|a| a.faults.is_empty()) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        self.actuators.iter().flat_map(|a| a.faults.iter())
    }

    pub fn get(&self, id: ActuatorId) -> Option<&ActuatorHealth> {
        self.actuators.iter().find(|a| a.id == id)
    }

    /// All faults on one line, `; `-separated.
    pub fn summary(&self) -> String {
        self.faults()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict() {
            Verdict::Pass => write!(f, "pass ({} actuators)", self.actuators.len()),
            Verdict::Fail => write!(f, "fail: {}", self.summary()),
        }
    }
}

enum Reading {
    Value(f32),
    Absent,
    Failed(Exhausted),
}

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    thresholds: HealthThresholds,
    retry: RetryPolicy,
    poll_interval: Duration,
    voltage_probe: Option<ActuatorId>,
    last_check: Option<Instant>,
    checks: u64,
    indicator_on: bool,
}

impl HealthMonitor {
    pub fn new(thresholds: HealthThresholds, retry: RetryPolicy, poll_interval: Duration) -> Self {
        Self {
            thresholds,
            retry,
            poll_interval,
            voltage_probe: None,
            last_check: None,
            checks: 0,
            indicator_on: false,
        }
    }

    /// Read bus voltage on `id` instead of the lowest calibrated id.
    pub fn with_voltage_probe(mut self, id: ActuatorId) -> Self {
        self.voltage_probe = Some(id);
        self
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start of the polling schedule; the first check is due one interval later.
    pub fn begin(&mut self, now: Instant) {
        self.last_check = Some(now);
    }

    pub fn last_check(&self) -> Option<Instant> {
        self.last_check
    }

    pub fn checks_run(&self) -> u64 {
        self.checks
    }

    /// True once at least one poll interval has passed since the last check.
    /// Always true before `begin`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_check {
            Some(last) => now.saturating_duration_since(last) >= self.poll_interval,
            None => true,
        }
    }

    /// Run a check if one is due; `last_check` moves to the check's start.
    pub fn poll(
        &mut self,
        bus: &mut dyn Actuator,
        calibration: &CalibrationTable,
        expected: &ExpectedAngles,
        clock: &dyn Clock,
    ) -> Option<HealthReport> {
        let now = clock.now();
        if !self.is_due(now) {
            return None;
        }
        self.last_check = Some(now);
        Some(self.run_check(bus, calibration, expected, clock))
    }

    /// One full pass over every calibrated actuator; toggles the heartbeat
    /// indicator when it passes.
    pub fn run_check(
        &mut self,
        bus: &mut dyn Actuator,
        calibration: &CalibrationTable,
        expected: &ExpectedAngles,
        clock: &dyn Clock,
    ) -> HealthReport {
        self.checks += 1;
        let report = self.evaluate(bus, calibration, expected, clock);
        if report.is_pass() {
            tracing::debug!(check = self.checks, "health check passed");
            self.heartbeat(bus, calibration);
        } else {
            tracing::error!(
                check = self.checks,
                faults = report.faults().count(),
                "health check failed"
            );
        }
        report
    }

    /// Read and judge every metric without side effects on the indicator or
    /// the check counter.
    pub fn evaluate(
        &self,
        bus: &mut dyn Actuator,
        calibration: &CalibrationTable,
        expected: &ExpectedAngles,
        clock: &dyn Clock,
    ) -> HealthReport {
        let probe = self.voltage_probe.or_else(|| calibration.ids().next());
        let t = self.thresholds;

        let mut actuators = Vec::with_capacity(calibration.len());
        for unit in calibration.units() {
            let id = unit.id;
            let mut h = ActuatorHealth::new(id);

            if probe == Some(id) {
                match self.read(clock, || bus.read_bus_voltage(id)) {
                    Reading::Value(mv) => {
                        let volts = mv / 1000.0;
                        h.voltage_v = Some(volts);
                        if !(t.min_voltage_v..=t.max_voltage_v).contains(&volts) {
                            h.faults.push(Fault::Power {
                                id,
                                volts,
                                min_v: t.min_voltage_v,
                                max_v: t.max_voltage_v,
                            });
                        }
                    }
                    Reading::Absent => {}
                    Reading::Failed(e) => h.comm_failure(Metric::Voltage, e),
                }
            }

            match self.read(clock, || bus.read_temperature(id)) {
                Reading::Value(c) => {
                    h.temperature_c = Some(c);
                    if c > t.max_temp_c {
                        h.faults.push(Fault::Overheat {
                            id,
                            temp_c: c,
                            max_c: t.max_temp_c,
                        });
                    }
                }
                Reading::Absent => {}
                Reading::Failed(e) => h.comm_failure(Metric::Temperature, e),
            }

            if unit.caps.current_sense {
                match self.read(clock, || bus.read_current(id)) {
                    Reading::Value(ma) => {
                        h.current_ma = Some(ma);
                        if !(t.min_current_ma..=t.max_current_ma).contains(&ma) {
                            h.faults.push(Fault::Electrical {
                                id,
                                current_ma: ma,
                                min_ma: t.min_current_ma,
                                max_ma: t.max_current_ma,
                            });
                        }
                    }
                    Reading::Absent => {}
                    Reading::Failed(e) => h.comm_failure(Metric::Current, e),
                }
            }

            if unit.caps.position_sense {
                match self.read(clock, || bus.read_position(id)) {
                    Reading::Value(pos) => {
                        h.position_deg = Some(pos);
                        if let Some(exp) = expected.get(id) {
                            let delta = pos - exp;
                            h.position_delta = Some(delta);
                            if delta.abs() > t.position_tolerance_deg {
                                h.faults.push(Fault::PossiblyStuck {
                                    id,
                                    position: pos,
                                    expected: exp,
                                    tolerance: t.position_tolerance_deg,
                                });
                            }
                        }
                    }
                    Reading::Absent => {}
                    Reading::Failed(e) => h.comm_failure(Metric::Position, e),
                }
            }

            for fault in &h.faults {
                tracing::error!(
                    actuator = %fault.actuator(),
                    metric = %fault.metric(),
                    kind = fault.kind(),
                    "{fault}"
                );
            }
            actuators.push(h);
        }

        HealthReport { actuators }
    }

    fn read<F>(&self, clock: &dyn Clock, op: F) -> Reading
    where
        F: FnMut() -> ActuatorResult<f32>,
    {
        match retry(clock, &self.retry, op) {
            Ok(v) => Reading::Value(v),
            Err(Exhausted {
                last: ActuatorError::CapabilityMissing { .. },
                ..
            }) => Reading::Absent,
            Err(e) => Reading::Failed(e),
        }
    }

    /// Flip the indicator on every actuator that has one.
    fn heartbeat(&mut self, bus: &mut dyn Actuator, calibration: &CalibrationTable) {
        self.indicator_on = !self.indicator_on;
        for unit in calibration.units().filter(|u| u.caps.indicator) {
            match bus.set_indicator(unit.id, self.indicator_on) {
                Ok(()) | Err(ActuatorError::CapabilityMissing { .. }) => {}
                Err(e) => tracing::debug!(actuator = %unit.id, error = %e, "heartbeat skipped"),
            }
        }
    }
}

impl ActuatorHealth {
    pub fn new(id: ActuatorId) -> Self {
        Self {
            id,
            comm_ok: true,
            temperature_c: None,
            current_ma: None,
            voltage_v: None,
            position_deg: None,
            position_delta: None,
            faults: Vec::new(),
        }
    }

    fn comm_failure(&mut self, metric: Metric, e: Exhausted) {
        self.comm_ok = false;
        self.faults.push(Fault::Comm {
            id: self.id,
            metric,
            attempts: e.attempts,
            error: e.last.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_fault_cites_the_measured_voltage() {
        let f = Fault::Power {
            id: ActuatorId(1),
            volts: 4.8,
            min_v: 5.0,
            max_v: 7.5,
        };
        let s = f.to_string();
        assert!(s.contains("4.80 V"), "{s}");
        assert!(s.contains("5.00 V"), "{s}");
        assert_eq!(f.metric(), Metric::Voltage);
    }

    #[test]
    fn verdict_fails_on_any_fault() {
        let ok = ActuatorHealth::new(ActuatorId(1));
        let mut bad = ActuatorHealth::new(ActuatorId(2));
        bad.faults.push(Fault::Overheat {
            id: ActuatorId(2),
            temp_c: 75.0,
            max_c: 70.0,
        });
        let pass = HealthReport {
            actuators: vec![ok.clone()],
        };
        let fail = HealthReport {
            actuators: vec![ok, bad],
        };
        assert_eq!(pass.verdict(), Verdict::Pass);
        assert_eq!(fail.verdict(), Verdict::Fail);
        assert!(fail.to_string().contains("actuator #2 temperature 75.0 C"));
    }

    #[test]
    fn due_only_after_a_full_interval() {
        let m = HealthMonitor::new(
            HealthThresholds::default(),
            RetryPolicy::default(),
            Duration::from_secs(10),
        );
        let t0 = Instant::now();
        assert!(m.is_due(t0));
        let mut m = m;
        m.begin(t0);
        assert!(!m.is_due(t0 + Duration::from_millis(9_999)));
        assert!(m.is_due(t0 + Duration::from_secs(10)));
    }
}
