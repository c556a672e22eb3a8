//! In-memory servo bus.
//!
//! Servos reach their commanded angle as soon as the move is accepted. Clones
//! share the same state, so a test can keep a handle for fault injection and
//! inspection after the bus itself has been moved into a session.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use trot_traits::{
    Actuator, ActuatorError, ActuatorId, ActuatorResult, Capabilities, ReleaseMechanism,
};

use crate::error::{Result, SimError};

/// Every request the bus received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BusCall {
    Move {
        id: ActuatorId,
        angle: f32,
        duration: Duration,
    },
    SetLimits {
        id: ActuatorId,
        min: f32,
        max: f32,
    },
    ReadTemperature(ActuatorId),
    ReadVoltage(ActuatorId),
    ReadCurrent(ActuatorId),
    ReadPosition(ActuatorId),
    Indicator {
        id: ActuatorId,
        on: bool,
    },
    Release {
        id: ActuatorId,
        mechanism: ReleaseMechanism,
    },
}

impl BusCall {
    pub fn id(&self) -> ActuatorId {
        match self {
            BusCall::Move { id, .. }
            | BusCall::SetLimits { id, .. }
            | BusCall::Indicator { id, .. }
            | BusCall::Release { id, .. } => *id,
            BusCall::ReadTemperature(id)
            | BusCall::ReadVoltage(id)
            | BusCall::ReadCurrent(id)
            | BusCall::ReadPosition(id) => *id,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, BusCall::Move { .. })
    }
}

/// Snapshot of one simulated servo.
#[derive(Debug, Clone, PartialEq)]
pub struct SimServo {
    pub angle: f32,
    pub min_deg: f32,
    pub max_deg: f32,
    pub temperature_c: f32,
    pub current_ma: f32,
    pub torque_enabled: bool,
    pub indicator: bool,
    pub caps: Capabilities,
    /// Accepts moves but never leaves its angle.
    pub stuck: bool,
    /// Next calls that time out.
    pub pending_timeouts: u32,
    pub always_timeout: bool,
}

impl Default for SimServo {
    fn default() -> Self {
        Self {
            angle: 120.0,
            min_deg: 0.0,
            max_deg: 240.0,
            temperature_c: 35.0,
            current_ma: 150.0,
            torque_enabled: false,
            indicator: false,
            caps: Capabilities::FULL,
            stuck: false,
            pending_timeouts: 0,
            always_timeout: false,
        }
    }
}

#[derive(Debug)]
struct SimState {
    servos: BTreeMap<ActuatorId, SimServo>,
    supply_mv: f32,
    release_support: Vec<ReleaseMechanism>,
    calls: Vec<BusCall>,
}

#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedBus {
    pub fn new(ids: impl IntoIterator<Item = u8>) -> Self {
        let servos = ids
            .into_iter()
            .map(|id| (ActuatorId(id), SimServo::default()))
            .collect();
        Self {
            state: Rc::new(RefCell::new(SimState {
                servos,
                supply_mv: 7400.0,
                release_support: ReleaseMechanism::ORDERED.to_vec(),
                calls: Vec::new(),
            })),
        }
    }

    /// Eight servos, ids 1..=8, healthy, on a 7.4 V supply.
    pub fn reference() -> Self {
        Self::new(1..=8)
    }

    fn with_servo<T>(&self, id: u8, f: impl FnOnce(&mut SimServo) -> T) -> Result<T> {
        let mut st = self.state.borrow_mut();
        st.servos
            .get_mut(&ActuatorId(id))
            .map(f)
            .ok_or(SimError::UnknownServo(id))
    }

    // ── Fault injection ─────────────────────────────────────────────────────

    pub fn set_supply_mv(&self, mv: f32) {
        self.state.borrow_mut().supply_mv = mv;
    }

    pub fn set_temperature(&self, id: u8, celsius: f32) -> Result<()> {
        self.with_servo(id, |s| s.temperature_c = celsius)
    }

    pub fn set_current(&self, id: u8, ma: f32) -> Result<()> {
        self.with_servo(id, |s| s.current_ma = ma)
    }

    pub fn set_capabilities(&self, id: u8, caps: Capabilities) -> Result<()> {
        self.with_servo(id, |s| s.caps = caps)
    }

    pub fn set_all_capabilities(&self, caps: Capabilities) {
        for s in self.state.borrow_mut().servos.values_mut() {
            s.caps = caps;
        }
    }

    pub fn set_stuck(&self, id: u8, stuck: bool) -> Result<()> {
        self.with_servo(id, |s| s.stuck = stuck)
    }

    /// The next `n` calls addressed to `id` time out.
    pub fn fail_next(&self, id: u8, n: u32) -> Result<()> {
        self.with_servo(id, |s| s.pending_timeouts = n)
    }

    pub fn fail_always(&self, id: u8, on: bool) -> Result<()> {
        self.with_servo(id, |s| s.always_timeout = on)
    }

    /// Release mechanisms the servos understand (default: all of them).
    pub fn set_release_support(&self, mechanisms: &[ReleaseMechanism]) {
        self.state.borrow_mut().release_support = mechanisms.to_vec();
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<BusCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn servo(&self, id: u8) -> Option<SimServo> {
        self.state.borrow().servos.get(&ActuatorId(id)).cloned()
    }

    pub fn servos(&self) -> Vec<(ActuatorId, SimServo)> {
        self.state
            .borrow()
            .servos
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub fn angle(&self, id: u8) -> Option<f32> {
        self.servo(id).map(|s| s.angle)
    }

    pub fn torque_enabled(&self, id: u8) -> Option<bool> {
        self.servo(id).map(|s| s.torque_enabled)
    }

    pub fn indicator(&self, id: u8) -> Option<bool> {
        self.servo(id).map(|s| s.indicator)
    }

    /// Log `call`, then run `f` against the addressed servo unless it times out.
    fn exchange<T>(
        &mut self,
        call: BusCall,
        f: impl FnOnce(&mut SimServo, &SimState) -> ActuatorResult<T>,
    ) -> ActuatorResult<T> {
        let id = call.id();
        tracing::trace!(?call, "sim bus");
        let mut st = self.state.borrow_mut();
        st.calls.push(call);
        let Some(mut servo) = st.servos.remove(&id) else {
            return Err(ActuatorError::CommTimeout { id });
        };
        let result = if servo.always_timeout {
            Err(ActuatorError::CommTimeout { id })
        } else if servo.pending_timeouts > 0 {
            servo.pending_timeouts -= 1;
            Err(ActuatorError::CommTimeout { id })
        } else {
            f(&mut servo, &*st)
        };
        st.servos.insert(id, servo);
        result
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::reference()
    }
}

impl Actuator for SimulatedBus {
    fn capabilities(&mut self, id: ActuatorId) -> Capabilities {
        self.servo(id.get()).map(|s| s.caps).unwrap_or_default()
    }

    fn move_to(
        &mut self,
        id: ActuatorId,
        angle_deg: f32,
        duration: Duration,
    ) -> ActuatorResult<()> {
        let call = BusCall::Move {
            id,
            angle: angle_deg,
            duration,
        };
        self.exchange(call, |s, _| {
            s.torque_enabled = true;
            if !s.stuck {
                s.angle = angle_deg.clamp(s.min_deg, s.max_deg);
            }
            Ok(())
        })
    }

    fn set_angle_limits(
        &mut self,
        id: ActuatorId,
        min_deg: f32,
        max_deg: f32,
    ) -> ActuatorResult<()> {
        let call = BusCall::SetLimits {
            id,
            min: min_deg,
            max: max_deg,
        };
        self.exchange(call, |s, _| {
            if min_deg >= max_deg {
                return Err(ActuatorError::Bus {
                    id,
                    message: format!("rejected limits [{min_deg}, {max_deg}]"),
                });
            }
            s.min_deg = min_deg;
            s.max_deg = max_deg;
            Ok(())
        })
    }

    fn read_temperature(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        self.exchange(BusCall::ReadTemperature(id), |s, _| Ok(s.temperature_c))
    }

    fn read_bus_voltage(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        self.exchange(BusCall::ReadVoltage(id), |_, st| Ok(st.supply_mv))
    }

    fn read_current(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        self.exchange(BusCall::ReadCurrent(id), |s, _| {
            if s.caps.current_sense {
                Ok(s.current_ma)
            } else {
                Err(ActuatorError::CapabilityMissing {
                    id,
                    capability: "current sensing",
                })
            }
        })
    }

    fn read_position(&mut self, id: ActuatorId) -> ActuatorResult<f32> {
        self.exchange(BusCall::ReadPosition(id), |s, _| Ok(s.angle))
    }

    fn set_indicator(&mut self, id: ActuatorId, on: bool) -> ActuatorResult<()> {
        self.exchange(BusCall::Indicator { id, on }, |s, _| {
            if s.caps.indicator {
                s.indicator = on;
                Ok(())
            } else {
                Err(ActuatorError::CapabilityMissing {
                    id,
                    capability: "indicator",
                })
            }
        })
    }

    fn release_torque(
        &mut self,
        id: ActuatorId,
        mechanism: ReleaseMechanism,
    ) -> ActuatorResult<()> {
        self.exchange(BusCall::Release { id, mechanism }, |s, st| {
            if s.caps.torque_release && st.release_support.contains(&mechanism) {
                s.torque_enabled = false;
                Ok(())
            } else {
                Err(ActuatorError::CapabilityMissing {
                    id,
                    capability: mechanism.name(),
                })
            }
        })
    }
}
