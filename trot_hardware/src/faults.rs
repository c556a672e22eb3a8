//! Fault plans for the simulated bus, read from `TROT_SIM_*` variables.
//!
//! | variable                | value               | effect                              |
//! |-------------------------|---------------------|-------------------------------------|
//! | `TROT_SIM_SUPPLY_MV`    | `4800`              | supply voltage seen by every servo  |
//! | `TROT_SIM_OVERHEAT`     | `3:75,4:80`         | servo temperature in C              |
//! | `TROT_SIM_CURRENT`      | `5:4200`            | servo current draw in mA            |
//! | `TROT_SIM_STUCK`        | `2,6`               | servos ignore moves                 |
//! | `TROT_SIM_TIMEOUT`      | `7`                 | servos never reply                  |
//! | `TROT_SIM_BASIC_SERVOS` | `1`                 | no optional capabilities            |

use trot_traits::Capabilities;

use crate::error::{Result, SimError};
use crate::sim::SimulatedBus;

pub const PREFIX: &str = "TROT_SIM_";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultPlan {
    pub supply_mv: Option<f32>,
    pub temperatures: Vec<(u8, f32)>,
    pub currents: Vec<(u8, f32)>,
    pub stuck: Vec<u8>,
    pub timeouts: Vec<u8>,
    pub basic_servos: bool,
}

fn bad(var: &str, value: &str, reason: &'static str) -> SimError {
    SimError::InvalidFaultSpec {
        var: var.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn ids(var: &str, value: &str) -> Result<Vec<u8>> {
    value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u8>()
                .map_err(|_| bad(var, value, "expected comma-separated servo ids"))
        })
        .collect()
}

fn pairs(var: &str, value: &str) -> Result<Vec<(u8, f32)>> {
    value
        .split(',')
        .map(|item| {
            let (id, v) = item
                .split_once(':')
                .ok_or_else(|| bad(var, value, "expected id:value pairs"))?;
            let id = id
                .trim()
                .parse::<u8>()
                .map_err(|_| bad(var, value, "servo id must be an integer"))?;
            let v = v
                .trim()
                .parse::<f32>()
                .map_err(|_| bad(var, value, "value must be a number"))?;
            Ok((id, v))
        })
        .collect()
}

impl FaultPlan {
    /// Collect every `TROT_SIM_*` variable from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().filter(|(k, _)| k.starts_with(PREFIX)))
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut plan = Self::default();
        for (k, v) in vars {
            let (var, value) = (k.as_ref(), v.as_ref());
            match var.strip_prefix(PREFIX) {
                Some("SUPPLY_MV") => {
                    plan.supply_mv = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| bad(var, value, "expected millivolts"))?,
                    );
                }
                Some("OVERHEAT") => plan.temperatures = pairs(var, value)?,
                Some("CURRENT") => plan.currents = pairs(var, value)?,
                Some("STUCK") => plan.stuck = ids(var, value)?,
                Some("TIMEOUT") => plan.timeouts = ids(var, value)?,
                Some("BASIC_SERVOS") => {
                    plan.basic_servos = matches!(value.trim(), "1" | "true" | "yes");
                }
                Some(_) => return Err(bad(var, value, "unknown fault variable")),
                None => {}
            }
        }
        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, bus: &SimulatedBus) -> Result<()> {
        if let Some(mv) = self.supply_mv {
            bus.set_supply_mv(mv);
        }
        if self.basic_servos {
            bus.set_all_capabilities(Capabilities::default());
        }
        for &(id, c) in &self.temperatures {
            bus.set_temperature(id, c)?;
        }
        for &(id, ma) in &self.currents {
            bus.set_current(id, ma)?;
        }
        for &id in &self.stuck {
            bus.set_stuck(id, true)?;
        }
        for &id in &self.timeouts {
            bus.fail_always(id, true)?;
        }
        if !self.is_empty() {
            tracing::warn!(plan = ?self, "simulated bus fault plan active");
        }
        Ok(())
    }
}
