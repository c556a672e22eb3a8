//! `From` implementations bridging `trot_config` types to `trot_core` types.

use std::time::Duration;

use trot_traits::ActuatorId;

use crate::calibration::{ActuatorUnit, CalibrationTable};
use crate::config::{
    GaitTiming, HealthThresholds, HomingCfg, PoseParams, RetryPolicy, RuntimeBudget, ShutdownCfg,
};
use crate::error::BuildError;
use crate::legs::{LegAssembly, LegPose, LegPosition, LegSet, NeutralPoses};

impl From<&trot_config::PoseCfg> for PoseParams {
    fn from(c: &trot_config::PoseCfg) -> Self {
        Self {
            hip_swing: c.hip_swing,
            knee_lift: c.knee_lift,
            knee_down: c.knee_down,
            support_fraction: c.support_fraction,
            forward_lean: c.forward_lean,
        }
    }
}

impl From<&trot_config::PoseCfg> for NeutralPoses {
    fn from(c: &trot_config::PoseCfg) -> Self {
        Self {
            canonical: LegPose::new(c.hip_neutral, c.knee_neutral),
            mirrored: LegPose::new(c.hip_neutral_mirror, c.knee_neutral_mirror),
        }
    }
}

impl From<&trot_config::GaitCfg> for GaitTiming {
    fn from(c: &trot_config::GaitCfg) -> Self {
        Self {
            step: Duration::from_millis(c.step_ms),
            settle: Duration::from_millis(c.settle_ms),
            move_duration: c.move_ms.map(Duration::from_millis),
        }
    }
}

impl From<&trot_config::HealthCfg> for HealthThresholds {
    fn from(c: &trot_config::HealthCfg) -> Self {
        Self {
            max_temp_c: c.max_temp_c,
            min_voltage_v: c.min_voltage_v,
            max_voltage_v: c.max_voltage_v,
            min_current_ma: c.min_current_ma,
            max_current_ma: c.max_current_ma,
            position_tolerance_deg: c.position_tolerance_deg,
        }
    }
}

impl From<&trot_config::HealthCfg> for RetryPolicy {
    fn from(c: &trot_config::HealthCfg) -> Self {
        Self {
            attempts: c.read_attempts,
            delay: Duration::from_millis(c.retry_delay_ms),
        }
    }
}

impl From<&trot_config::Config> for RuntimeBudget {
    fn from(c: &trot_config::Config) -> Self {
        Self {
            max_runtime: Duration::from_millis(c.safety.max_runtime_ms),
            poll_interval: Duration::from_millis(c.health.poll_interval_ms),
        }
    }
}

impl From<&trot_config::ShutdownCfg> for ShutdownCfg {
    fn from(c: &trot_config::ShutdownCfg) -> Self {
        Self {
            move_duration: Duration::from_millis(c.move_ms),
            settle_margin: Duration::from_millis(c.settle_margin_ms),
        }
    }
}

impl From<&trot_config::HomingCfg> for HomingCfg {
    fn from(c: &trot_config::HomingCfg) -> Self {
        Self {
            home_deg: c.home_deg,
            move_duration: Duration::from_millis(c.move_ms),
            settle_margin: Duration::from_millis(c.settle_margin_ms),
            tolerance_deg: c.tolerance_deg,
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

/// One unit per `[[actuators]]` entry, with the global limits unless
/// overridden per actuator.
pub fn calibration_from_config(c: &trot_config::Config) -> Result<CalibrationTable, BuildError> {
    let units = c.actuators.iter().map(|a| {
        let (min, max) = c
            .limits_for(a.id)
            .unwrap_or((c.limits.min_deg, c.limits.max_deg));
        ActuatorUnit::new(a.id, a.offset_deg, min, max)
    });
    CalibrationTable::new(units)
}

pub fn legs_from_config(c: &trot_config::Config) -> Result<LegSet, BuildError> {
    let neutrals = NeutralPoses::from(&c.pose);
    let leg = |position, cfg: &trot_config::LegCfg| {
        LegAssembly::new(position, cfg.hip, cfg.knee, cfg.mirrored, &neutrals)
    };
    LegSet::new([
        leg(LegPosition::FrontLeft, &c.legs.front_left),
        leg(LegPosition::FrontRight, &c.legs.front_right),
        leg(LegPosition::BackRight, &c.legs.back_right),
        leg(LegPosition::BackLeft, &c.legs.back_left),
    ])
    .ok_or(BuildError::InvalidConfig("every leg position must appear once"))
}

pub fn voltage_probe_from_config(c: &trot_config::Config) -> Option<ActuatorId> {
    c.voltage_probe().map(ActuatorId)
}
