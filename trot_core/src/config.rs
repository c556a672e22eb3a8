//! Runtime configuration for the trot controller.
//!
//! These are the structs the session works with. They are separate from the
//! TOML-deserialized config in `trot_config`; see `conversions.rs`.

use std::time::Duration;

/// Amplitudes of the gait, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseParams {
    /// Hip bias away from neutral for a swing leg.
    pub hip_swing: f32,
    /// How far the knee is raised while a leg is in the air.
    pub knee_lift: f32,
    /// How far the knee is pressed past neutral while in ground contact.
    pub knee_down: f32,
    /// Share of `hip_swing` a support leg uses (0.0..=1.0).
    pub support_fraction: f32,
    /// Static hip correction on the front legs: `+lean` front-left, `-lean` front-right.
    pub forward_lean: f32,
}

impl Default for PoseParams {
    fn default() -> Self {
        Self {
            hip_swing: 25.0,
            knee_lift: 20.0,
            knee_down: 10.0,
            support_fraction: 0.4,
            forward_lean: 0.0,
        }
    }
}

/// Gait cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaitTiming {
    /// One step (one half-cycle) of the trot.
    pub step: Duration,
    /// Pause after standing so the frame settles.
    pub settle: Duration,
    /// Per-move duration handed to the actuators; defaults to one phase.
    pub move_duration: Option<Duration>,
}

impl GaitTiming {
    /// One quarter of the step period.
    #[inline]
    pub fn phase(&self) -> Duration {
        self.step / 4
    }

    #[inline]
    pub fn move_duration(&self) -> Duration {
        self.move_duration.unwrap_or_else(|| self.phase())
    }

    /// A full cycle is both half-cycles, four phases each.
    #[inline]
    pub fn cycle(&self) -> Duration {
        self.phase() * 8
    }
}

impl Default for GaitTiming {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(400),
            settle: Duration::from_millis(1000),
            move_duration: None,
        }
    }
}

/// Fault thresholds evaluated on every health check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub max_temp_c: f32,
    pub min_voltage_v: f32,
    pub max_voltage_v: f32,
    pub min_current_ma: f32,
    pub max_current_ma: f32,
    /// Largest tolerated |position - expected| in degrees.
    pub position_tolerance_deg: f32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_temp_c: 70.0,
            min_voltage_v: 5.0,
            max_voltage_v: 8.4,
            min_current_ma: 0.0,
            max_current_ma: 3000.0,
            position_tolerance_deg: 5.0,
        }
    }
}

/// Bounded retry for telemetry reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one. At least 1.
    pub attempts: u8,
    /// Fixed wait between tries.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(20),
        }
    }
}

/// Session limits. Immutable once the session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeBudget {
    pub max_runtime: Duration,
    pub poll_interval: Duration,
}

impl Default for RuntimeBudget {
    fn default() -> Self {
        Self {
            max_runtime: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownCfg {
    /// Elongated move used to park the legs.
    pub move_duration: Duration,
    pub settle_margin: Duration,
}

impl ShutdownCfg {
    #[inline]
    pub fn park_wait(&self) -> Duration {
        self.move_duration.saturating_add(self.settle_margin)
    }
}

impl Default for ShutdownCfg {
    fn default() -> Self {
        Self {
            move_duration: Duration::from_millis(1500),
            settle_margin: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomingCfg {
    /// Semantic angle every actuator is sent to.
    pub home_deg: f32,
    pub move_duration: Duration,
    pub settle_margin: Duration,
    pub tolerance_deg: f32,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            home_deg: 120.0,
            move_duration: Duration::from_millis(1500),
            settle_margin: Duration::from_millis(500),
            tolerance_deg: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_is_a_quarter_step_and_cycle_eight_phases() {
        let t = GaitTiming::default();
        assert_eq!(t.phase(), Duration::from_millis(100));
        assert_eq!(t.cycle(), Duration::from_millis(800));
        assert_eq!(t.move_duration(), t.phase());

        let t = GaitTiming {
            move_duration: Some(Duration::from_millis(250)),
            ..t
        };
        assert_eq!(t.move_duration(), Duration::from_millis(250));
    }
}
