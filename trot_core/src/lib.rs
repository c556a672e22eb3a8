#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core trot logic (hardware-agnostic).
//!
//! All hardware interaction goes through `trot_traits::Actuator`; all waiting
//! goes through `trot_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Pose mapping**: semantic angle -> calibrated, clamped command (`pose`)
//! - **Gait**: diagonal trot state machine and per-leg pose formula (`gait`, `legs`)
//! - **Health**: polled telemetry with bounded retries (`health`, `util`)
//! - **Shutdown**: park, diagnose, release torque (`shutdown`)
//! - **Session**: builder, run loops, homing (`builder`, `session`, `runner`, `homing`)
//!
//! ## Example
//!
//! ```ignore
//! let summary = TrotSession::builder()
//!     .with_bus(bus)
//!     .with_calibration(table)
//!     .with_cancel_check(move || stop.load(Ordering::Relaxed))
//!     .build()?
//!     .run();
//! ```

pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod gait;
pub mod health;
pub mod homing;
pub mod hw_error;
pub mod legs;
pub mod pose;
pub mod runner;
pub mod session;
pub mod shutdown;
pub mod status;
pub mod util;

pub use builder::{Missing, SessionBuilder, Set};
pub use calibration::{ActuatorUnit, CalibrationTable};
pub use config::{
    GaitTiming, HealthThresholds, HomingCfg, PoseParams, RetryPolicy, RuntimeBudget, ShutdownCfg,
};
pub use error::{BuildError, Report, Result, TrotError};
pub use gait::{GaitPhase, GaitSequencer, GaitState, HalfCycle};
pub use health::{ActuatorHealth, Fault, HealthMonitor, HealthReport, Metric, Verdict};
pub use homing::{HomedJoint, HomingReport};
pub use legs::{LegAssembly, LegPose, LegPosition, LegRole, LegSet, NeutralPoses};
pub use pose::{ExpectedAngles, PoseMapper};
pub use session::TrotSession;
pub use shutdown::{ShutdownController, ShutdownOutcome};
pub use status::{ExitReason, SessionSummary};
