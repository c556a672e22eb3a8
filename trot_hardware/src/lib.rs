//! Actuator bus implementations.
//!
//! Only the simulated bus ships here; it backs the CLI when no servo hardware
//! is attached and every test in the workspace.

pub mod error;
pub mod faults;
pub mod sim;

pub use error::SimError;
pub use faults::FaultPlan;
pub use sim::{BusCall, SimServo, SimulatedBus};
