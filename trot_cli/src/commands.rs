//! Command execution: bus assembly, session build, and result rendering.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use trot_core::{
    ExitReason, HealthReport, HomingReport, SessionSummary, ShutdownOutcome, TrotError,
    TrotSession,
};
use trot_hardware::{FaultPlan, SimulatedBus};

use crate::cli::{CliRuntime, LAST_RUNTIME};

pub fn exit_reason_name(r: &ExitReason) -> &'static str {
    match r {
        ExitReason::Cancelled => "Cancelled",
        ExitReason::BudgetExhausted => "BudgetExhausted",
        ExitReason::Completed => "Completed",
        ExitReason::HealthViolation(_) => "HealthViolation",
        ExitReason::Fault(_) => "Fault",
    }
}

/// Simulated bus for every configured actuator, with any `TROT_SIM_*` faults applied.
pub fn open_bus(cfg: &trot_config::Config) -> eyre::Result<SimulatedBus> {
    let bus = SimulatedBus::new(cfg.actuators.iter().map(|a| a.id));
    let plan = FaultPlan::from_env()?;
    plan.apply(&bus)?;
    if let Some(port) = &cfg.bus.port {
        tracing::info!(port = %port, "no servo driver compiled in; using the simulated bus");
    }
    Ok(bus)
}

/// Map the typed config into a ready session. Limits are pushed to the bus here.
pub fn build_session(
    cfg: &trot_config::Config,
    bus: SimulatedBus,
    cancel: Option<Arc<AtomicBool>>,
) -> eyre::Result<TrotSession> {
    let calibration = trot_core::conversions::calibration_from_config(cfg)?;
    let legs = trot_core::conversions::legs_from_config(cfg)?;

    let thresholds: trot_core::HealthThresholds = (&cfg.health).into();
    let budget: trot_core::RuntimeBudget = cfg.into();
    let _ = LAST_RUNTIME.set(CliRuntime {
        max_runtime_ms: cfg.safety.max_runtime_ms,
        poll_interval_ms: cfg.health.poll_interval_ms,
        max_temp_c: thresholds.max_temp_c,
        min_voltage_v: thresholds.min_voltage_v,
    });

    let mut builder = TrotSession::builder()
        .with_bus(bus)
        .with_calibration(calibration)
        .with_legs(legs)
        .with_pose((&cfg.pose).into())
        .with_timing((&cfg.gait).into())
        .with_thresholds(thresholds)
        .with_retry((&cfg.health).into())
        .with_budget(budget)
        .with_shutdown((&cfg.shutdown).into())
        .with_homing((&cfg.homing).into());
    if let Some(probe) = trot_core::conversions::voltage_probe_from_config(cfg) {
        builder = builder.with_voltage_probe(probe);
    }
    if let Some(flag) = cancel {
        builder = builder.with_cancel_check(move || flag.load(Ordering::Relaxed));
    }
    builder.build()
}

/// Home, then power down unless asked to keep torque. A failed pre-flight
/// check returns before anything moves; joints that miss home surface as an
/// actuator fault after the shutdown has run.
pub fn run_home(
    mut session: TrotSession,
    keep_torque: bool,
) -> eyre::Result<(HomingReport, Option<ShutdownOutcome>)> {
    let report = session.home()?;
    let outcome = (!keep_torque).then(|| session.shutdown());
    let off = report.off_home();
    if let Some(&id) = off.first() {
        let off: Vec<String> = off.iter().map(ToString::to_string).collect();
        return Err(TrotError::Hardware {
            id,
            message: format!("did not reach home (off home: {})", off.join(", ")),
        }
        .into());
    }
    Ok((report, outcome))
}

// ── Rendering ───────────────────────────────────────────────────────────────

pub fn report_json(report: &HealthReport) -> Value {
    let actuators: Vec<Value> = report
        .actuators
        .iter()
        .map(|a| {
            json!({
                "id": a.id.get(),
                "comm_ok": a.comm_ok,
                "temperature_c": a.temperature_c,
                "voltage_v": a.voltage_v,
                "current_ma": a.current_ma,
                "position_deg": a.position_deg,
                "faults": a.faults.iter().map(|f| json!({
                    "kind": f.kind(),
                    "metric": f.metric().to_string(),
                    "message": f.to_string(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "verdict": if report.is_pass() { "pass" } else { "fail" },
        "actuators": actuators,
    })
}

fn shutdown_json(outcome: &ShutdownOutcome) -> Value {
    json!({
        "neutral_failures": outcome.neutral_failures,
        "all_released": outcome.all_released(),
        "diagnostic": outcome.diagnostic.to_string(),
    })
}

pub fn summary_json(summary: &SessionSummary) -> Value {
    json!({
        "exit": exit_reason_name(&summary.exit),
        "elapsed_ms": summary.elapsed.as_millis() as u64,
        "states_advanced": summary.states_advanced,
        "health_checks": summary.health_checks,
        "shutdown": shutdown_json(&summary.shutdown),
    })
}

pub fn summary_text(summary: &SessionSummary) -> String {
    let exit = match summary.exit {
        ExitReason::Cancelled => "cancelled",
        ExitReason::BudgetExhausted => "runtime budget reached",
        ExitReason::Completed => "hold complete",
        ExitReason::HealthViolation(_) => "health violation",
        ExitReason::Fault(_) => "fault",
    };
    let released = if summary.shutdown.all_released() {
        "torque released"
    } else {
        "torque NOT released on every joint"
    };
    format!(
        "Session ended: {exit} after {} gait states, {} health checks, {:.1} s; {released}.",
        summary.states_advanced,
        summary.health_checks,
        summary.elapsed.as_secs_f32()
    )
}

pub fn homing_json(report: &HomingReport, outcome: Option<&ShutdownOutcome>) -> Value {
    json!({
        "all_home": report.all_home(),
        "preflight": report_json(&report.preflight),
        "joints": report.joints.iter().map(|j| json!({
            "id": j.id.get(),
            "target_deg": j.target,
            "position_deg": j.position,
        })).collect::<Vec<_>>(),
        "shutdown": outcome.map(shutdown_json),
    })
}

pub fn homing_text(report: &HomingReport, outcome: Option<&ShutdownOutcome>) -> String {
    let mut out = format!("Homed {} joints:", report.joints.len());
    for j in &report.joints {
        match j.position {
            Some(p) => out.push_str(&format!("\n  {} at {p:.1} deg (target {:.1})", j.id, j.target)),
            None => out.push_str(&format!("\n  {} position unknown (target {:.1})", j.id, j.target)),
        }
    }
    match outcome {
        Some(o) if o.all_released() => out.push_str("\nTorque released."),
        Some(_) => out.push_str("\nTorque NOT released on every joint."),
        None => out.push_str("\nTorque kept on."),
    }
    out
}
