//! Human-readable error descriptions, exit codes and structured JSON errors.

use trot_core::{BuildError, TrotError};
use trot_hardware::SimError;

use crate::cli::LAST_RUNTIME;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBus => {
                "What happened: No actuator bus was provided to the controller.\nLikely causes: The servo bus failed to open or was not wired into the builder.\nHow to fix: Ensure the bus is created successfully and passed via with_bus(...).".to_string()
            }
            BuildError::MissingCalibration => {
                "What happened: No calibration table was provided.\nLikely causes: The [[actuators]] list was not mapped into the builder.\nHow to fix: Pass the table via with_calibration(...).".to_string()
            }
            BuildError::UnknownActuator(id) => format!(
                "What happened: A leg or the voltage probe references actuator {id}, which has no calibration entry.\nLikely causes: A typo in [legs.*] or [bus].voltage_probe, or a missing [[actuators]] entry.\nHow to fix: Add actuator {id} to [[actuators]] or correct the reference."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/trot_config.toml for a sample."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SimError>() {
        return format!(
            "What happened: {se}.\nLikely causes: A malformed TROT_SIM_* variable in the environment.\nHow to fix: Fix or unset the variable, then rerun."
        );
    }

    if let Some(te) = err.downcast_ref::<TrotError>() {
        return match te {
            TrotError::CommTimeout { id } => format!(
                "What happened: Actuator {id} did not reply.\nLikely causes: Loose bus cable, wrong servo id, or the servo is unpowered.\nHow to fix: Check wiring and power, confirm the id with the servo tool, then rerun `trot self-check`."
            ),
            TrotError::Hardware { id, message } => format!(
                "What happened: Actuator {id} reported a fault ({message}).\nLikely causes: Mechanical obstruction, a stalled joint, or a failing servo.\nHow to fix: Inspect the joint and its horn, run `trot health`, and replace the servo if the fault persists."
            ),
            TrotError::HealthViolation(summary) => format!(
                "What happened: Health check failed: {summary}.\nLikely causes: Overheating servos, a sagging battery, or a jammed joint.\nHow to fix: Let the servos cool, charge the battery, check the joints; thresholds live in [health]."
            ),
            TrotError::Config(msg) => {
                if msg.contains("calibration CSV must have headers") {
                    return "Invalid headers in calibration CSV. Expected 'id,offset_deg'.".to_string();
                }
                if msg.contains("could not apply angle limits") {
                    return format!(
                        "What happened: {msg}.\nLikely causes: The servo is not on the bus or did not reply.\nHow to fix: Check the bus wiring and the [[actuators]] ids, then run `trot self-check`."
                    );
                }
                format!(
                    "What happened: {msg}.\nLikely causes: Missing or out-of-range values in the TOML or calibration CSV.\nHow to fix: Edit the config file, then rerun."
                )
            }
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<SimError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<TrotError>() {
        Some(TrotError::Config(_)) => "Config",
        Some(TrotError::CommTimeout { .. }) => "CommTimeout",
        Some(TrotError::Hardware { .. }) => "Hardware",
        Some(TrotError::HealthViolation(_)) => "HealthViolation",
        None => "Error",
    }
}

/// 2 configuration, 3 health violation, 4 actuator fault, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Config" => 2,
        "HealthViolation" => 3,
        "CommTimeout" | "Hardware" => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);
    let details = match err.downcast_ref::<TrotError>() {
        Some(TrotError::HealthViolation(_)) => LAST_RUNTIME.get().map(|r| {
            json!({
                "max_temp_c": r.max_temp_c,
                "min_voltage_v": r.min_voltage_v,
                "poll_interval_ms": r.poll_interval_ms,
                "max_runtime_ms": r.max_runtime_ms,
            })
        }),
        Some(TrotError::CommTimeout { id } | TrotError::Hardware { id, .. }) => {
            Some(json!({ "actuator": id.get() }))
        }
        _ => None,
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason, "details": d, "message": msg })
    } else {
        json!({ "reason": reason, "message": msg })
    };
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trot_traits::ActuatorId;

    #[test]
    fn exit_codes_are_stable() {
        let cases: [(eyre::Report, i32); 6] = [
            (BuildError::MissingBus.into(), 2),
            (TrotError::Config("x".into()).into(), 2),
            (TrotError::HealthViolation("hot".into()).into(), 3),
            (TrotError::CommTimeout { id: ActuatorId(3) }.into(), 4),
            (
                TrotError::Hardware {
                    id: ActuatorId(2),
                    message: "stalled".into(),
                }
                .into(),
                4,
            ),
            (eyre::eyre!("boom"), 1),
        ];
        for (err, code) in cases {
            assert_eq!(exit_code_for_error(&err), code, "{err}");
        }
    }

    #[test]
    fn untyped_errors_fall_back_to_the_generic_text() {
        let err = eyre::eyre!("gait loop stalled");
        assert_eq!(reason_name(&err), "Error");
        assert_eq!(exit_code_for_error(&err), 1);
        let text = humanize(&err);
        assert!(text.starts_with("Something went wrong."), "{text}");
        assert!(text.contains("gait loop stalled"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
    }

    #[test]
    fn json_error_names_the_actuator() {
        let err: eyre::Report = TrotError::CommTimeout { id: ActuatorId(7) }.into();
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "CommTimeout");
        assert_eq!(v["details"]["actuator"], 7);
        assert!(v["message"].as_str().unwrap().contains("#7"));
    }

    #[test]
    fn csv_header_error_is_short() {
        let err: eyre::Report = TrotError::Config(
            "calibration CSV must have headers 'id,offset_deg', got: id,offset".into(),
        )
        .into();
        assert_eq!(
            humanize(&err),
            "Invalid headers in calibration CSV. Expected 'id,offset_deg'."
        );
    }
}
