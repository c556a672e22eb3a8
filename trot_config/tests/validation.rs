use rstest::rstest;
use trot_config::load_toml;

fn reject(toml: &str, needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("config should be rejected");
    let msg = format!("{err}").to_lowercase();
    assert!(msg.contains(needle), "expected '{needle}' in '{msg}'");
}

#[rstest]
#[case("[gait]\nstep_ms = 0\n", "gait.step_ms must be > 0")]
#[case("[health]\npoll_interval_ms = 0\n", "poll_interval_ms must be >= 1")]
#[case("[health]\nread_attempts = 0\n", "read_attempts must be >= 1")]
#[case(
    "[health]\nmin_voltage_v = 7.5\nmax_voltage_v = 5.0\n",
    "min_voltage_v < max_voltage_v"
)]
#[case("[safety]\nmax_runtime_ms = 0\n", "max_runtime_ms must be >= 1")]
#[case("[limits]\nmin_deg = 200.0\nmax_deg = 40.0\n", "min_deg < max_deg")]
#[case("[pose]\nsupport_fraction = 1.5\n", "support_fraction")]
#[case("[bus]\nvoltage_probe = 99\n", "voltage_probe references unknown actuator 99")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    reject(toml, needle);
}

#[test]
fn rejects_duplicate_actuator_ids() {
    reject(
        r#"
[[actuators]]
id = 1

[[actuators]]
id = 1
"#,
        "listed more than once",
    );
}

#[test]
fn rejects_leg_referencing_missing_actuator() {
    // Only two actuators exist, but the default legs reference 1..=8.
    reject(
        r#"
[[actuators]]
id = 1

[[actuators]]
id = 2
"#,
        "references unknown actuator 3",
    );
}

#[test]
fn rejects_actuator_shared_by_two_joints() {
    reject(
        r#"
[legs.front_left]
hip = 1
knee = 1
"#,
        "used by more than one joint",
    );
}

#[test]
fn accepts_full_robot_description() {
    let toml = r#"
[bus]
port = "/dev/ttyUSB0"
voltage_probe = 1

[limits]
min_deg = 40.0
max_deg = 200.0

[[actuators]]
id = 1
[[actuators]]
id = 2
[[actuators]]
id = 3
offset_deg = 10.0
[[actuators]]
id = 4
offset_deg = 15.0

[legs.front_left]
hip = 1
knee = 2
mirrored = true
[legs.front_right]
hip = 3
knee = 4
[legs.back_right]
hip = 3
knee = 4
"#;
    // back legs reuse the front right servos: must fail
    let cfg = load_toml(toml).expect("parse TOML");
    assert!(cfg.validate().is_err());

    let toml = r#"
[gait]
step_ms = 600
settle_ms = 250

[health]
poll_interval_ms = 5000
max_temp_c = 65.0
min_voltage_v = 6.0
max_voltage_v = 8.4

[safety]
max_runtime_ms = 60000

[logging]
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.gait.step_ms, 600);
    assert_eq!(cfg.health.max_temp_c, 65.0);
}
