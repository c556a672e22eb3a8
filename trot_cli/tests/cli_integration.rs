use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Reference robot with every wait shrunk to a few milliseconds.
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[gait]
step_ms = 8
settle_ms = 5

[health]
# long enough that a plain walk never polls
poll_interval_ms = 60000
retry_delay_ms = 1

[safety]
max_runtime_ms = 60

[shutdown]
move_ms = 5
settle_margin_ms = 5

[homing]
move_ms = 5
settle_margin_ms = 5
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn trot(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("trot").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK: config valid, 8 actuators", "stdout")]
#[case(&["walk"], 0, "runtime budget reached", "stdout")]
#[case(&["walk", "--max-runtime-ms", "30"], 0, "runtime budget reached", "stdout")]
#[case(&["stand", "--hold-ms", "20"], 0, "hold complete", "stdout")]
#[case(&["health"], 0, "Health: pass (8 actuators)", "stdout")]
#[case(&["home"], 0, "Torque released.", "stdout")]
#[case(&["home", "--keep-torque"], 0, "Torque kept on.", "stdout")]
#[case(&["walk", "--max-runtime-ms", "0"], 2, "safety.max_runtime_ms", "stderr")]
#[case(&["walk", "--poll-ms", "0"], 2, "health.poll_interval_ms", "stderr")]
#[case(&["dance"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = trot(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("absent.toml");

    trot(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("read config"));
}

#[rstest]
fn leg_on_unknown_actuator_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[legs.back_left]\nhip = 7\nknee = 9\n").unwrap();

    trot(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "legs.back_left.knee references unknown actuator 9",
        ));
}

#[rstest]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let bad_csv = dir.path().join("offsets.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "id,offset").unwrap();
    writeln!(f, "3,10.0").unwrap();

    trot(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn calibration_csv_for_unconfigured_actuator_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let csv = dir.path().join("offsets.csv");
    fs::write(&csv, "id,offset_deg\n3,12.5\n42,1.0\n").unwrap();

    trot(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("actuator 42 which is not configured"));
}

#[rstest]
fn calibration_csv_offsets_reach_the_home_targets() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let csv = dir.path().join("offsets.csv");
    fs::write(&csv, "id,offset_deg\n1,7.5\n").unwrap();

    trot(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("home")
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 at 127.5 deg (target 127.5)"));
}

#[rstest]
fn file_logging_writes_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("trot.log");
    let cfg = dir.path().join("cfg.toml");
    let toml = format!(
        "[bus]\nport = \"/dev/ttyUSB0\"\n\n[logging]\nfile = {:?}\nlevel = \"info\"\nrotation = \"never\"\n",
        log.display().to_string()
    );
    fs::write(&cfg, toml).unwrap();

    trot(&cfg).arg("self-check").assert().success();

    let text = fs::read_to_string(&log).unwrap();
    let line = text
        .lines()
        .find(|l| l.contains("simulated bus"))
        .expect("bus notice in log file");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["level"], "INFO");
    assert_eq!(v["fields"]["port"], "/dev/ttyUSB0");
}
