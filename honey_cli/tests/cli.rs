use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

const BASE: &str = r#"
[pins]
# pins are unused by the simulated bench but must be present
hx711_dt = 5
hx711_sck = 6
servo_pwm = 18

[dosing]
target_amount_g = 40.0

[hardware]
sensor_read_timeout_ms = 100
"#;

fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("honey.toml");
    fs::write(&path, format!("{BASE}\n{extra}")).unwrap();
    path
}

fn write_script(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("script.txt");
    fs::write(&path, body).unwrap();
    path
}

fn honey(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("honey").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], "Usage:")]
#[case(&["run", "--help"], "set <name> <value>")]
fn help_is_printed(#[case] args: &[&str], #[case] needle: &str) {
    Command::cargo_bin("honey")
        .unwrap()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn self_check_passes_on_the_simulated_bench() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    honey(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[test]
fn self_check_json() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = honey(&cfg)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&out.stdout).trim()).unwrap();
    assert_eq!(v["type"], "self_check");
    assert_eq!(v["status"], "ok");
    assert!(v["raw"].is_i64());
}

#[rstest]
#[case("[control]\nperiod_ms = 0\n", "control.period_ms")]
#[case("[dosing]\nactuator_max = 0.0\n", "must differ")]
#[case("[persistence]\nflush_quiet_ms = 0\n", "flush_quiet_ms")]
fn invalid_config_exits_with_config_code(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        format!("[pins]\nhx711_dt = 5\nhx711_sck = 6\nservo_pwm = 18\n{body}"),
    )
    .unwrap();
    honey(&path)
        .arg("self-check")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    honey(&dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("How to fix"));
}

#[test]
fn missing_config_file_json_error() {
    let dir = tempdir().unwrap();
    let out = honey(&dir.path().join("nope.toml"))
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"type\":\"error\""))
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 5);
}

#[test]
fn scripted_dose_completes() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[calibration]\ncal_factor = 420.0\n");
    let script = write_script(
        &dir,
        "# empty scale first\ntare\nwait 200\nplace\nstart\nwait 7000\nquit\n",
    );
    honey(&cfg)
        .arg("run")
        .arg("--script")
        .arg(&script)
        .arg("--max-runtime-ms")
        .arg("12000")
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("dose #1 complete"))
        .stdout(predicate::str::contains("loop:"));
}

#[test]
fn start_without_calibration_is_ignored() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let script = write_script(&dir, "tare\nwait 100\nplace\nstart\nwait 1500\nquit\n");
    honey(&cfg)
        .arg("run")
        .arg("--script")
        .arg(&script)
        .arg("--max-runtime-ms")
        .arg("5000")
        .assert()
        .success()
        .stdout(predicate::str::contains("filling").not())
        .stdout(predicate::str::contains("dose #").not());
}

#[test]
fn json_run_emits_only_json_lines() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[calibration]\ncal_factor = 420.0\n");
    let script = write_script(&dir, "bogus command\nwait 300\nquit\n");
    let out = honey(&cfg)
        .arg("--json")
        .arg("run")
        .arg("--script")
        .arg(&script)
        .arg("--max-runtime-ms")
        .arg("3000")
        .arg("--stats")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut types = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        types.push(v["type"].as_str().unwrap().to_string());
        if v["type"] == "telemetry" {
            for key in [
                "tick",
                "dosing_state",
                "calibration_state",
                "actual_weight_g",
                "adjusted_weight_g",
                "controller_output",
                "valve_position",
                "completed",
                "total_dispensed_g",
            ] {
                assert!(v.get(key).is_some(), "missing {key}");
            }
        }
    }
    assert!(types.iter().any(|t| t == "telemetry"));
    assert_eq!(types.last().map(String::as_str), Some("loop_stats"));
}

#[test]
fn settings_survive_a_restart() {
    let dir = tempdir().unwrap();
    let saved = dir.path().join("saved.toml");
    let cfg = write_config(
        &dir,
        &format!(
            "[persistence]\nsettings_file = {:?}\n\n[calibration]\ncal_factor = 420.0\n",
            saved.display().to_string()
        ),
    );
    let script = write_script(&dir, "set target 120\nset viscosity high\nwait 200\nquit\n");
    honey(&cfg)
        .arg("run")
        .arg("--script")
        .arg(&script)
        .arg("--max-runtime-ms")
        .arg("3000")
        .assert()
        .success();

    let text = fs::read_to_string(&saved).unwrap();
    assert!(text.contains("target_amount_g = 120"), "{text}");
    assert!(text.contains("viscosity = \"high\""), "{text}");
    assert!(text.contains("cal_factor = 420"), "{text}");
}
