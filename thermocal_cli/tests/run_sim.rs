//! End-to-end runs of the simulated bench.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

fn write_config(dir: &TempDir, record_file: &str) -> PathBuf {
    let toml = format!(
        r#"
[sampling]
buffer_sizes = [3, 5]
std_dev_sample_size = 4
data_interval_ms = 100

[probe]
conversion_ms = 20

[record]
end_temp_f = 40.0
end_temp_time_ms = 150
file = "{record_file}"
"#
    );
    let path = dir.path().join("thermocal.toml");
    fs::write(&path, toml).unwrap();
    path
}

/// `run` on the sim backend with stdin ignored and a safety timeout.
fn run_cmd(dir: &TempDir, record_file: &str) -> Command {
    let cfg = write_config(dir, record_file);
    let mut cmd = Command::cargo_bin("thermocal_cli").unwrap();
    cmd.current_dir(dir.path())
        .args(["--log-level", "error", "--config"])
        .arg(cfg)
        .args(["run", "--no-stdin", "--adc-noise", "0"]);
    cmd
}

#[test]
fn record_session_writes_rows_until_timeout() {
    let dir = tempdir().unwrap();
    run_cmd(&dir, "run.csv")
        .args(["--clicks", "4", "--max-runtime-ms", "700"])
        .args(["--bath-start-f", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RECORD_DATA"))
        .stdout(predicate::str::contains("EndTemp: 40.00   count: "))
        .stdout(predicate::str::contains("stopped (timeout)"));

    let text = fs::read_to_string(dir.path().join("run.csv")).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("\"Data Set: ADC Reading\",\"Data Set: Temp F\"")
    );
    let rows: Vec<&str> = lines.collect();
    assert!(rows.len() >= 2, "rows: {rows:?}");
    // The first row may carry the probe's power-on value if the conversion
    // straddled a millisecond tick.
    for row in &rows[1..] {
        let (raw, temp) = row.split_once(',').unwrap();
        let raw: i32 = raw.parse().unwrap();
        let temp: f64 = temp.parse().unwrap();
        assert!((0..=4095).contains(&raw));
        assert!((80.0..=91.0).contains(&temp), "{temp}");
    }
}

#[test]
fn cold_bath_completes_the_session() {
    let dir = tempdir().unwrap();
    run_cmd(&dir, "run.csv")
        .args(["--clicks", "4", "--until-done", "--max-runtime-ms", "5000"])
        .args(["--bath-start-f", "30", "--bath-ambient-f", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Data Collection Completed!!!"))
        .stdout(predicate::str::contains("stopped (session_ended)"))
        .stdout(predicate::str::contains("final mode STANDBY_MODE"));
}

#[test]
fn disconnected_probe_aborts_test_mode_with_exit_code() {
    let dir = tempdir().unwrap();
    run_cmd(&dir, "run.csv")
        .args(["--clicks", "3", "--until-done", "--max-runtime-ms", "5000"])
        .arg("--disconnected-probe")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Unable to find address for Device 0"))
        .stdout(predicate::str::contains(
            "Error: Could not read temp data from 1-wire sensor!",
        ))
        .stderr(predicate::str::contains("reference probe"));
}

#[test]
fn unwritable_record_file_aborts_with_storage_code() {
    let dir = tempdir().unwrap();
    run_cmd(&dir, "no_such_dir/run.csv")
        .args(["--clicks", "4", "--until-done", "--max-runtime-ms", "5000"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("Error opening .csv file"))
        .stderr(predicate::str::contains("record file could not be opened"));
}

#[test]
fn json_mode_emits_one_object_per_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "run.csv");
    let out = Command::cargo_bin("thermocal_cli")
        .unwrap()
        .current_dir(dir.path())
        .args(["--json", "--log-level", "error", "--config"])
        .arg(cfg)
        .args(["run", "--no-stdin", "--clicks", "1", "--max-runtime-ms", "300"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let values: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(
        values
            .iter()
            .any(|v| v["line"].as_str().is_some_and(|s| s.starts_with("SAMPLE_SIZE: 3")))
    );
    let summary = values.last().unwrap();
    assert_eq!(summary["stop"], "timeout");
    assert_eq!(summary["final_mode"], "SAMPLE_SIZE");
    assert_eq!(summary["mode_changes"], 1);
}
