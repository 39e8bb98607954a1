use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[control]
tolerance_ticks = 20.0
debounce_ms = 100
loop_period_ms = 5

[safety]
max_run_ms = 5000
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn record_line(stdout: &str) -> serde_json::Value {
    let line = stdout
        .lines()
        .find(|l| l.contains("\"final_position\""))
        .unwrap_or("")
        .to_string();
    assert!(
        !line.is_empty(),
        "no JSONL line with final_position found; stdout was: {stdout}"
    );
    serde_json::from_str(&line).expect("valid JSON")
}

/// Validate the JSONL schema for a successful move.
#[rstest]
fn jsonl_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("autodrive").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("drive")
        .arg("--ticks")
        .arg("250")
        .env_remove("AUTODRIVE_TEST_SIM_STALL");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = record_line(&String::from_utf8_lossy(&out));

    assert!(v.get("timestamp").and_then(|x| x.as_i64()).is_some());
    assert_eq!(v.get("target_ticks").and_then(|x| x.as_f64()), Some(250.0));
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert_eq!(v.get("mode").and_then(|x| x.as_str()), Some("drift-and-slew"));

    let pos = v
        .get("final_position")
        .and_then(|x| x.as_f64())
        .expect("final_position is a number on success");
    assert!((pos - 250.0).abs() <= 20.0, "final_position {pos}");
    assert!(v.get("cycles").and_then(|x| x.as_u64()).unwrap_or(0) > 0);
    assert!(v.get("final_drift").and_then(|x| x.as_f64()).is_some());

    // Abort reason must be null on success
    assert!(v.get("abort_reason").is_some_and(serde_json::Value::is_null));
}

/// Validate the JSONL schema for an aborted move (timeout) plus the error object.
#[rstest]
fn jsonl_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("autodrive").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("drive")
        .arg("--ticks")
        .arg("1000")
        .arg("--max-run-ms")
        .arg("50")
        .env("AUTODRIVE_TEST_SIM_STALL", "1");

    let out = cmd.assert().code(4).get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let v = record_line(&stdout);

    assert_eq!(v.get("abort_reason").and_then(|x| x.as_str()), Some("Timeout"));
    assert!(v.get("final_position").unwrap().is_null());

    let err_line = stdout
        .lines()
        .find(|l| l.contains("\"reason\""))
        .expect("error object line");
    let e: serde_json::Value = serde_json::from_str(err_line).expect("valid JSON");
    assert_eq!(e["reason"], "Timeout");
    assert_eq!(e["details"]["max_run_ms"], 50);
    assert!(e["message"].as_str().is_some_and(|m| m.contains("What happened")));
}
