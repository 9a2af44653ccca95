//! End-to-end tests driving the `cw` binary against a temporary database.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn cw_binary() -> String {
    env!("CARGO_BIN_EXE_cw").to_string()
}

/// Writes a config pointing at a database inside `temp`.
fn write_config(temp: &Path) -> PathBuf {
    let config_path = temp.join("config.toml");
    let db_path = temp.join("data").join("cw.db");
    std::fs::write(
        &config_path,
        format!(
            "database_path = {:?}\ntenant = \"acme\"\nuser = \"ana\"\nutc_offset = \"+00:00\"\n",
            db_path.display().to_string()
        ),
    )
    .unwrap();
    config_path
}

fn cw(temp: &Path, at: &str, args: &[&str]) -> Output {
    Command::new(cw_binary())
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env_remove("CW_TENANT")
        .env_remove("CW_USER")
        .env_remove("CW_DATABASE_PATH")
        .env_remove("CW_UTC_OFFSET")
        .arg("--config")
        .arg(write_config(temp))
        .arg("--at")
        .arg(at)
        .args(args)
        .output()
        .expect("failed to run cw")
}

/// Runs a command that must exit successfully and returns its JSON output.
fn cw_json(temp: &Path, at: &str, args: &[&str]) -> Value {
    let output = cw(temp, at, args);
    assert!(
        output.status.success(),
        "cw {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_check_in_and_out_without_timer() {
    let temp = TempDir::new().unwrap();

    let checked_in = cw_json(temp.path(), "2025-03-10T09:00:00Z", &["check-in"]);
    assert_eq!(checked_in["success"], true);
    assert_eq!(checked_in["data"]["status"], "in");

    let status = cw_json(temp.path(), "2025-03-10T17:30:00Z", &["status"]);
    assert_eq!(status["data"]["checked_in"], true);
    assert_eq!(status["data"]["is_overtime"], true);

    let checked_out = cw_json(temp.path(), "2025-03-10T18:00:00Z", &["check-out"]);
    assert_eq!(checked_out["data"]["status"], "out");
    assert_eq!(checked_out["data"]["regular_hours"], 8.0);
    assert_eq!(checked_out["data"]["overtime_hours"], 1.0);
}

#[test]
fn test_timer_sessions_drive_day_totals() {
    let temp = TempDir::new().unwrap();

    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["check-in"]);
    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["timer", "start"]);
    cw_json(temp.path(), "2025-03-10T12:00:00Z", &["timer", "stop"]);
    cw_json(temp.path(), "2025-03-10T13:00:00Z", &["timer", "resume"]);
    let ended = cw_json(temp.path(), "2025-03-10T16:00:00Z", &["timer", "end"]);

    assert_eq!(ended["data"]["total_seconds"], 6 * 3600);
    assert_eq!(ended["data"]["attendance"]["regular_hours"], 6.0);
    assert_eq!(ended["data"]["attendance"]["overtime_hours"], 0.0);

    cw_json(temp.path(), "2025-03-10T16:30:00Z", &["timer", "start"]);
    let ended = cw_json(temp.path(), "2025-03-10T19:30:00Z", &["timer", "end"]);
    assert_eq!(ended["data"]["total_seconds"], 9 * 3600);
    assert_eq!(ended["data"]["attendance"]["regular_hours"], 8.0);
    assert_eq!(ended["data"]["attendance"]["overtime_hours"], 1.0);

    let report = cw_json(
        temp.path(),
        "2025-03-10T20:00:00Z",
        &["report", "--json"],
    );
    let days = report["data"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["date"], "2025-03-10");
    assert_eq!(days[0]["total_hours"], 9.0);
}

#[test]
fn test_second_check_in_shares_the_daily_threshold() {
    let temp = TempDir::new().unwrap();

    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["check-in"]);
    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["timer", "start"]);
    cw_json(temp.path(), "2025-03-10T14:00:00Z", &["timer", "end"]);
    cw_json(temp.path(), "2025-03-10T14:00:00Z", &["check-out"]);

    cw_json(temp.path(), "2025-03-10T14:30:00Z", &["check-in"]);
    cw_json(temp.path(), "2025-03-10T14:30:00Z", &["timer", "start"]);
    let ended = cw_json(temp.path(), "2025-03-10T18:42:00Z", &["timer", "end"]);
    assert_eq!(ended["data"]["attendance"]["regular_hours"], 3.0);
    assert_eq!(ended["data"]["attendance"]["overtime_hours"], 1.2);
    assert_eq!(ended["data"]["day_hours"]["regular_hours"], 8.0);
    assert_eq!(ended["data"]["day_hours"]["overtime_hours"], 1.2);

    let output = cw(
        temp.path(),
        "2025-03-10T19:00:00Z",
        &["report", "--from", "2025-03-10"],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2025-03-10       8.00      1.20    9.20"));
}

#[test]
fn test_rejection_exits_successfully_with_message() {
    let temp = TempDir::new().unwrap();

    let output = cw(temp.path(), "2025-03-10T09:00:00Z", &["timer", "start"]);
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "no active check-in found for today");
}

#[test]
fn test_settings_change_the_split() {
    let temp = TempDir::new().unwrap();

    let set = cw_json(
        temp.path(),
        "2025-03-10T08:00:00Z",
        &["settings", "set-hours", "6"],
    );
    assert_eq!(set["data"]["standard_work_hours"], 6.0);

    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["check-in"]);
    let checked_out = cw_json(temp.path(), "2025-03-10T16:00:00Z", &["check-out"]);
    assert_eq!(checked_out["data"]["regular_hours"], 6.0);
    assert_eq!(checked_out["data"]["overtime_hours"], 1.0);
}

#[test]
fn test_report_table_output() {
    let temp = TempDir::new().unwrap();

    cw_json(temp.path(), "2025-03-10T09:00:00Z", &["check-in"]);
    cw_json(temp.path(), "2025-03-10T18:30:00Z", &["check-out"]);

    let output = cw(
        temp.path(),
        "2025-03-12T12:00:00Z",
        &["report", "--from", "2025-03-10"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("HOURS REPORT: acme/ana (2025-03-10 to 2025-03-12)"));
    assert!(stdout.contains("2025-03-10       8.00      1.50    9.50"));
    assert!(stdout.contains("Days present: 1"));
}
