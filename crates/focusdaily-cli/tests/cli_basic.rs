//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against the given data directory and return output.
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "focusdaily-cli", "--"])
        .args(args)
        .env("FOCUSDAILY_DATA_DIR", data_dir)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_get_default() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["config", "get", "durations.focus_minutes"]);
    assert_eq!(code, 0, "config get failed: {stderr}");
    assert_eq!(stdout.trim(), "90");
}

#[test]
fn test_config_set_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &["config", "set", "durations.focus_minutes", "50"],
    );
    assert_eq!(code, 0, "config set failed: {stderr}");
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "durations.focus_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_is_json() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed: {stderr}");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("config list output");
    assert!(value.get("durations").is_some());
    assert!(value.get("notifications").is_some());
}

#[test]
fn test_stats_today_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["stats", "today"]);
    assert_eq!(code, 0, "stats today failed: {stderr}");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("stats output");
    assert_eq!(value["focus_count"], 0);
    assert_eq!(value["break_count"], 0);
    assert_eq!(value["total_focus_seconds"], 0);
}

#[test]
fn test_stats_day_rejects_bad_date() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["stats", "day", "not-a-date"]);
    assert_ne!(code, 0);
}

#[test]
fn test_session_list_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["session", "list"]);
    assert_eq!(code, 0, "session list failed: {stderr}");
    let sessions: serde_json::Value = serde_json::from_str(&stdout).expect("list output");
    assert_eq!(sessions.as_array().map(|a| a.len()), Some(0));
}

#[test]
fn test_session_status_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["session", "status"]);
    assert_eq!(code, 0, "session status failed: {stderr}");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("status output");
    assert_eq!(value["status"], "Idle");
    assert_eq!(value["remaining_display"], "00:00");
}

#[test]
fn test_micro_break_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["session", "micro-break", "--seconds", "1"]);
    assert_eq!(code, 0, "micro-break failed: {stderr}");
    let outcome: serde_json::Value = serde_json::from_str(&stdout).expect("session output");
    assert_eq!(outcome["completed"]["session_type"], "MicroBreak");
    assert_eq!(outcome["completed"]["completed"], true);
    assert_eq!(outcome["today"]["break_count"], 1);

    let (stdout, _, code) = run_cli(dir.path(), &["session", "list"]);
    assert_eq!(code, 0);
    let sessions: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(sessions.as_array().map(|a| a.len()), Some(1));
    assert_eq!(sessions[0]["completed"], true);
}

#[test]
fn test_session_delete_unknown_id_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["session", "delete", "no-such-id"]);
    assert_eq!(code, 0, "session delete failed: {stderr}");
    assert!(stdout.contains("deleted"));
}
