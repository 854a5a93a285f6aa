//! The `flurry` binary against an owner running in this process.

use std::process::Command;
use std::time::Duration;

use flurry::scene::DEFAULT_SESSION_ID;
use tempfile::TempDir;

use super::helpers::{socket_coordinator, test_config, tick_until, write_config_file};

fn flurry() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_flurry"));
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn test_second_launch_joins_and_exits_quietly() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config_file(temp_dir.path());
    let mut owner = socket_coordinator(test_config(temp_dir.path()));
    assert!(owner.start(None).unwrap());

    let output = flurry()
        .args(["run", "--headless", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to launch flurry");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    assert!(tick_until(&mut owner, Duration::from_secs(5), |c| {
        c.session_ids().len() == 2
    }));
    assert!(owner.session_ids().contains(&DEFAULT_SESSION_ID.to_string()));
}

#[test]
fn test_status_reports_owner() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config_file(temp_dir.path());

    let output = flurry()
        .args(["status", "--json", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to launch flurry");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["state"], "none");

    let mut owner = socket_coordinator(test_config(temp_dir.path()));
    assert!(owner.start(None).unwrap());

    let output = flurry()
        .args(["status", "--json", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to launch flurry");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["state"], "running");
    assert_eq!(report["pid"], std::process::id());
}

#[test]
fn test_owner_launch_honours_duration() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config_file(temp_dir.path());

    let output = flurry()
        .args(["run", "--headless", "--duration", "0.3", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to launch flurry");
    assert!(output.status.success());
    assert!(!test_config(temp_dir.path()).lock_path.exists());
}
