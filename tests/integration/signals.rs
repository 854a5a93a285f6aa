//! Termination signals start the melt instead of killing the owner.

use std::time::Duration;

use flurry::coordinator::{CoordinatorConfig, CoordinatorState, ExitReason};
use flurry::pile::DEPOSIT_PEAK;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serial_test::serial;
use tempfile::TempDir;

use super::helpers::{socket_coordinator, test_config, tick_to_exit, tick_until};

#[test]
#[serial]
fn test_sigterm_melts_then_exits() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = CoordinatorConfig {
        install_signal_handler: true,
        ..test_config(temp_dir.path())
    };
    let lock_path = config.lock_path.clone();

    let mut owner = socket_coordinator(config);
    assert!(owner.start(None).unwrap());
    if let Some(scene) = owner.scene_mut() {
        scene.height_field_mut().deposit(100.0, DEPOSIT_PEAK, Some(0));
    }

    kill(Pid::this(), Signal::SIGTERM).expect("Failed to signal self");
    assert!(tick_until(&mut owner, Duration::from_secs(5), |c| {
        c.state() != CoordinatorState::Owner
    }));
    assert!(lock_path.exists());

    tick_to_exit(&mut owner, 1_000);
    assert_eq!(owner.exit_reason(), Some(ExitReason::Terminated));
    assert!(!lock_path.exists());
}
