//! Ownership between coordinators sharing a lock and a socket bus.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use flurry::coordinator::{lock, CoordinatorState, ExitReason};
use flurry::scene::DEFAULT_SESSION_ID;
use tempfile::TempDir;

use super::helpers::{socket_coordinator, test_config, tick_to_exit, tick_until};

#[test]
fn test_racing_launches_elect_one_owner() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut coordinator = socket_coordinator(config);
                barrier.wait();
                let owner = coordinator.start(None).expect("start");
                barrier.wait();
                owner
            })
        })
        .collect();

    let owners = handles
        .into_iter()
        .map(|h| h.join().expect("launch thread panicked"))
        .filter(|owner| *owner)
        .count();
    assert_eq!(owners, 1);
    // Every coordinator has been dropped, so the lock is gone.
    assert!(!config.lock_path.exists());
}

#[test]
fn test_escalation_over_socket_bus_adds_session() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut owner = socket_coordinator(test_config(temp_dir.path()));
    assert!(owner.start(None).unwrap());

    let watched = temp_dir.path().join("job.log");
    fs::write(&watched, "running\n").unwrap();
    let mut guest = socket_coordinator(test_config(temp_dir.path()));
    assert!(!guest.start(Some(watched.clone())).unwrap());
    assert_eq!(guest.state(), CoordinatorState::NonOwner);

    assert!(tick_until(&mut owner, Duration::from_secs(5), |c| {
        c.session_ids().len() == 2
    }));
    let guest_id = owner
        .session_ids()
        .into_iter()
        .find(|id| id != DEFAULT_SESSION_ID)
        .unwrap();
    assert!(owner.is_watching(&guest_id));

    // The guest's job finishes: its session leaves, the default one stays.
    fs::write(&watched, "running\ndone\n").unwrap();
    assert!(tick_until(&mut owner, Duration::from_secs(5), |c| {
        c.session_ids() == vec![DEFAULT_SESSION_ID.to_string()]
    }));
    assert_eq!(owner.state(), CoordinatorState::Owner);
}

#[test]
fn test_dead_owner_lock_is_taken_over() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());
    fs::write(&config.lock_path, "999999999\n").unwrap();

    let mut coordinator = socket_coordinator(config.clone());
    assert!(coordinator.start(None).unwrap());
    assert_eq!(lock::read_owner(&config.lock_path), Some(std::process::id()));

    coordinator.request_stop();
    tick_to_exit(&mut coordinator, 1_000);
    assert_eq!(coordinator.exit_reason(), Some(ExitReason::Terminated));
    assert!(!config.lock_path.exists());
}

#[test]
fn test_lock_freed_after_exit_allows_new_owner() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());

    let mut first = socket_coordinator(config.clone());
    assert!(first.start(None).unwrap());
    first.request_stop();
    tick_to_exit(&mut first, 1_000);

    let mut second = socket_coordinator(config);
    assert!(second.start(None).unwrap());
}
