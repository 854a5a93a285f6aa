//! Locks leaked past `Drop` are still removed when the process calls `exit`.

use std::env;
use std::mem;
use std::path::PathBuf;
use std::process::{self, Command};

use flurry::coordinator::OwnerLock;
use tempfile::TempDir;

/// Set in the child run: the lock path to claim before exiting.
const CHILD_LOCK_ENV: &str = "FLURRY_EXIT_CLEANUP_LOCK";

const TEST_NAME: &str = "exit_cleanup::test_leaked_lock_removed_on_process_exit";

#[test]
fn test_leaked_lock_removed_on_process_exit() {
    if let Ok(path) = env::var(CHILD_LOCK_ENV) {
        let lock = OwnerLock::claim(&PathBuf::from(path)).expect("child claim");
        println!("claimed pid={}", lock.pid());
        // Skip Drop so only the exit-time hook can remove the file.
        mem::forget(lock);
        process::exit(0);
    }

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let lock_path = temp_dir.path().join("flurry.lock");

    let output = Command::new(env::current_exe().expect("test binary path"))
        .args(["--exact", TEST_NAME, "--nocapture", "--test-threads=1"])
        .env(CHILD_LOCK_ENV, &lock_path)
        .output()
        .expect("Failed to run child");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "child failed: {stdout}");
    assert!(stdout.contains("claimed pid="), "child never claimed: {stdout}");
    assert!(!lock_path.exists());
}
