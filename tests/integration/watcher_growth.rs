//! File growth detection.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flurry::watcher::ChangeWatcher;
use tempfile::TempDir;

const POLL: Duration = Duration::from_millis(10);

fn counting_watcher(path: &std::path::Path) -> (ChangeWatcher, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let watcher = ChangeWatcher::watch(path, POLL, move || {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .expect("watcher");
    (watcher, count)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL);
    }
    false
}

#[test]
fn test_rewrite_at_same_size_never_fires() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("job.log");
    fs::write(&path, vec![b'a'; 100]).unwrap();

    let (watcher, count) = counting_watcher(&path);
    assert_eq!(watcher.baseline(), 100);

    fs::write(&path, vec![b'b'; 100]).unwrap();
    thread::sleep(POLL * 20);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!watcher.has_fired());
}

#[test]
fn test_growth_fires_exactly_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("job.log");
    fs::write(&path, vec![b'a'; 100]).unwrap();

    let (watcher, count) = counting_watcher(&path);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[b'c'; 50]).unwrap();
    file.flush().unwrap();
    assert!(wait_for(|| count.load(Ordering::SeqCst) == 1));

    file.write_all(&[b'd'; 200]).unwrap();
    file.flush().unwrap();
    thread::sleep(POLL * 20);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(watcher.has_fired());
}

#[test]
fn test_cancel_after_firing_is_harmless() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("job.log");
    fs::write(&path, "").unwrap();

    let (mut watcher, count) = counting_watcher(&path);
    fs::write(&path, "grown").unwrap();
    assert!(wait_for(|| watcher.has_fired()));

    watcher.cancel();
    watcher.cancel();
    drop(watcher);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
