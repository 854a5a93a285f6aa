//! One-shot file growth watcher.
//!
//! A [`ChangeWatcher`] records a file's size when it is created and polls the
//! open handle on a background thread. The first time the file grows beyond
//! that baseline the callback runs, exactly once, and polling stops.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between size checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct WatchFlags {
    fired: AtomicBool,
    cancelled: AtomicBool,
}

/// Handle to a running watch. Dropping it cancels the watch.
#[derive(Debug)]
pub struct ChangeWatcher {
    path: PathBuf,
    baseline: u64,
    flags: Arc<WatchFlags>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Start watching `path` for growth.
    ///
    /// Returns `None` (after logging a warning) when the file cannot be
    /// opened, so callers carry on without a watcher.
    pub fn watch<F>(path: &Path, poll_interval: Duration, on_growth: F) -> Option<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot watch file");
                return None;
            }
        };
        let baseline = file.metadata().map(|m| m.len()).unwrap_or(0);
        let flags = Arc::new(WatchFlags::default());

        let thread_flags = Arc::clone(&flags);
        let spawned = thread::Builder::new()
            .name("flurry-watch".to_string())
            .spawn(move || run_watch(file, baseline, poll_interval, thread_flags, on_growth));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot start watch thread");
                return None;
            }
        };

        tracing::debug!(path = %path.display(), baseline, "watching file for growth");
        Some(Self {
            path: path.to_path_buf(),
            baseline,
            flags,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size recorded when the watch started.
    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    pub fn has_fired(&self) -> bool {
        self.flags.fired.load(Ordering::SeqCst)
    }

    /// Stop watching. Safe to call repeatedly, before or after firing.
    pub fn cancel(&mut self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
        // The thread exits on its next poll; it is not joined here.
        self.handle.take();
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_watch<F>(file: File, baseline: u64, poll_interval: Duration, flags: Arc<WatchFlags>, on_growth: F)
where
    F: FnOnce(),
{
    while !flags.cancelled.load(Ordering::SeqCst) {
        thread::sleep(poll_interval);
        if flags.cancelled.load(Ordering::SeqCst) {
            break;
        }

        // Sizes at or below the baseline are partial writes still in flight.
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        if size <= baseline {
            continue;
        }

        if !flags.fired.swap(true, Ordering::SeqCst) {
            flags.cancelled.store(true, Ordering::SeqCst);
            on_growth();
        }
        break;
    }
}
