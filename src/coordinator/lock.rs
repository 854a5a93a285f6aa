//! Ownership lock file.
//!
//! The lock holds the owner's decimal PID followed by a newline. It is created
//! with exclusive-create semantics, never rewritten, and removed when the owner
//! exits, including through `std::process::exit` via an `atexit` hook.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::process::is_process_alive;

/// An unreadable lock younger than this is assumed to be mid-write by its
/// creator; an older one is abandoned.
pub const LOCK_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {path} is already held")]
    AlreadyHeld { path: PathBuf },

    #[error("lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What an existing lock file says about ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Free,
    /// The recorded owner is running.
    Held { pid: u32 },
    /// Being written by a claimant right now.
    Initializing,
    /// The owner is gone, or the file was never completed.
    Stale { pid: Option<u32> },
}

/// Inspect the lock at `path` without modifying it.
pub fn inspect(path: &Path) -> Result<LockStatus, LockError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LockStatus::Free),
        Err(e) => return Err(io_error(path, e)),
    };

    match contents.trim().parse::<u32>() {
        Ok(pid) if is_process_alive(pid) => Ok(LockStatus::Held { pid }),
        Ok(pid) => Ok(LockStatus::Stale { pid: Some(pid) }),
        Err(_) => {
            if file_age(path) < LOCK_GRACE {
                Ok(LockStatus::Initializing)
            } else {
                Ok(LockStatus::Stale { pid: None })
            }
        }
    }
}

/// PID recorded in the lock, if the file exists and parses.
pub fn read_owner(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
}

/// Delete a stale lock, unless another process got to it first.
///
/// Recovery is serialised across processes by a `<lock>.reclaim` guard file.
/// Under the guard the lock is inspected again and removed only if it is still
/// stale and still names `pid`, so a lock freshly claimed by a faster process
/// survives. A guard older than [`LOCK_GRACE`] was left by a crashed reclaimer
/// and is discarded.
///
/// # Arguments
/// * `path` - The lock file
/// * `pid` - The owner recorded when the lock was judged stale
///
/// # Returns
/// `true` when the lock is gone and the caller may claim it, `false` when the
/// lock changed hands or another process is reclaiming it right now.
pub fn remove_stale(path: &Path, pid: Option<u32>) -> Result<bool, LockError> {
    let Some(_guard) = ReclaimGuard::acquire(path)? else {
        tracing::debug!(lock = %path.display(), "another process is reclaiming the lock");
        return Ok(false);
    };

    match inspect(path)? {
        LockStatus::Free => Ok(true),
        LockStatus::Stale { pid: current } if current == pid => {
            match fs::remove_file(path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
                Err(e) => Err(io_error(path, e)),
            }
        }
        _ => Ok(false),
    }
}

/// Time since `path` was last modified; zero if unknown.
fn file_age(path: &Path) -> Duration {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or_default()
}

fn reclaim_guard_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".reclaim");
    path.with_file_name(name)
}

/// Exclusive right to remove a stale lock. Dropping it removes the guard file.
struct ReclaimGuard {
    path: PathBuf,
}

impl ReclaimGuard {
    fn acquire(lock_path: &Path) -> Result<Option<Self>, LockError> {
        let path = reclaim_guard_path(lock_path);
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Some(Self { path })),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if file_age(&path) < LOCK_GRACE {
                        return Ok(None);
                    }
                    tracing::warn!(guard = %path.display(), "discarding abandoned reclaim guard");
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(io_error(&path, e)),
                    }
                }
                Err(e) => return Err(io_error(&path, e)),
            }
        }
        Ok(None)
    }
}

impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn io_error(path: &Path, source: io::Error) -> LockError {
    LockError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Guard for a claimed lock. Dropping it removes the file.
#[derive(Debug)]
pub struct OwnerLock {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl OwnerLock {
    /// Atomically create the lock for this process.
    ///
    /// Missing parent directories are created. The path is registered for
    /// removal at process exit until the lock is released.
    ///
    /// # Arguments
    /// * `path` - Where the lock lives, usually `<state dir>/flurry.lock`
    ///
    /// # Returns
    /// * `Ok(OwnerLock)` - This process is the owner
    /// * `Err(LockError::AlreadyHeld)` - The file exists, whoever wrote it
    /// * `Err(LockError::Io)` - The directory or file could not be written
    pub fn claim(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockError::AlreadyHeld {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(io_error(path, e)),
        };

        let pid = std::process::id();
        // The file is ours now; a half-written lock must not outlive a failed claim.
        if let Err(e) = writeln!(file, "{pid}").and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(path);
            return Err(io_error(path, e));
        }

        exit_cleanup::register(path);
        Ok(Self {
            path: path.to_path_buf(),
            pid,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Remove the lock file. Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        exit_cleanup::unregister(&self.path);

        // Only remove the file if it still names us.
        if read_owner(&self.path) == Some(self.pid) {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock");
            }
        }
    }
}

impl Drop for OwnerLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Locks still held when the process exits through `exit()`.
mod exit_cleanup {
    use super::*;

    static HELD: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
    static INSTALL: Once = Once::new();

    extern "C" fn remove_held_locks() {
        // try_lock: a panic while holding the mutex must not hang exit.
        if let Ok(mut held) = HELD.try_lock() {
            for path in held.drain(..) {
                let _ = fs::remove_file(path);
            }
        }
    }

    pub(super) fn register(path: &Path) {
        INSTALL.call_once(|| {
            // SAFETY: `remove_held_locks` is a plain extern "C" fn that does not unwind.
            let rc = unsafe { libc::atexit(remove_held_locks) };
            if rc != 0 {
                tracing::warn!("failed to register exit-time lock cleanup");
            }
        });
        if let Ok(mut held) = HELD.lock() {
            held.push(path.to_path_buf());
        }
    }

    pub(super) fn unregister(path: &Path) {
        if let Ok(mut held) = HELD.lock() {
            held.retain(|p| p != path);
        }
    }

    #[cfg(test)]
    pub(super) fn is_registered(path: &Path) -> bool {
        HELD.lock().map(|held| held.iter().any(|p| p == path)).unwrap_or(false)
    }
}
