//! Process probes used by the ownership lock and the `stop` command.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn to_pid(pid: u32) -> Option<Pid> {
    // 0 and anything past i32::MAX would address process groups, never a single owner.
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Some(Pid::from_raw(raw)),
        _ => None,
    }
}

/// Liveness probe: a null signal to `pid`.
///
/// `EPERM` means the process exists but belongs to someone else, which still
/// counts as alive for ownership purposes.
///
/// # Arguments
/// * `pid` - The process ID recorded in a lock file
///
/// # Returns
/// * `true` - The process exists
/// * `false` - No such process, or `pid` cannot name a single process
pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };

    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Ask the process to shut down gracefully with SIGTERM.
pub fn request_termination(pid: u32) -> Result<()> {
    let target = to_pid(pid).with_context(|| format!("Invalid process id {pid}"))?;
    kill(target, Signal::SIGTERM).with_context(|| format!("Failed to signal process {pid}"))
}
