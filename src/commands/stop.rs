//! `flurry stop`: ask the owner to melt and exit.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::coordinator::{lock, Coordinator, OwnerStatus};
use crate::process::request_termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    /// SIGTERM sent; the owner melts before exiting.
    Signalled { pid: u32 },
    StaleLockRemoved,
}

pub fn stop_owner(lock_path: &Path) -> Result<StopOutcome> {
    match Coordinator::owner_status(lock_path)? {
        OwnerStatus::NoOwner => Ok(StopOutcome::NotRunning),
        OwnerStatus::Running { pid } => {
            request_termination(pid).context("Failed to stop flurry")?;
            Ok(StopOutcome::Signalled { pid })
        }
        OwnerStatus::Stale { pid } => {
            if !lock::remove_stale(lock_path, pid)? {
                bail!("the lock changed while stopping; check `flurry status`");
            }
            Ok(StopOutcome::StaleLockRemoved)
        }
        OwnerStatus::Starting => bail!("flurry is still starting; try again in a moment"),
    }
}

/// Execute the stop command
pub fn execute(lock_path: &Path) -> Result<()> {
    match stop_owner(lock_path)? {
        StopOutcome::NotRunning => println!("{} flurry is not running", "─".dimmed()),
        StopOutcome::Signalled { pid } => {
            println!("{} Asked flurry (pid {pid}) to melt away", "✓".green().bold())
        }
        StopOutcome::StaleLockRemoved => {
            println!("{} Removed stale lock", "✓".green().bold())
        }
    }
    Ok(())
}
