//! `flurry status`: who owns the scene.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;

use crate::coordinator::{Coordinator, OwnerStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub lock_path: PathBuf,
    /// `none`, `running`, `starting` or `stale`.
    pub state: &'static str,
    pub pid: Option<u32>,
    /// When the lock was written.
    pub since: Option<DateTime<Local>>,
}

pub fn report(lock_path: &Path) -> Result<StatusReport> {
    let status = Coordinator::owner_status(lock_path)?;
    let (state, pid) = match status {
        OwnerStatus::NoOwner => ("none", None),
        OwnerStatus::Running { pid } => ("running", Some(pid)),
        OwnerStatus::Starting => ("starting", None),
        OwnerStatus::Stale { pid } => ("stale", pid),
    };
    let since = match status {
        OwnerStatus::NoOwner => None,
        _ => fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from),
    };

    Ok(StatusReport {
        lock_path: lock_path.to_path_buf(),
        state,
        pid,
        since,
    })
}

/// Execute the status command
pub fn execute(lock_path: &Path, json: bool) -> Result<()> {
    let report = report(lock_path)?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to encode status")?;
        println!("{out}");
        return Ok(());
    }

    let since = report
        .since
        .map(|at| format!(" since {}", at.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_default();
    match (report.state, report.pid) {
        ("running", Some(pid)) => {
            println!("{} flurry is running (pid {pid}){since}", "●".green().bold())
        }
        ("starting", _) => println!("{} flurry is starting{since}", "◌".yellow().bold()),
        ("stale", pid) => {
            let owner = pid.map(|p| format!(" (pid {p})")).unwrap_or_default();
            println!(
                "{} stale lock{owner}{since}; the next launch will reclaim it",
                "!".yellow().bold()
            );
        }
        _ => println!("{} flurry is not running", "─".dimmed()),
    }
    println!("  {}", report.lock_path.display().to_string().dimmed());
    Ok(())
}
