//! Termination signals routed into the coordinator's event channel.

use std::sync::mpsc::Sender;

use anyhow::{Context, Result};

use super::core::CoordinatorEvent;

/// Intercept SIGINT, SIGTERM and SIGHUP so the owner melts instead of dying.
///
/// The handler only forwards an event; shutdown itself runs on the loop
/// thread. Can be installed once per process.
pub(super) fn install_termination_handler(events: Sender<CoordinatorEvent>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("termination requested");
        let _ = events.send(CoordinatorEvent::Terminate);
    })
    .context("Failed to install termination handler")
}
