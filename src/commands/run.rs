//! `flurry run`: own the scene, or hand this launch to the current owner.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::config::FlurryConfig;
use crate::coordinator::{Coordinator, CoordinatorConfig, ExitReason, SocketBus};
use crate::render::{FrameSink, HeadlessSink, TerminalSink};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Leave the scene once this file grows.
    pub watch: Option<PathBuf>,
    /// Overrides `duration_secs` from the config.
    pub duration_secs: Option<f64>,
    pub config: Option<PathBuf>,
    /// Never draw to the terminal, even when stdout is one.
    pub headless: bool,
}

/// Build the coordinator config for a launch.
pub fn coordinator_config(options: &RunOptions) -> Result<CoordinatorConfig> {
    let mut config = FlurryConfig::load(options.config.as_deref())?.to_coordinator_config();
    if let Some(secs) = options.duration_secs {
        if !secs.is_finite() || secs <= 0.0 {
            bail!("--duration must be a positive number of seconds, got {secs}");
        }
        config.duration = Some(Duration::from_secs_f64(secs));
    }
    Ok(config)
}

/// The owner may run in another directory, so watch paths travel absolute.
fn absolute_watch_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    })
}

/// Execute the run command. A launch that joins an existing owner returns
/// immediately and silently.
pub fn execute(options: RunOptions) -> Result<()> {
    let config = coordinator_config(&options)?;
    let bus = Arc::new(SocketBus::new(config.bus_dir.clone()));
    let mut coordinator = Coordinator::new(config, bus);

    let watch = options.watch.clone().map(absolute_watch_path);
    if !coordinator.start(watch)? {
        return Ok(());
    }

    let reason = if !options.headless && io::stdout().is_terminal() {
        let width = crossterm::terminal::size()
            .map(|(columns, _)| usize::from(columns))
            .unwrap_or(80);
        drive(&mut coordinator, &mut TerminalSink::new(io::stdout(), width))?
    } else {
        drive(&mut coordinator, &mut HeadlessSink::new())?
    };

    tracing::info!(?reason, "flurry finished");
    Ok(())
}

fn drive(coordinator: &mut Coordinator, sink: &mut dyn FrameSink) -> Result<ExitReason> {
    let result = coordinator.run(sink);
    sink.finish()?;
    result
}
