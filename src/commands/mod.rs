//! Subcommand implementations behind the `flurry` binary.

pub mod run;
pub mod status;
pub mod stop;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::FlurryConfig;

/// Lock path from the user's config, or the default one.
pub fn resolve_lock_path(config_path: Option<&Path>) -> Result<PathBuf> {
    Ok(FlurryConfig::load(config_path)?
        .to_coordinator_config()
        .lock_path)
}
