//! User configuration from `config.toml`.
//!
//! Every field is optional. A missing file means defaults; a malformed one is
//! an error. The file is only ever read.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorConfig;
use crate::scene::SceneConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlurryConfig {
    pub lock_path: Option<PathBuf>,
    pub bus_dir: Option<PathBuf>,
    /// Melt after this many seconds.
    pub duration_secs: Option<f64>,
    pub fps: Option<u32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub column_width: Option<f32>,
    pub max_pile_fraction: Option<f32>,
    pub wind: Option<f32>,
    pub seed: Option<u64>,
}

/// `<config dir>/flurry/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("flurry").join("config.toml"))
}

impl FlurryConfig {
    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// An explicitly named file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(secs) = self.duration_secs {
            if !secs.is_finite() || secs <= 0.0 {
                bail!("duration_secs must be positive, got {secs}");
            }
        }
        if self.fps == Some(0) {
            bail!("fps must be at least 1");
        }
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("column_width", self.column_width),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    bail!("{name} must be positive, got {value}");
                }
            }
        }
        if let Some(fraction) = self.max_pile_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                bail!("max_pile_fraction must be in (0, 1], got {fraction}");
            }
        }
        Ok(())
    }

    /// Coordinator settings with these overrides applied on top of the defaults.
    pub fn to_coordinator_config(&self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::default();
        let scene_defaults = SceneConfig::default();

        CoordinatorConfig {
            lock_path: self.lock_path.clone().unwrap_or(defaults.lock_path),
            bus_dir: self.bus_dir.clone().unwrap_or(defaults.bus_dir),
            tick_interval: self
                .fps
                .map(|fps| Duration::from_secs(1) / fps.max(1))
                .unwrap_or(defaults.tick_interval),
            duration: self.duration_secs.map(Duration::from_secs_f64),
            scene: SceneConfig {
                width: self.width.unwrap_or(scene_defaults.width),
                height: self.height.unwrap_or(scene_defaults.height),
                column_width: self.column_width.unwrap_or(scene_defaults.column_width),
                max_pile_fraction: self
                    .max_pile_fraction
                    .unwrap_or(scene_defaults.max_pile_fraction),
                wind: self.wind.unwrap_or(scene_defaults.wind),
                seed: self.seed.or(scene_defaults.seed),
            },
            ..defaults
        }
    }
}
