//! Flurry: an accumulating particle overlay shared by every launch on a host.
//!
//! The first launch owns the scene; later launches join it as extra sessions
//! and leave when the file they watch grows.

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod logging;
pub mod pile;
pub mod process;
pub mod render;
pub mod scene;
pub mod watcher;

/// Banner shown in `--help`.
pub const LOGO: &str = "\
   ·  ❄    ·   ❄
 ▁▂▃▄▅▆▇█▇▆▅▄▃▂▁ flurry";
