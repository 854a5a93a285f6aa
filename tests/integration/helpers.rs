//! Shared test helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flurry::coordinator::{Coordinator, CoordinatorConfig, CoordinatorState, SocketBus};
use flurry::scene::SceneConfig;

pub const TICK: f32 = 1.0 / 60.0;

/// Small, seeded scene rooted in `dir`, without a signal handler.
pub fn test_config(dir: &Path) -> CoordinatorConfig {
    CoordinatorConfig {
        watch_poll_interval: Duration::from_millis(10),
        scene: SceneConfig {
            width: 320.0,
            height: 180.0,
            seed: Some(11),
            ..SceneConfig::default()
        },
        ..CoordinatorConfig::in_dir(dir)
    }
}

pub fn socket_coordinator(config: CoordinatorConfig) -> Coordinator {
    let bus = Arc::new(SocketBus::new(config.bus_dir.clone()));
    Coordinator::new(config, bus)
}

/// A config file pointing the binary at the same lock and bus as `test_config`.
pub fn write_config_file(dir: &Path) -> PathBuf {
    let config = test_config(dir);
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            "lock_path = '{}'\nbus_dir = '{}'\nwidth = 320.0\nheight = 180.0\nseed = 11\n",
            config.lock_path.display(),
            config.bus_dir.display()
        ),
    )
    .expect("Failed to write config");
    path
}

/// Tick in real time until `done` holds or `timeout` passes.
pub fn tick_until(
    coordinator: &mut Coordinator,
    timeout: Duration,
    mut done: impl FnMut(&Coordinator) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        coordinator.tick(TICK);
        if done(coordinator) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Tick until the coordinator exits; panics after `max_ticks`.
pub fn tick_to_exit(coordinator: &mut Coordinator, max_ticks: usize) {
    for _ in 0..max_ticks {
        if coordinator.tick(TICK) == CoordinatorState::Exited {
            return;
        }
    }
    panic!("coordinator did not exit within {max_ticks} ticks");
}
