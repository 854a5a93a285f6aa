//! Coordinator struct, configuration and state types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use super::bus::{MessageBus, Subscription};
use super::lock::{self, LockStatus, OwnerLock};
use crate::scene::{SceneConfig, SimulationScene};
use crate::watcher::{ChangeWatcher, DEFAULT_POLL_INTERVAL};

/// Directory holding the lock and the bus sockets.
///
/// Prefers the per-user runtime directory and falls back to the cache and
/// then the temp directory.
pub fn default_state_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("flurry")
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub lock_path: PathBuf,
    pub bus_dir: PathBuf,
    /// Target frame interval for [`Coordinator::run`].
    pub tick_interval: Duration,
    pub watch_poll_interval: Duration,
    /// Hard limit after which the owner starts melting regardless of state.
    pub duration: Option<Duration>,
    /// Tests that run several owners in one process turn this off; the
    /// handler can only be installed once.
    pub install_signal_handler: bool,
    pub scene: SceneConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let dir = default_state_dir();
        Self {
            lock_path: dir.join("flurry.lock"),
            bus_dir: dir.join("bus"),
            tick_interval: Duration::from_secs(1) / 60,
            watch_poll_interval: DEFAULT_POLL_INTERVAL,
            duration: None,
            install_signal_handler: true,
            scene: SceneConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Config rooted at `dir`, with signals left alone. Meant for tests and
    /// embedding.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            lock_path: dir.join("flurry.lock"),
            bus_dir: dir.join("bus"),
            install_signal_handler: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// `start` has not run yet.
    Unclaimed,
    /// This process holds the lock and drives the scene.
    Owner,
    /// Another process owns the scene; this one has handed over.
    NonOwner,
    /// The scene is melting; no new sessions are accepted.
    ShuttingDown,
    /// Lock released, ready for the process to exit.
    Exited,
}

/// Everything that reaches the loop thread from elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Another process asked to join, optionally with a file to watch.
    Escalate { watch_path: Option<PathBuf> },
    /// The watched file of this session grew.
    WatchTriggered { session_id: String },
    Terminate,
    SceneCompleted,
}

/// Why the owner's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The scene stopped on its own and melted away.
    Completed,
    /// A termination signal started the melt.
    Terminated,
    /// The configured duration ran out.
    TimedOut,
}

/// Ownership as seen from outside, for `status` and `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerStatus {
    NoOwner,
    Running { pid: u32 },
    /// A claimant has created the lock but not written its PID yet.
    Starting,
    /// A lock exists but its owner is gone.
    Stale { pid: Option<u32> },
}

/// Per-process arbiter for the shared scene.
pub struct Coordinator {
    pub(super) config: CoordinatorConfig,
    pub(super) bus: Arc<dyn MessageBus>,
    pub(super) state: CoordinatorState,
    pub(super) scene: Option<SimulationScene>,
    pub(super) lock: Option<OwnerLock>,
    /// Session id to its watcher, if the session was started with one.
    pub(super) registry: HashMap<String, Option<ChangeWatcher>>,
    pub(super) subscription: Option<Subscription>,
    pub(super) events_tx: Sender<CoordinatorEvent>,
    pub(super) events_rx: Receiver<CoordinatorEvent>,
    pub(super) elapsed: Duration,
    pub(super) stop_cause: Option<ExitReason>,
    pub(super) exit_reason: Option<ExitReason>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, bus: Arc<dyn MessageBus>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            config,
            bus,
            state: CoordinatorState::Unclaimed,
            scene: None,
            lock: None,
            registry: HashMap::new(),
            subscription: None,
            events_tx,
            events_rx,
            elapsed: Duration::ZERO,
            stop_cause: None,
            exit_reason: None,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn is_owner(&self) -> bool {
        matches!(
            self.state,
            CoordinatorState::Owner | CoordinatorState::ShuttingDown
        )
    }

    pub fn scene(&self) -> Option<&SimulationScene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut SimulationScene> {
        self.scene.as_mut()
    }

    /// Ids of sessions in the registry, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_watching(&self, session_id: &str) -> bool {
        matches!(self.registry.get(session_id), Some(Some(_)))
    }

    /// Handle for injecting events, as the signal and bus threads do.
    pub fn events(&self) -> Sender<CoordinatorEvent> {
        self.events_tx.clone()
    }

    /// Set once the coordinator has exited.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Who, if anyone, owns the scene behind `lock_path`.
    pub fn owner_status(lock_path: &Path) -> anyhow::Result<OwnerStatus> {
        Ok(match lock::inspect(lock_path)? {
            LockStatus::Free => OwnerStatus::NoOwner,
            LockStatus::Held { pid } => OwnerStatus::Running { pid },
            LockStatus::Initializing => OwnerStatus::Starting,
            LockStatus::Stale { pid } => OwnerStatus::Stale { pid },
        })
    }
}
