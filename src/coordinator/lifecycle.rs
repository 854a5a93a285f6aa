//! Coordinator lifecycle: claim, tick, run, shut down.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use super::bus::ESCALATION_TOPIC;
use super::core::{Coordinator, CoordinatorEvent, CoordinatorState, ExitReason};
use super::lock::{self, LockError, LockStatus, OwnerLock};
use super::signals::install_termination_handler;
use crate::render::FrameSink;
use crate::scene::{SceneState, SimulationScene, DEFAULT_SESSION_ID};
use crate::watcher::ChangeWatcher;

impl Coordinator {
    /// Claim ownership or hand over to the current owner.
    ///
    /// A stale lock is reclaimed once. The owner listens for escalations,
    /// starts the scene and adds the default session, watching `watch_path`
    /// when given.
    ///
    /// # Arguments
    /// * `watch_path` - File whose growth ends this launch's session
    ///
    /// # Returns
    /// * `Ok(true)` - This process owns the scene; call [`run`](Self::run)
    /// * `Ok(false)` - An escalation carrying `watch_path` went to the owner;
    ///   the caller should exit
    /// * `Err` - Already started, or the lock could not be inspected or written
    pub fn start(&mut self, watch_path: Option<PathBuf>) -> Result<bool> {
        if self.state != CoordinatorState::Unclaimed {
            bail!("Coordinator already started ({:?})", self.state);
        }

        let Some(lock) = self.acquire_lock()? else {
            self.escalate(watch_path.as_deref());
            self.state = CoordinatorState::NonOwner;
            return Ok(false);
        };
        tracing::info!(lock = %lock.path().display(), pid = lock.pid(), "claimed ownership");
        self.lock = Some(lock);

        if self.config.install_signal_handler {
            if let Err(e) = install_termination_handler(self.events_tx.clone()) {
                tracing::warn!(error = %e, "continuing without graceful signal handling");
            }
        }

        let events = self.events_tx.clone();
        let subscription = self.bus.subscribe(
            ESCALATION_TOPIC,
            Box::new(move |payload| {
                let _ = events.send(CoordinatorEvent::Escalate {
                    watch_path: payload.map(PathBuf::from),
                });
            }),
        );
        match subscription {
            Ok(subscription) => self.subscription = Some(subscription),
            // Still the owner; later launches just cannot join this scene.
            Err(e) => tracing::warn!(error = %e, "not listening for escalations"),
        }

        let mut scene = SimulationScene::new(self.config.scene.clone());
        let events = self.events_tx.clone();
        scene.on_complete(move || {
            let _ = events.send(CoordinatorEvent::SceneCompleted);
        });
        self.scene = Some(scene);
        self.state = CoordinatorState::Owner;

        self.add_session(DEFAULT_SESSION_ID.to_string(), watch_path);
        Ok(true)
    }

    /// Lock for this process, or `None` when someone else owns it.
    fn acquire_lock(&self) -> Result<Option<OwnerLock>> {
        let path = &self.config.lock_path;
        match lock::inspect(path)? {
            LockStatus::Free => {}
            LockStatus::Held { pid } => {
                tracing::debug!(pid, "scene already owned");
                return Ok(None);
            }
            LockStatus::Initializing => {
                tracing::debug!("another process is claiming ownership");
                return Ok(None);
            }
            LockStatus::Stale { pid } => {
                tracing::warn!(lock = %path.display(), ?pid, "removing stale lock");
                if !lock::remove_stale(path, pid)? {
                    return Ok(None);
                }
            }
        }

        match OwnerLock::claim(path) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyHeld { .. }) => {
                tracing::debug!("lost the race to claim ownership");
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to claim ownership lock"),
        }
    }

    fn escalate(&self, watch_path: Option<&std::path::Path>) {
        let payload = watch_path.map(|p| p.to_string_lossy().into_owned());
        match self.bus.broadcast(ESCALATION_TOPIC, payload.as_deref()) {
            Ok(delivered) => tracing::info!(delivered, "handed over to the running owner"),
            Err(e) => tracing::warn!(error = %e, "escalation could not be sent"),
        }
    }

    /// Advance by `dt` seconds: dispatch pending events, enforce the time
    /// limit and step the scene.
    pub fn tick(&mut self, dt: f32) -> CoordinatorState {
        if !self.is_owner() {
            return self.state;
        }

        self.dispatch_events();
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += Duration::from_secs_f32(dt);
        }
        if let Some(limit) = self.config.duration {
            if self.elapsed >= limit && self.state == CoordinatorState::Owner {
                tracing::info!(elapsed = ?self.elapsed, "duration reached");
                self.begin_shutdown(ExitReason::TimedOut);
            }
        }

        if let Some(scene) = self.scene.as_mut() {
            scene.update(dt);
            if self.state == CoordinatorState::Owner && scene.state() != SceneState::Active {
                // Auto-stop inside the scene.
                self.state = CoordinatorState::ShuttingDown;
                self.stop_cause.get_or_insert(ExitReason::Completed);
                tracing::info!("scene winding down");
            }
        }

        self.dispatch_events();
        self.state
    }

    /// Drive the scene in real time until it completes.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<ExitReason> {
        if !self.is_owner() {
            bail!("Only the owning process can run the scene ({:?})", self.state);
        }

        let interval = self.config.tick_interval;
        let mut last = Instant::now();
        loop {
            let frame_start = Instant::now();
            let dt = frame_start.duration_since(last).as_secs_f32();
            last = frame_start;

            self.tick(dt);
            if let Some(reason) = self.exit_reason {
                return Ok(reason);
            }
            if let Some(scene) = self.scene.as_ref() {
                sink.present(&scene.frame())?;
            }

            let spent = frame_start.elapsed();
            if spent < interval {
                thread::sleep(interval - spent);
            }
        }
    }

    /// Ask the owner to melt and exit, as a termination signal would.
    pub fn request_stop(&self) {
        let _ = self.events_tx.send(CoordinatorEvent::Terminate);
    }

    fn dispatch_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub(super) fn handle_event(&mut self, event: CoordinatorEvent) {
        tracing::debug!(?event, state = ?self.state, "coordinator event");
        match event {
            CoordinatorEvent::Escalate { watch_path } => {
                if self.state != CoordinatorState::Owner {
                    tracing::debug!("ignoring escalation while shutting down");
                    return;
                }
                self.add_session(Uuid::new_v4().to_string(), watch_path);
            }
            CoordinatorEvent::WatchTriggered { session_id } => self.deescalate(&session_id),
            CoordinatorEvent::Terminate => self.begin_shutdown(ExitReason::Terminated),
            CoordinatorEvent::SceneCompleted => self.finish(),
        }
    }

    fn add_session(&mut self, id: String, watch_path: Option<PathBuf>) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let index = match scene.add_session(&id, None) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "session not added");
                return;
            }
        };

        let watcher = watch_path.and_then(|path| {
            let events = self.events_tx.clone();
            let session_id = id.clone();
            ChangeWatcher::watch(&path, self.config.watch_poll_interval, move || {
                let _ = events.send(CoordinatorEvent::WatchTriggered { session_id });
            })
        });

        tracing::info!(session = %id, index, watching = watcher.is_some(), "session joined");
        self.registry.insert(id, watcher);
    }

    fn deescalate(&mut self, session_id: &str) {
        let Some(watcher) = self.registry.remove(session_id) else {
            return;
        };
        if let Some(mut watcher) = watcher {
            watcher.cancel();
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.remove_session(session_id);
        }
        tracing::info!(session = %session_id, "session left");
    }

    fn begin_shutdown(&mut self, cause: ExitReason) {
        if self.state != CoordinatorState::Owner {
            return;
        }
        self.state = CoordinatorState::ShuttingDown;
        self.stop_cause = Some(cause);
        if let Some(scene) = self.scene.as_mut() {
            scene.stop();
        }
        tracing::info!(?cause, "shutting down");
    }

    fn finish(&mut self) {
        if self.state == CoordinatorState::Exited {
            return;
        }

        self.subscription = None;
        self.registry.clear();
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }

        let reason = self.stop_cause.unwrap_or(ExitReason::Completed);
        self.state = CoordinatorState::Exited;
        self.exit_reason = Some(reason);
        tracing::info!(?reason, "scene complete, ownership released");
    }
}
