//! Best-effort publish/subscribe between flurry processes.
//!
//! [`SocketBus`] gives every subscriber its own Unix datagram socket in a
//! shared directory; a broadcast is one datagram per socket whose name starts
//! with the topic. [`MemoryBus`] keeps everything in-process.

use std::fs;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Topic non-owners use to ask the owner for a new session.
pub const ESCALATION_TOPIC: &str = "escalate";

/// Largest datagram a subscriber accepts.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Receive timeout, bounding how long an unsubscribe waits on the listener.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Called with the message payload on the subscriber's listener thread.
pub type BusHandler = Box<dyn Fn(Option<String>) + Send + Sync + 'static>;

/// Wire format of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Option<String>,
}

pub trait MessageBus: Send + Sync {
    /// Deliver to every current subscriber of `topic`. Returns how many
    /// subscribers accepted the message.
    fn broadcast(&self, topic: &str, payload: Option<&str>) -> Result<usize>;

    /// Register `handler` for `topic` until the returned subscription is dropped.
    fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<Subscription>;
}

/// Live subscription. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

static NEXT_SOCKET: AtomicU64 = AtomicU64::new(0);

/// Message bus over Unix datagram sockets in `dir`.
#[derive(Debug, Clone)]
pub struct SocketBus {
    dir: PathBuf,
}

impl SocketBus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn socket_path(&self, topic: &str) -> PathBuf {
        let seq = NEXT_SOCKET.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{topic}.{}-{seq}.sock", std::process::id()))
    }

    fn subscriber_sockets(&self, topic: &str) -> io::Result<Vec<PathBuf>> {
        let prefix = format!("{topic}.");
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut sockets = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".sock") {
                sockets.push(entry.path());
            }
        }
        sockets.sort();
        Ok(sockets)
    }
}

impl MessageBus for SocketBus {
    fn broadcast(&self, topic: &str, payload: Option<&str>) -> Result<usize> {
        let message = BusMessage {
            topic: topic.to_string(),
            payload: payload.map(str::to_string),
        };
        let bytes = serde_json::to_vec(&message).context("Failed to encode bus message")?;

        let sockets = self
            .subscriber_sockets(topic)
            .with_context(|| format!("Failed to list bus directory {}", self.dir.display()))?;
        if sockets.is_empty() {
            return Ok(0);
        }

        let sender = UnixDatagram::unbound().context("Failed to create bus socket")?;
        // A stalled subscriber must not hold up a launch that is about to exit.
        sender
            .set_nonblocking(true)
            .context("Failed to configure bus socket")?;
        let mut delivered = 0;
        for socket in sockets {
            match sender.send_to(&bytes, &socket) {
                Ok(_) => delivered += 1,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tracing::debug!(socket = %socket.display(), "subscriber queue full, message dropped");
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                    ) =>
                {
                    // Nobody is reading; the subscriber died without cleaning up.
                    tracing::debug!(socket = %socket.display(), "removing dead bus socket");
                    let _ = fs::remove_file(&socket);
                }
                Err(e) => {
                    tracing::warn!(socket = %socket.display(), error = %e, "bus delivery failed");
                }
            }
        }

        tracing::debug!(topic, delivered, "broadcast sent");
        Ok(delivered)
    }

    fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<Subscription> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create bus directory {}", self.dir.display()))?;

        let path = self.socket_path(topic);
        let socket = bind_socket(&path)
            .with_context(|| format!("Failed to bind bus socket {}", path.display()))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("Failed to set bus socket timeout")?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let topic_name = topic.to_string();
        thread::Builder::new()
            .name("flurry-bus".to_string())
            .spawn(move || listen(socket, &topic_name, &thread_stop, handler))
            .context("Failed to spawn bus listener")?;

        tracing::debug!(topic, socket = %path.display(), "subscribed");
        Ok(Subscription::new(move || {
            stop.store(true, Ordering::SeqCst);
            let _ = fs::remove_file(&path);
        }))
    }
}

/// Bind `path`, replacing a socket file left by a killed process whose pid
/// has since been reused.
fn bind_socket(path: &Path) -> io::Result<UnixDatagram> {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(socket = %path.display(), "removed leftover bus socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixDatagram::bind(path)
}

fn listen(socket: UnixDatagram, topic: &str, stop: &AtomicBool, handler: BusHandler) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    while !stop.load(Ordering::SeqCst) {
        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue
            }
            Err(e) => {
                tracing::warn!(error = %e, "bus listener stopped");
                break;
            }
        };
        if stop.load(Ordering::SeqCst) {
            break;
        }

        match serde_json::from_slice::<BusMessage>(&buf[..len]) {
            Ok(message) if message.topic == topic => handler(message.payload),
            Ok(message) => {
                tracing::debug!(topic = %message.topic, "ignoring message for another topic");
            }
            Err(e) => tracing::warn!(error = %e, "ignoring malformed bus message"),
        }
    }
}

type SharedHandler = Arc<dyn Fn(Option<String>) + Send + Sync + 'static>;

#[derive(Default)]
struct MemoryBusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, String, SharedHandler)>>,
    sent: Mutex<Vec<BusMessage>>,
}

/// In-process bus that also records every broadcast. Handlers run
/// synchronously on the broadcasting thread.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<MemoryBusInner>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message broadcast so far, in order.
    pub fn sent(&self) -> Vec<BusMessage> {
        self.inner
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn sent_on(&self, topic: &str) -> usize {
        self.sent().iter().filter(|m| m.topic == topic).count()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|subs| subs.iter().filter(|(_, t, _)| t == topic).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("sent", &self.sent().len())
            .finish()
    }
}

impl MessageBus for MemoryBus {
    fn broadcast(&self, topic: &str, payload: Option<&str>) -> Result<usize> {
        let message = BusMessage {
            topic: topic.to_string(),
            payload: payload.map(str::to_string),
        };
        if let Ok(mut sent) = self.inner.sent.lock() {
            sent.push(message);
        }

        // Handlers run outside the lock so they may subscribe or broadcast.
        let handlers: Vec<SharedHandler> = match self.inner.subscribers.lock() {
            Ok(subs) => subs
                .iter()
                .filter(|(_, t, _)| t == topic)
                .map(|(_, _, h)| Arc::clone(h))
                .collect(),
            Err(_) => Vec::new(),
        };
        for handler in &handlers {
            handler(payload.map(str::to_string));
        }
        Ok(handlers.len())
    }

    fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<Subscription> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .map_err(|_| anyhow::anyhow!("memory bus poisoned"))?
            .push((id, topic.to_string(), Arc::from(handler)));

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(move || {
            if let Ok(mut subs) = inner.subscribers.lock() {
                subs.retain(|(sub_id, _, _)| *sub_id != id);
            }
        }))
    }
}
