//! Single-owner coordination across flurry processes.
//!
//! The first process to create the lock file owns the scene. Later launches
//! broadcast an escalation and exit; the owner turns each escalation into a new
//! session. Signal, bus and watcher threads only ever send
//! [`CoordinatorEvent`]s; the scene, session registry and lock are touched on
//! the loop thread alone.

pub mod bus;
pub mod lock;

mod core;
mod lifecycle;
mod signals;


pub use bus::{BusMessage, MemoryBus, MessageBus, SocketBus, Subscription, ESCALATION_TOPIC};
pub use core::{
    default_state_dir, Coordinator, CoordinatorConfig, CoordinatorEvent, CoordinatorState,
    ExitReason, OwnerStatus,
};
pub use lock::{LockError, OwnerLock};
