//! Integration tests for flurry
//!
//! These exercise the public API across module boundaries: ownership between
//! coordinators, exit-time lock cleanup, the socket bus, file watching, the
//! scene lifecycle and the binary itself.

pub mod binary;
pub mod exit_cleanup;
pub mod helpers;
pub mod ownership;
pub mod scene_lifecycle;
pub mod signals;
pub mod socket_bus;
pub mod watcher_growth;
