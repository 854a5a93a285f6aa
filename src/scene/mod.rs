//! Particle scene driving the shared pile.
//!
//! A [`SimulationScene`] owns one [`HeightField`](crate::pile::HeightField)
//! and any number of [`Session`] layers. Each update spawns particles, moves
//! them, deposits the ones that land, and decides when the scene should wind
//! down. Rendering is left to whoever consumes [`Frame`].

mod color;
mod frame;
mod physics;
mod session;
mod simulation;
mod style;


pub use color::Rgb;
pub use frame::{Frame, LandingFlash, ParticleSprite, LANDING_FLASH_DURATION};
pub use session::{Particle, Session, SessionPhase, DEFAULT_SESSION_ID};
pub use simulation::{
    SceneConfig, SceneError, SceneState, SimulationScene, BOUNDS_MARGIN, MAX_STEP,
    MELT_DURATION, MELT_FACTOR, REFRESH_INTERVAL, SESSION_FADE_DURATION, SMOOTH_INTERVAL,
    SWEEP_STOP_FRACTION,
};
pub use style::{SessionStyle, PALETTE};
