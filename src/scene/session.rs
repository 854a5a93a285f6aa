//! One producer's layer within the shared scene.

use glam::Vec2;

use super::color::Rgb;
use super::style::SessionStyle;

/// Reserved id of the first session, registered by the owning process.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Lifecycle of a session. Removal from the scene follows `FadingOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Spawning,
    FadingOut,
}

/// A single airborne particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub spin: f32,
    pub sway_phase: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(super) id: String,
    pub(super) index: usize,
    pub(super) style: SessionStyle,
    pub(super) particles: Vec<Particle>,
    pub(super) spawning: bool,
    pub(super) spawn_accumulator: f32,
    /// Seconds left before a fading session is dropped.
    pub(super) fade_remaining: Option<f32>,
    /// Set for the default session until a second session joins.
    pub(super) neutral_color: bool,
}

impl Session {
    pub(super) fn new(id: String, index: usize, style: SessionStyle, neutral_color: bool) -> Self {
        Self {
            id,
            index,
            style,
            particles: Vec::new(),
            spawning: true,
            spawn_accumulator: 0.0,
            fade_remaining: None,
            neutral_color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn style(&self) -> &SessionStyle {
        &self.style
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn phase(&self) -> SessionPhase {
        if self.fade_remaining.is_some() {
            SessionPhase::FadingOut
        } else {
            SessionPhase::Spawning
        }
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning && self.fade_remaining.is_none()
    }

    pub fn is_fading_out(&self) -> bool {
        self.fade_remaining.is_some()
    }

    /// Colour used for this session's particles and its share of the pile.
    pub fn color(&self) -> Rgb {
        if self.neutral_color {
            Rgb::NEUTRAL
        } else {
            self.style.color
        }
    }

    pub(super) fn begin_fade(&mut self, duration: f32) {
        self.spawning = false;
        if self.fade_remaining.is_none() {
            self.fade_remaining = Some(duration);
        }
    }

    pub(super) fn fade_finished(&self) -> bool {
        matches!(self.fade_remaining, Some(remaining) if remaining <= 0.0)
    }
}
