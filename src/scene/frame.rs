//! Plain-data snapshot handed to a renderer.

use glam::Vec2;

use super::color::Rgb;
use super::simulation::SceneState;

/// How long a landing flash stays visible, in seconds.
pub const LANDING_FLASH_DURATION: f32 = 0.35;

/// Short-lived highlight where a particle hit the pile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingFlash {
    pub position: Vec2,
    pub color: Rgb,
    pub remaining: f32,
}

impl LandingFlash {
    /// 1.0 at the moment of landing, falling to 0.0 as the flash expires.
    pub fn intensity(&self) -> f32 {
        (self.remaining / LANDING_FLASH_DURATION).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSprite {
    pub position: Vec2,
    pub angle: f32,
    pub radius: f32,
    pub color: Rgb,
    pub alpha: f32,
}

/// Everything needed to draw one frame of the scene.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub state: SceneState,
    /// Overall fade, 1.0 while active and falling to 0.0 during wind-down.
    pub opacity: f32,
    /// Fade-in of the pile itself, derived from its average height.
    pub pile_opacity: f32,
    pub edge_color: Rgb,
    /// Height at which the pile is capped; contour y values never exceed it.
    pub max_height: f32,
    pub fill_contour: &'a [Vec2],
    pub surface_contour: &'a [Vec2],
    pub column_colors: Vec<Rgb>,
    pub particles: Vec<ParticleSprite>,
    pub flashes: &'a [LandingFlash],
}
