//! Per-session visual and physics parameters.

use glam::Vec2;

use super::color::Rgb;

/// Immutable look and motion of one session layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStyle {
    pub name: &'static str,
    pub color: Rgb,
    /// Sprite radius in world units.
    pub radius: f32,
    /// Seconds between spawned particles.
    pub spawn_interval: f32,
    /// Terminal fall speed in world units per second.
    pub fall_speed: f32,
    /// Horizontal velocity the particles settle towards.
    pub drift: f32,
    /// Velocity bias applied at spawn time.
    pub initial_velocity: Vec2,
    /// Amplitude of the side-to-side sway.
    pub wobble: f32,
    /// Upper bound of the angular velocity, radians per second.
    pub spin: f32,
}

/// Styles cycled through by session index.
pub const PALETTE: [SessionStyle; 4] = [
    SessionStyle {
        name: "flake",
        color: Rgb::new(0.80, 0.88, 1.00),
        radius: 3.0,
        spawn_interval: 0.03,
        fall_speed: 70.0,
        drift: 0.0,
        initial_velocity: Vec2::new(0.0, -20.0),
        wobble: 18.0,
        spin: 1.5,
    },
    SessionStyle {
        name: "ember",
        color: Rgb::new(1.00, 0.55, 0.18),
        radius: 2.0,
        spawn_interval: 0.05,
        fall_speed: 55.0,
        drift: 12.0,
        initial_velocity: Vec2::new(10.0, -10.0),
        wobble: 10.0,
        spin: 3.0,
    },
    SessionStyle {
        name: "leaf",
        color: Rgb::new(0.35, 0.80, 0.40),
        radius: 4.0,
        spawn_interval: 0.08,
        fall_speed: 45.0,
        drift: -8.0,
        initial_velocity: Vec2::new(-6.0, -15.0),
        wobble: 30.0,
        spin: 2.5,
    },
    SessionStyle {
        name: "petal",
        color: Rgb::new(1.00, 0.62, 0.80),
        radius: 3.5,
        spawn_interval: 0.06,
        fall_speed: 50.0,
        drift: 5.0,
        initial_velocity: Vec2::new(4.0, -12.0),
        wobble: 24.0,
        spin: 2.0,
    },
];

impl SessionStyle {
    /// Palette entry for a session index, wrapping around the palette.
    pub fn for_index(index: usize) -> SessionStyle {
        PALETTE[index % PALETTE.len()].clone()
    }
}
