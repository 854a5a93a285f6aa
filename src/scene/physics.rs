//! Particle spawning and integration.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;

use super::session::Particle;
use super::style::SessionStyle;

/// Downward acceleration until a particle reaches its fall speed.
const GRAVITY: f32 = 240.0;

/// Rate at which horizontal velocity relaxes towards drift plus wind.
const HORIZONTAL_DRAG: f32 = 1.5;

/// Sway cycles per second, in radians.
const SWAY_RATE: f32 = 2.2;

/// Random horizontal spread added at spawn.
const SPAWN_JITTER: f32 = 8.0;

/// Particles closer than this to the pointer are pushed away.
pub(super) const POINTER_RADIUS: f32 = 80.0;

const POINTER_REPULSION: f32 = 600.0;

/// Forces shared by every particle in one step.
#[derive(Debug, Clone, Copy)]
pub(super) struct Environment {
    pub wind: f32,
    pub pointer: Option<Vec2>,
}

/// New particle just above the top edge of a `width` by `height` scene.
pub(super) fn spawn_particle(
    style: &SessionStyle,
    rng: &mut StdRng,
    width: f32,
    height: f32,
) -> Particle {
    let jitter = Vec2::new(rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER), 0.0);
    let fall = -style.fall_speed * rng.gen_range(0.6..=1.0);

    Particle {
        position: Vec2::new(
            rng.gen_range(0.0..=width.max(0.0)),
            height + style.radius + rng.gen_range(0.0..=20.0),
        ),
        velocity: style.initial_velocity + jitter + Vec2::new(0.0, fall.min(0.0) * 0.5),
        angle: rng.gen_range(0.0..TAU),
        spin: spread(rng, style.spin),
        sway_phase: rng.gen_range(0.0..TAU),
        alpha: 1.0,
    }
}

/// Uniform in `-half..=half`. Custom styles may carry any sign, or garbage.
fn spread(rng: &mut StdRng, half: f32) -> f32 {
    let half = half.abs();
    if half.is_finite() && half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

/// Advance one particle by `dt` seconds.
pub(super) fn integrate(particle: &mut Particle, style: &SessionStyle, env: &Environment, dt: f32) {
    particle.velocity.y = (particle.velocity.y - GRAVITY * dt).max(-style.fall_speed);

    let target = style.drift + env.wind;
    let blend = 1.0 - (-HORIZONTAL_DRAG * dt).exp();
    particle.velocity.x += (target - particle.velocity.x) * blend;

    if let Some(pointer) = env.pointer {
        let offset = particle.position - pointer;
        let distance = offset.length();
        if distance > 1e-3 && distance < POINTER_RADIUS {
            let strength = (1.0 - distance / POINTER_RADIUS) * POINTER_REPULSION;
            particle.velocity += offset / distance * strength * dt;
        }
    }

    particle.sway_phase = (particle.sway_phase + SWAY_RATE * dt) % TAU;
    let sway = Vec2::new(particle.sway_phase.cos() * style.wobble, 0.0);

    particle.position += (particle.velocity + sway) * dt;
    particle.angle = (particle.angle + particle.spin * dt) % TAU;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::style::PALETTE;
    use rand::SeedableRng;

    fn still_air() -> Environment {
        Environment {
            wind: 0.0,
            pointer: None,
        }
    }

    #[test]
    fn test_spawn_starts_above_scene() {
        let mut rng = StdRng::seed_from_u64(7);
        for style in &PALETTE {
            let particle = spawn_particle(style, &mut rng, 300.0, 200.0);
            assert!(particle.position.y > 200.0);
            assert!((0.0..=300.0).contains(&particle.position.x));
            assert_eq!(particle.alpha, 1.0);
        }
    }

    #[test]
    fn test_spawn_accepts_negative_spin() {
        let mut rng = StdRng::seed_from_u64(7);
        let style = SessionStyle {
            spin: -2.0,
            ..PALETTE[1].clone()
        };
        for _ in 0..50 {
            let particle = spawn_particle(&style, &mut rng, 300.0, 200.0);
            assert!(particle.spin.abs() <= 2.0);
        }

        let style = SessionStyle {
            spin: f32::NAN,
            ..PALETTE[1].clone()
        };
        assert_eq!(spawn_particle(&style, &mut rng, 300.0, 200.0).spin, 0.0);
    }

    #[test]
    fn test_fall_speed_is_capped() {
        let style = PALETTE[0].clone();
        let mut particle = Particle {
            position: Vec2::new(10.0, 500.0),
            velocity: Vec2::ZERO,
            angle: 0.0,
            spin: 0.0,
            sway_phase: 0.0,
            alpha: 1.0,
        };
        for _ in 0..200 {
            integrate(&mut particle, &style, &still_air(), 1.0 / 60.0);
        }
        assert!((particle.velocity.y + style.fall_speed).abs() < 1e-3);
        assert!(particle.position.y < 500.0);
    }

    #[test]
    fn test_pointer_pushes_particles_away() {
        let style = PALETTE[0].clone();
        let mut particle = Particle {
            position: Vec2::new(110.0, 100.0),
            velocity: Vec2::ZERO,
            angle: 0.0,
            spin: 0.0,
            sway_phase: std::f32::consts::FRAC_PI_2,
            alpha: 1.0,
        };
        let env = Environment {
            wind: 0.0,
            pointer: Some(Vec2::new(100.0, 100.0)),
        };
        integrate(&mut particle, &style, &env, 0.05);
        assert!(particle.velocity.x > 0.0);
    }
}
