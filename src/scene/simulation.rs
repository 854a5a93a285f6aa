//! The scene: sessions spawning particles onto a shared pile.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::pile::{HeightField, DEPOSIT_PEAK};

use super::color::Rgb;
use super::frame::{Frame, LandingFlash, ParticleSprite, LANDING_FLASH_DURATION};
use super::physics::{integrate, spawn_particle, Environment};
use super::session::{Session, DEFAULT_SESSION_ID};
use super::style::SessionStyle;

/// Largest time step simulated in one update, in seconds.
pub const MAX_STEP: f32 = 0.1;

/// Per-tick decay applied to the pile while winding down.
pub const MELT_FACTOR: f32 = 0.97;

/// Wind-down completes after this many seconds even if the pile remains.
pub const MELT_DURATION: f32 = 4.0;

/// Time a removed session keeps fading before it is dropped.
pub const SESSION_FADE_DURATION: f32 = 1.5;

/// Contours, opacity and edge colour are rebuilt at this interval.
pub const REFRESH_INTERVAL: f32 = 0.1;

pub const SMOOTH_INTERVAL: f32 = 0.5;

/// Fraction of the maximum pile area that may be swept before the scene
/// winds down.
pub const SWEEP_STOP_FRACTION: f32 = 0.08;

/// Particles further than this outside the field are discarded.
pub const BOUNDS_MARGIN: f32 = 60.0;

/// Average pile height at which the pile is fully faded in.
const FADE_IN_HEIGHT: f32 = 1.0;

/// Pointer movement within this distance above the surface sweeps it.
const SWEEP_REACH: f32 = 24.0;
const SWEEP_RADIUS: f32 = 30.0;
/// Height removed per world unit of pointer travel.
const SWEEP_PER_UNIT: f32 = 0.05;

const MIN_SPAWN_INTERVAL: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub width: f32,
    pub height: f32,
    /// Maximum pile height as a fraction of the scene height.
    pub max_pile_fraction: f32,
    pub column_width: f32,
    /// Constant horizontal wind added to every session's drift.
    pub wind: f32,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            max_pile_fraction: 0.25,
            column_width: 4.0,
            wind: 0.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Active,
    WindingDown,
    Completed,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("session '{id}' is already part of the scene")]
    DuplicateSession { id: String },

    #[error("scene is {state:?}; sessions can only join an active scene")]
    NotActive { state: SceneState },
}

struct Landing {
    position: Vec2,
    index: usize,
    color: Rgb,
}

/// One height field shared by a set of sessions.
pub struct SimulationScene {
    config: SceneConfig,
    field: HeightField,
    sessions: Vec<Session>,
    state: SceneState,
    rng: StdRng,
    pointer: Option<Vec2>,
    flashes: Vec<LandingFlash>,
    fill_contour: Vec<Vec2>,
    surface_contour: Vec<Vec2>,
    opacity: f32,
    pile_opacity: f32,
    edge_color: Rgb,
    refresh_timer: f32,
    smooth_timer: f32,
    wind_down_elapsed: f32,
    on_complete: Option<Box<dyn FnMut()>>,
    completion_fired: bool,
}

impl SimulationScene {
    pub fn new(config: SceneConfig) -> Self {
        let max_height = config.height * config.max_pile_fraction;
        let field = HeightField::new(config.width, max_height, config.column_width);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            field,
            sessions: Vec::new(),
            state: SceneState::Active,
            rng,
            pointer: None,
            flashes: Vec::new(),
            fill_contour: Vec::new(),
            surface_contour: Vec::new(),
            opacity: 1.0,
            pile_opacity: 0.0,
            edge_color: Rgb::NEUTRAL,
            refresh_timer: 0.0,
            smooth_timer: 0.0,
            wind_down_elapsed: 0.0,
            on_complete: None,
            completion_fired: false,
        }
    }

    /// Register the callback invoked once the scene completes.
    pub fn on_complete<F>(&mut self, callback: F)
    where
        F: FnMut() + 'static,
    {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == SceneState::Completed
    }

    pub fn height_field(&self) -> &HeightField {
        &self.field
    }

    pub fn height_field_mut(&mut self) -> &mut HeightField {
        &mut self.field
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn pile_opacity(&self) -> f32 {
        self.pile_opacity
    }

    pub fn edge_color(&self) -> Rgb {
        self.edge_color
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn particle_count(&self) -> usize {
        self.sessions.iter().map(|s| s.particles.len()).sum()
    }

    /// Add a session layer and return its palette index.
    ///
    /// Without an explicit style the palette entry for the index is used.
    pub fn add_session(
        &mut self,
        id: impl Into<String>,
        style: Option<SessionStyle>,
    ) -> Result<usize, SceneError> {
        let id = id.into();
        if self.state != SceneState::Active {
            return Err(SceneError::NotActive { state: self.state });
        }
        if self.sessions.iter().any(|s| s.id == id) {
            return Err(SceneError::DuplicateSession { id });
        }

        let index = self.next_free_index();
        let style = style.unwrap_or_else(|| SessionStyle::for_index(index));
        let neutral = id == DEFAULT_SESSION_ID && self.sessions.is_empty();
        if !neutral {
            for session in &mut self.sessions {
                session.neutral_color = false;
            }
        }

        tracing::debug!(session = %id, index, style = style.name, "session added");
        self.sessions.push(Session::new(id, index, style, neutral));
        self.edge_color = self.blend_edge_color();
        Ok(index)
    }

    /// Start fading a session out. Returns `false` for unknown or already
    /// fading sessions.
    pub fn remove_session(&mut self, id: &str) -> bool {
        match self
            .sessions
            .iter_mut()
            .find(|s| s.id == id && !s.is_fading_out())
        {
            Some(session) => {
                tracing::debug!(session = %id, "session fading out");
                session.begin_fade(SESSION_FADE_DURATION);
                true
            }
            None => false,
        }
    }

    /// Enter wind-down: spawning stops everywhere and the pile melts.
    pub fn stop(&mut self) {
        if self.state != SceneState::Active {
            return;
        }
        tracing::info!(
            average_height = self.field.average_height(),
            swept_area = self.field.swept_area(),
            "scene winding down"
        );
        self.state = SceneState::WindingDown;
        self.wind_down_elapsed = 0.0;
        for session in &mut self.sessions {
            session.spawning = false;
        }
    }

    /// Track the pointer. Moving it close to the surface sweeps the pile.
    pub fn set_pointer(&mut self, position: Option<Vec2>) {
        if let (Some(previous), Some(next)) = (self.pointer, position) {
            let travel = previous.distance(next);
            let near_surface = next.y <= self.field.height_at(next.x) + SWEEP_REACH;
            if self.state == SceneState::Active && travel > 0.0 && near_surface {
                self.field
                    .sweep(next.x, SWEEP_RADIUS, travel * SWEEP_PER_UNIT);
            }
        }
        self.pointer = position;
    }

    /// Sweep the pile directly at `x`; returns the removed area.
    pub fn sweep(&mut self, x: f32, amount: f32) -> f32 {
        if self.state != SceneState::Active {
            return 0.0;
        }
        self.field.sweep(x, SWEEP_RADIUS, amount)
    }

    /// Advance the scene by `dt` seconds, clamped to [`MAX_STEP`].
    pub fn update(&mut self, dt: f32) {
        if self.state == SceneState::Completed {
            return;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_STEP)
        } else {
            0.0
        };

        self.age_flashes(dt);

        if self.state == SceneState::WindingDown {
            self.step_wind_down(dt);
            return;
        }

        self.spawn(dt);
        self.step_particles(dt);
        self.advance_fades(dt);
        self.check_auto_stop();

        self.smooth_timer += dt;
        if self.smooth_timer >= SMOOTH_INTERVAL {
            self.smooth_timer = 0.0;
            self.field.smooth();
        }

        self.refresh_timer += dt;
        if self.refresh_timer >= REFRESH_INTERVAL {
            self.refresh_timer = 0.0;
            self.refresh();
        }
    }

    /// Snapshot for the renderer.
    pub fn frame(&self) -> Frame<'_> {
        let particles = self
            .sessions
            .iter()
            .flat_map(|session| {
                let color = session.color();
                let radius = session.style.radius;
                session.particles.iter().map(move |p| ParticleSprite {
                    position: p.position,
                    angle: p.angle,
                    radius,
                    color,
                    alpha: p.alpha,
                })
            })
            .collect();

        let column_colors = (0..self.field.column_count())
            .map(|i| self.column_color(i))
            .collect();

        Frame {
            state: self.state,
            opacity: self.opacity,
            pile_opacity: self.pile_opacity * self.opacity,
            edge_color: self.edge_color,
            max_height: self.field.max_height(),
            fill_contour: &self.fill_contour,
            surface_contour: &self.surface_contour,
            column_colors,
            particles,
            flashes: &self.flashes,
        }
    }

    fn next_free_index(&self) -> usize {
        (0..)
            .find(|i| self.sessions.iter().all(|s| s.index != *i))
            .unwrap_or(self.sessions.len())
    }

    fn spawn(&mut self, dt: f32) {
        let (width, height) = (self.config.width, self.config.height);
        for session in self.sessions.iter_mut().filter(|s| s.is_spawning()) {
            session.spawn_accumulator += dt;
            let interval = session.style.spawn_interval.max(MIN_SPAWN_INTERVAL);
            while session.spawn_accumulator >= interval {
                session.spawn_accumulator -= interval;
                let particle = spawn_particle(&session.style, &mut self.rng, width, height);
                session.particles.push(particle);
            }
        }
    }

    fn step_particles(&mut self, dt: f32) {
        let env = Environment {
            wind: self.config.wind,
            pointer: self.pointer,
        };
        let min_x = -BOUNDS_MARGIN;
        let max_x = self.config.width + BOUNDS_MARGIN;
        let field = &self.field;
        let mut landings = Vec::new();

        for session in &mut self.sessions {
            let fading = session.is_fading_out();
            let index = session.index;
            let color = session.color();
            let style = &session.style;

            session.particles.retain_mut(|particle| {
                integrate(particle, style, &env, dt);
                let x = particle.position.x;
                if !x.is_finite() || x < min_x || x > max_x {
                    return false;
                }
                let surface = field.height_at(x);
                if particle.position.y > surface {
                    return true;
                }
                if !fading {
                    landings.push(Landing {
                        position: Vec2::new(x, surface),
                        index,
                        color,
                    });
                }
                false
            });
        }

        for landing in landings {
            self.field
                .deposit(landing.position.x, DEPOSIT_PEAK, Some(landing.index));
            self.flashes.push(LandingFlash {
                position: landing.position,
                color: landing.color,
                remaining: LANDING_FLASH_DURATION,
            });
        }
    }

    fn advance_fades(&mut self, dt: f32) {
        for session in &mut self.sessions {
            if let Some(remaining) = session.fade_remaining.as_mut() {
                *remaining -= dt;
                let alpha = (*remaining / SESSION_FADE_DURATION).clamp(0.0, 1.0);
                for particle in &mut session.particles {
                    particle.alpha = alpha;
                }
            }
        }

        let before = self.sessions.len();
        self.sessions.retain(|s| !s.fade_finished());
        if self.sessions.len() == before {
            return;
        }

        tracing::debug!(
            removed = before - self.sessions.len(),
            remaining = self.sessions.len(),
            "faded sessions dropped"
        );
        if self.sessions.is_empty() {
            self.stop();
        }
    }

    fn check_auto_stop(&mut self) {
        if self.state != SceneState::Active || !self.sessions.iter().any(|s| s.is_spawning()) {
            return;
        }

        let threshold = SWEEP_STOP_FRACTION * self.field.max_swept_area();
        let capped = self.field.is_capped();
        let swept = threshold > 0.0 && self.field.swept_area() >= threshold;
        if capped || swept {
            tracing::info!(capped, swept, "pile limit reached");
            self.stop();
        }
    }

    fn step_wind_down(&mut self, dt: f32) {
        self.wind_down_elapsed += dt;
        let melted = self.field.melt(MELT_FACTOR);

        let progress = (self.wind_down_elapsed / MELT_DURATION).clamp(0.0, 1.0);
        self.opacity = 1.0 - progress;
        for session in &mut self.sessions {
            for particle in &mut session.particles {
                particle.alpha = particle.alpha.min(self.opacity);
            }
        }
        self.rebuild_contours();

        if melted || self.wind_down_elapsed >= MELT_DURATION {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.state = SceneState::Completed;
        self.opacity = 0.0;
        self.sessions.clear();
        self.flashes.clear();

        if self.completion_fired {
            return;
        }
        self.completion_fired = true;
        tracing::info!(elapsed = self.wind_down_elapsed, "scene completed");
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    fn age_flashes(&mut self, dt: f32) {
        for flash in &mut self.flashes {
            flash.remaining -= dt;
        }
        self.flashes.retain(|f| f.remaining > 0.0);
    }

    fn refresh(&mut self) {
        self.rebuild_contours();
        self.pile_opacity = (self.field.average_height() / FADE_IN_HEIGHT).clamp(0.0, 1.0);
        self.edge_color = self.blend_edge_color();
    }

    fn rebuild_contours(&mut self) {
        self.fill_contour = self.field.build_fill_contour();
        self.surface_contour = self.field.build_surface_contour();
    }

    fn blend_edge_color(&self) -> Rgb {
        Rgb::average(
            self.sessions
                .iter()
                .filter(|s| !s.is_fading_out())
                .map(Session::color),
        )
        .unwrap_or(Rgb::NEUTRAL)
    }

    fn column_color(&self, column: usize) -> Rgb {
        let mix = self.field.column_mix(column);
        Rgb::weighted_average(
            mix.into_iter()
                .map(|(index, height)| (self.color_for_index(index), height)),
        )
        .unwrap_or(self.edge_color)
    }

    fn color_for_index(&self, index: usize) -> Rgb {
        self.sessions
            .iter()
            .find(|s| s.index == index)
            .map(Session::color)
            .unwrap_or_else(|| SessionStyle::for_index(index).color)
    }
}
