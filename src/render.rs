//! Frame consumers.
//!
//! The scene produces plain [`Frame`] data; anything that draws it implements
//! [`FrameSink`]. Two sinks ship with flurry: a headless one that only counts
//! frames, and a one-line terminal view of the pile.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::scene::{Frame, Rgb};

pub trait FrameSink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards frames, logging a summary once a second.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    frames: u64,
    last_report: Option<Instant>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for HeadlessSink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.frames += 1;
        let due = self
            .last_report
            .map_or(true, |at| at.elapsed() >= Duration::from_secs(1));
        if due {
            self.last_report = Some(Instant::now());
            tracing::trace!(
                frames = self.frames,
                state = ?frame.state,
                particles = frame.particles.len(),
                opacity = frame.opacity,
                "frame"
            );
        }
        Ok(())
    }
}

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Redraw interval for the terminal view.
const TERMINAL_REFRESH: Duration = Duration::from_millis(100);

/// Draws the pile as a single line of block characters, redrawn in place.
pub struct TerminalSink<W: Write> {
    out: W,
    width: usize,
    last_draw: Option<Instant>,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(1),
            last_draw: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One block character per output cell, sampled from the surface contour.
pub fn render_line(frame: &Frame<'_>, cells: usize) -> Vec<(char, Rgb)> {
    let surface = frame.surface_contour;
    if surface.is_empty() || cells == 0 {
        return Vec::new();
    }

    (0..cells)
        .map(|cell| {
            let index = cell * surface.len() / cells;
            let height = surface[index].y;
            let fraction = if frame.max_height > 0.0 {
                (height / frame.max_height).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let level = (fraction * (LEVELS.len() - 1) as f32).round() as usize;
            let color = frame
                .column_colors
                .get(index)
                .copied()
                .unwrap_or(frame.edge_color);
            (LEVELS[level], color)
        })
        .collect()
}

impl<W: Write> FrameSink for TerminalSink<W> {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        if let Some(at) = self.last_draw {
            if at.elapsed() < TERMINAL_REFRESH {
                return Ok(());
            }
        }
        self.last_draw = Some(Instant::now());

        let mut line = String::from("\r");
        for (glyph, color) in render_line(frame, self.width) {
            let [r, g, b] = color.lerp(Rgb::new(0.0, 0.0, 0.0), 1.0 - frame.opacity).to_srgb8();
            line.push_str(&glyph.to_string().truecolor(r, g, b).to_string());
        }
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
            .context("Failed to draw frame")
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.out).context("Failed to finish terminal output")
    }
}
