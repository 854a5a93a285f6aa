//! Column storage and the deposit/sweep/melt/smooth operations.

use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;
use std::ops::RangeInclusive;

/// Height added at the centre of a single landed flake.
pub const DEPOSIT_PEAK: f32 = 1.5;

/// Horizontal reach of a deposit splat, in world units.
pub const SPLAT_RADIUS: f32 = 10.0;

/// Heights below this are snapped to zero while melting.
pub const MELT_EPSILON: f32 = 0.01;

/// Accumulation surface made of evenly spaced columns.
///
/// Column `i` is sampled at `x = i * column_width`. Every height stays within
/// `[0, max_height]`. Per-session contribution rows track how much of each
/// column was deposited by which session so the renderer can blend colours.
#[derive(Debug, Clone)]
pub struct HeightField {
    pub(super) heights: Vec<f32>,
    pub(super) column_width: f32,
    pub(super) width: f32,
    max_height: f32,
    contributions: BTreeMap<usize, Vec<f32>>,
    swept_area: f32,
}

impl HeightField {
    /// Create an empty field covering `width` world units.
    ///
    /// The column count is `ceil(width / column_width)`, never less than one.
    pub fn new(width: f32, max_height: f32, column_width: f32) -> Self {
        let column_width = if column_width.is_finite() && column_width > 0.0 {
            column_width
        } else {
            1.0
        };
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        let columns = ((width / column_width).ceil() as usize).max(1);

        Self {
            heights: vec![0.0; columns],
            column_width,
            width,
            max_height: max_height.max(0.0),
            contributions: BTreeMap::new(),
            swept_area: 0.0,
        }
    }

    pub fn column_count(&self) -> usize {
        self.heights.len()
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Total area removed by sweeps since the field was created.
    pub fn swept_area(&self) -> f32 {
        self.swept_area
    }

    /// Area of a pile filled to `max_height` across the whole width.
    pub fn max_swept_area(&self) -> f32 {
        self.width * self.max_height
    }

    pub fn column_x(&self, index: usize) -> f32 {
        index as f32 * self.column_width
    }

    pub fn total_height(&self) -> f32 {
        self.heights.iter().sum()
    }

    pub fn average_height(&self) -> f32 {
        self.total_height() / self.heights.len() as f32
    }

    /// A single full column caps the whole field.
    pub fn is_capped(&self) -> bool {
        self.heights.iter().any(|h| *h >= self.max_height)
    }

    /// Splat `amount` of height around `x` with a cosine falloff.
    ///
    /// Does nothing once the field is capped. When `session_index` is given
    /// the applied delta is also booked against that session.
    ///
    /// # Arguments
    /// * `x` - Landing position; non-finite or off-field positions are ignored
    /// * `amount` - Peak height added at `x`
    /// * `session_index` - Palette slot of the session that deposited
    pub fn deposit(&mut self, x: f32, amount: f32, session_index: Option<usize>) {
        if self.is_capped() || !x.is_finite() || amount <= 0.0 {
            return;
        }
        let Some(span) = self.column_span(x, SPLAT_RADIUS) else {
            return;
        };

        let columns = self.heights.len();
        for i in span {
            let distance = (self.column_x(i) - x).abs();
            let splat = amount * falloff(distance, SPLAT_RADIUS);
            if splat <= 0.0 {
                continue;
            }

            let old = self.heights[i];
            let new = (old + splat).min(self.max_height);
            let delta = new - old;
            self.heights[i] = new;

            if let (Some(index), true) = (session_index, delta > 0.0) {
                let row = self
                    .contributions
                    .entry(index)
                    .or_insert_with(|| vec![0.0; columns]);
                row[i] += delta;
            }
        }
    }

    /// Lower columns within `radius` of `x`, returning the removed area.
    ///
    /// Heights floor at zero. The removed area accumulates into
    /// [`swept_area`](Self::swept_area), which therefore never decreases.
    pub fn sweep(&mut self, x: f32, radius: f32, amount: f32) -> f32 {
        if !x.is_finite() || radius <= 0.0 || amount <= 0.0 {
            return 0.0;
        }
        let Some(span) = self.column_span(x, radius) else {
            return 0.0;
        };

        let mut removed = 0.0;
        for i in span {
            let distance = (self.column_x(i) - x).abs();
            let cut = amount * falloff(distance, radius);
            let old = self.heights[i];
            let new = (old - cut).max(0.0);
            if new >= old {
                continue;
            }

            self.heights[i] = new;
            let ratio = if old > 0.0 { new / old } else { 0.0 };
            for row in self.contributions.values_mut() {
                row[i] *= ratio;
            }
            removed += old - new;
        }

        let area = removed * self.column_width;
        self.swept_area += area;
        area
    }

    /// Decay every column by `factor` and report whether the pile is gone.
    pub fn melt(&mut self, factor: f32) -> bool {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };

        for h in &mut self.heights {
            *h = decay(*h, factor);
        }
        for row in self.contributions.values_mut() {
            for c in row.iter_mut() {
                *c = decay(*c, factor);
            }
        }
        self.contributions
            .retain(|_, row| row.iter().any(|c| *c > 0.0));

        self.heights.iter().all(|h| *h == 0.0)
    }

    /// Three-tap moving average, edge columns held.
    pub fn smooth(&mut self) {
        if self.heights.len() < 3 {
            return;
        }
        self.heights = three_tap(&self.heights);
        for row in self.contributions.values_mut() {
            *row = three_tap(row);
        }
    }

    /// Interpolated height at `x`; positions off the field use the edge column.
    pub fn height_at(&self, x: f32) -> f32 {
        let last = self.heights.len() - 1;
        if x.is_nan() {
            return self.heights[0];
        }

        let position = (x / self.column_width).clamp(0.0, last as f32);
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(last);
        let t = position - lower as f32;

        self.heights[lower] + (self.heights[upper] - self.heights[lower]) * t
    }

    /// Share of column `index` contributed by each session, as
    /// `(session_index, height)` pairs with non-zero height.
    pub fn column_mix(&self, index: usize) -> Vec<(usize, f32)> {
        self.contributions
            .iter()
            .filter_map(|(session, row)| {
                row.get(index)
                    .copied()
                    .filter(|c| *c > 0.0)
                    .map(|c| (*session, c))
            })
            .collect()
    }

    /// Sum of all session contributions booked against column `index`.
    pub fn contributed_height(&self, index: usize) -> f32 {
        self.column_mix(index).iter().map(|(_, c)| c).sum()
    }

    /// Columns whose sample point lies within `radius` of `x`, clamped to the
    /// field. `None` when the range falls entirely off the field.
    pub(super) fn column_span(&self, x: f32, radius: f32) -> Option<RangeInclusive<usize>> {
        let last = (self.heights.len() - 1) as f32;
        let first = ((x - radius) / self.column_width).ceil().max(0.0);
        let end = ((x + radius) / self.column_width).floor().min(last);

        if first.is_nan() || end.is_nan() || first > end {
            return None;
        }
        Some(first as usize..=end as usize)
    }
}

fn falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance > radius {
        return 0.0;
    }
    (distance / radius * FRAC_PI_2).cos().max(0.0)
}

fn decay(value: f32, factor: f32) -> f32 {
    let decayed = value * factor;
    if decayed < MELT_EPSILON {
        0.0
    } else {
        decayed
    }
}

fn three_tap(values: &[f32]) -> Vec<f32> {
    let mut out = values.to_vec();
    for i in 1..values.len() - 1 {
        out[i] = (values[i - 1] + values[i] + values[i + 1]) / 3.0;
    }
    out
}
