//! Contour extraction for the renderer.

use glam::Vec2;

use super::HeightField;

impl HeightField {
    /// Closed outline of the whole pile: baseline, profile, back to baseline.
    pub fn build_fill_contour(&self) -> Vec<Vec2> {
        self.build_fill_contour_between(0.0, self.width)
    }

    /// Open polyline along the pile surface across the whole field.
    pub fn build_surface_contour(&self) -> Vec<Vec2> {
        self.build_surface_contour_between(0.0, self.width)
    }

    /// Filled outline restricted to `[x_start, x_end]`.
    ///
    /// The polygon starts and ends on the baseline, so it closes implicitly.
    /// Returns an empty contour when the clamped range is empty or inverted.
    pub fn build_fill_contour_between(&self, x_start: f32, x_end: f32) -> Vec<Vec2> {
        let surface = self.build_surface_contour_between(x_start, x_end);
        let (Some(first), Some(last)) = (surface.first().copied(), surface.last().copied()) else {
            return Vec::new();
        };

        let mut polygon = Vec::with_capacity(surface.len() + 2);
        polygon.push(Vec2::new(first.x, 0.0));
        polygon.extend(surface);
        polygon.push(Vec2::new(last.x, 0.0));
        polygon
    }

    /// Surface polyline restricted to `[x_start, x_end]`.
    pub fn build_surface_contour_between(&self, x_start: f32, x_end: f32) -> Vec<Vec2> {
        if x_start.is_nan() || x_end.is_nan() || x_start > x_end {
            return Vec::new();
        }
        let start = x_start.clamp(0.0, self.width);
        let end = x_end.clamp(0.0, self.width);
        if end <= start {
            return Vec::new();
        }

        let last_column = self.heights.len() - 1;
        let first = (start / self.column_width).ceil() as usize;
        let last = ((end / self.column_width).floor() as usize).min(last_column);

        let mut points = Vec::with_capacity(last.saturating_sub(first) + 3);
        points.push(Vec2::new(start, self.height_at(start)));
        if first <= last {
            for i in first..=last {
                let x = self.column_x(i);
                if x > start && x < end {
                    points.push(Vec2::new(x, self.heights[i]));
                }
            }
        }
        points.push(Vec2::new(end, self.height_at(end)));
        points
    }
}
