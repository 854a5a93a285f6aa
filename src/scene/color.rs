//! Linear RGB colour math.
//!
//! Blending happens on plain linear components. Conversion to an output
//! colour space is deferred to [`Rgb::to_srgb8`], which only the renderer
//! calls.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    /// Baseline colour used before any session colour applies.
    pub const NEUTRAL: Rgb = Rgb::new(0.92, 0.94, 0.97);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Plain mean of the given colours, `None` for an empty input.
    pub fn average<I>(colors: I) -> Option<Rgb>
    where
        I: IntoIterator<Item = Rgb>,
    {
        Self::weighted_average(colors.into_iter().map(|c| (c, 1.0)))
    }

    /// Weighted mean; pairs with a non-positive weight are ignored.
    pub fn weighted_average<I>(colors: I) -> Option<Rgb>
    where
        I: IntoIterator<Item = (Rgb, f32)>,
    {
        let mut total = 0.0;
        let mut sum = Rgb::new(0.0, 0.0, 0.0);
        for (color, weight) in colors {
            if weight <= 0.0 {
                continue;
            }
            sum.r += color.r * weight;
            sum.g += color.g * weight;
            sum.b += color.b * weight;
            total += weight;
        }

        (total > 0.0).then(|| Rgb::new(sum.r / total, sum.g / total, sum.b / total))
    }

    /// Encode as 8-bit sRGB.
    pub fn to_srgb8(self) -> [u8; 3] {
        [encode(self.r), encode(self.g), encode(self.b)]
    }
}

fn encode(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let srgb = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round() as u8
}
