//! Accumulated snow pile stored as a 1-D height field.
//!
//! The field is a row of evenly spaced columns. Landed flakes splat height
//! into a small neighbourhood, the pointer sweeps it away, and the wind-down
//! phase melts everything back to zero.

mod contour;
mod field;


pub use field::{HeightField, DEPOSIT_PEAK, MELT_EPSILON, SPLAT_RADIUS};
