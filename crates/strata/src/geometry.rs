//! Small coordinate helpers shared by the layering and simulation passes.

use crate::error::{Error, Result};

/// Every location carries three components; 2D layouts keep `z == 0.0`.
pub type Vec3 = [f64; 3];

pub fn polar_to_cartesian(radius: f64, angle: f64) -> (f64, f64) {
    (radius * angle.cos(), radius * angle.sin())
}

/// Euclidean distance between two points of the same dimension.
pub fn euclidean_distance(p: &[f64], q: &[f64]) -> f64 {
    debug_assert_eq!(p.len(), q.len(), "points must share a dimension");
    p.iter()
        .zip(q)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt()
}

/// Bounds `value` to `[lo, hi]`.
///
/// Unlike [`f64::clamp`] this never panics: an empty or NaN range is reported as
/// [`Error::InvalidRange`].
pub fn clamp(value: f64, lo: f64, hi: f64) -> Result<f64> {
    if !(lo <= hi) {
        return Err(Error::InvalidRange {
            name: "clamp.lo",
            value: lo,
            expected: "lo <= hi",
        });
    }
    Ok(value.max(lo).min(hi))
}

/// Stacking coordinate of a layer. Depth 0 is exactly `+0.0` (never `-0.0`).
pub fn layer_z(separation: f64, depth: usize) -> f64 {
    if depth == 0 {
        0.0
    } else {
        -separation * depth as f64
    }
}
