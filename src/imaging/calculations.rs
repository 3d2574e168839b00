//! Pure calculation functions for the resize pipeline.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Quality;

/// Requests below this edge length always get the minimum quality.
pub const SMALL_THUMBNAIL_EDGE: u32 = 300;

/// Pick an encoder quality for a requested edge length.
///
/// Small thumbnails (below [`SMALL_THUMBNAIL_EDGE`]) get `min`. Requests at or
/// beyond `bound` get `max`. In between, quality is interpolated linearly and
/// truncated, so it never decreases as `requested` grows.
///
/// # Arguments
/// * `requested` - Requested edge length in pixels
/// * `bound` - Effective upper bound, `min(requested, original edge)` in the pipeline
///
/// # Examples
/// ```
/// # use artwork_resize::imaging::{Quality, quality_by_size};
/// let (min, max) = (Quality::new(50), Quality::new(90));
/// assert_eq!(quality_by_size(250, 1000, min, max), min);
/// assert_eq!(quality_by_size(600, 600, min, max), max);
/// assert_eq!(quality_by_size(650, 1000, min, max), Quality::new(70));
/// ```
pub fn quality_by_size(requested: u32, bound: u32, min: Quality, max: Quality) -> Quality {
    if requested < SMALL_THUMBNAIL_EDGE {
        return min;
    }
    if requested >= bound {
        return max;
    }

    // requested >= 300 and bound > requested, so the denominator is positive.
    let top = f64::from(requested - SMALL_THUMBNAIL_EDGE);
    let bottom = f64::from(bound - SMALL_THUMBNAIL_EDGE);
    let ratio = top / bottom;

    let min_q = f64::from(min.value());
    let max_q = f64::from(max.value());
    Quality::new((min_q + ratio * (max_q - min_q)) as u32)
}

/// Offset that centers an image of `inner` dimensions on a square canvas.
///
/// Both centers are rounded down before subtracting, so an odd inner edge on
/// an even canvas leans one pixel towards the bottom/right. Offsets are signed
/// because an inner image can exceed the canvas.
pub fn center_offset(canvas: u32, inner: (u32, u32)) -> (i64, i64) {
    let (w, h) = inner;
    let mid = i64::from(canvas / 2);
    (mid - i64::from(w / 2), mid - i64::from(h / 2))
}

/// Butteraugli distance for a JPEG XL encode at the given quality.
///
/// Follows libjxl's quality-to-distance mapping: 100 is mathematically
/// lossless (distance 0), 90 is visually lossless (distance 1.0).
pub fn jxl_distance(quality: Quality) -> f32 {
    let q = quality.value() as f32;
    if q >= 100.0 {
        0.0
    } else if q >= 30.0 {
        0.1 + (100.0 - q) * 0.09
    } else {
        53.0 / 3000.0 * q * q - 23.0 / 20.0 * q + 25.0
    }
}
