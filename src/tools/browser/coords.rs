//! Conversion between the model's normalized coordinate space and viewport pixels
//!
//! The model reasons in a fixed `[0, 999]` grid regardless of the real
//! viewport. No clamping happens here; out-of-range input yields out-of-range
//! output and callers decide what to do with it.

use serde::{Deserialize, Serialize};

/// Extent of the normalized coordinate space
pub const NORMALIZED_EXTENT: f64 = 1000.0;

/// Model-space coordinate to pixels: `round(v / 1000 * extent)`
pub fn denormalize(value: i64, extent: u32) -> i64 {
    (value as f64 / NORMALIZED_EXTENT * extent as f64).round() as i64
}

/// Pixels to model-space coordinate: `round(p / extent * 1000)`
pub fn normalize(pixel: i64, extent: u32) -> i64 {
    if extent == 0 {
        return 0;
    }
    (pixel as f64 / extent as f64 * NORMALIZED_EXTENT).round() as i64
}

/// Size of the page's visible area in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Map a normalized `(x, y)` point into this viewport
    pub fn to_pixels(&self, x: i64, y: i64) -> (i64, i64) {
        (denormalize(x, self.width), denormalize(y, self.height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1440, 900)
    }
}
