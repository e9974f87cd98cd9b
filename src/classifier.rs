//! Legend-based icon classification
//!
//! Samples the rasterized page inside an icon's bounding box on a coarse
//! grid and returns the first legend entry within tolerance of a sampled
//! pixel. Scanning is pixel-major: the first non-background pixel that
//! matches anything decides, and within that pixel the legend is tried in
//! declaration order. This is first-match, not nearest-colour.

use crate::geometry::Rect;
use crate::legend::{ColorEntry, Legend};
use crate::raster::PixelGrid;

/// Classifier thresholds
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Maximum Euclidean RGB distance (exclusive)
    pub tolerance: f32,
    /// Pixels whose channel sum exceeds this are background
    pub background_sum: u32,
    /// Sample every `stride`-th pixel in each axis
    pub stride: u32,
    /// Pixels skipped inside each edge of the box
    pub inset: u32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            tolerance: 45.0,
            background_sum: 700,
            stride: 2,
            inset: 2,
        }
    }
}

impl Classifier {
    /// Classify the icon occupying `bbox` (page space)
    pub fn classify<'a>(
        &self,
        grid: &PixelGrid,
        bbox: &Rect,
        legend: &'a Legend,
    ) -> Option<&'a ColorEntry> {
        let scale = grid.scale();
        let inset = self.inset as i64;
        let x0 = (bbox.x0 * scale).floor() as i64 + inset;
        let y0 = (bbox.y0 * scale).floor() as i64 + inset;
        let x1 = (bbox.x1 * scale).floor() as i64 - inset;
        let y1 = (bbox.y1 * scale).floor() as i64 - inset;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let stride = self.stride.max(1) as usize;
        for y in (y0..y1).step_by(stride) {
            for x in (x0..x1).step_by(stride) {
                let Some(pixel) = grid.sample(x, y) else {
                    continue;
                };
                if pixel.channel_sum() > self.background_sum {
                    continue;
                }
                if let Some(entry) = legend
                    .entries()
                    .iter()
                    .find(|entry| entry.color.distance(&pixel) < self.tolerance)
                {
                    return Some(entry);
                }
            }
        }

        None
    }
}
