//! Page rasterization
//!
//! A page is rasterized once into a [`PixelGrid`] by painting its decoded
//! images over a white background. Vector content is not rendered; the
//! icons this tool looks for are embedded raster images.

use crate::geometry::{self, Rect};
use crate::images::{DecodedImage, PageScan};
use crate::legend::Rgb;
use lopdf::ObjectId;
use std::collections::HashMap;

const WHITE: Rgb = Rgb(255, 255, 255);

/// Read-only pixel lookup over a rasterized page
#[derive(Debug, Clone)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    /// Pixels per PDF point
    scale: f32,
    pixels: Vec<Rgb>,
}

impl PixelGrid {
    /// A white grid of `width` x `height` pixels
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
            pixels: vec![WHITE; width as usize * height as usize],
        }
    }

    /// A white grid covering a page of the given size in points
    pub fn for_page(page_width: f32, page_height: f32, scale: f32) -> Self {
        let width = (page_width * scale).ceil().max(0.0) as u32;
        let height = (page_height * scale).ceil().max(0.0) as u32;
        Self::new(width, height, scale)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pixel at `(x, y)`, `None` outside the grid
    pub fn sample(&self, x: i64, y: i64) -> Option<Rgb> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = color;
        }
    }

    /// Pixel range covered by a page-space rectangle, clamped to the grid.
    /// Returns `(x0, y0, x1, y1)` with exclusive upper bounds.
    pub fn pixel_span(&self, rect: &Rect) -> (u32, u32, u32, u32) {
        let clamp_x = |v: f32| (v * self.scale).clamp(0.0, self.width as f32);
        let clamp_y = |v: f32| (v * self.scale).clamp(0.0, self.height as f32);
        (
            clamp_x(rect.x0).floor() as u32,
            clamp_y(rect.y0).floor() as u32,
            clamp_x(rect.x1).ceil() as u32,
            clamp_y(rect.y1).ceil() as u32,
        )
    }

    /// Paint a solid page-space rectangle
    pub fn fill_rect(&mut self, rect: &Rect, color: Rgb) {
        let (x0, y0, x1, y1) = self.pixel_span(rect);
        for y in y0..y1 {
            for x in x0..x1 {
                self.set(x, y, color);
            }
        }
    }
}

/// Rasterize a scanned page by painting its images in content order
pub fn rasterize(scan: &PageScan, decoded: &HashMap<ObjectId, DecodedImage>, scale: f32) -> PixelGrid {
    let page_box = scan.page_box;
    let mut grid = PixelGrid::for_page(page_box.width(), page_box.height(), scale);

    for placed in &scan.images {
        let Some(image) = decoded.get(&placed.object_id) else {
            continue;
        };
        let Some(inverse) = geometry::invert(&placed.ctm) else {
            continue;
        };

        let (x0, y0, x1, y1) = grid.pixel_span(&placed.bbox);
        for py in y0..y1 {
            for px in x0..x1 {
                // Pixel centre, page space -> user space -> image space
                let (ux, uy) = page_box.to_user_point(
                    (px as f32 + 0.5) / scale,
                    (py as f32 + 0.5) / scale,
                );
                let (s, t) = geometry::apply(&inverse, ux, uy);
                if !(0.0..1.0).contains(&s) || !(0.0..1.0).contains(&t) {
                    continue;
                }
                // Image row 0 is the top edge of the unit square
                let col = ((s * image.width as f32) as u32).min(image.width - 1);
                let row = (((1.0 - t) * image.height as f32) as u32).min(image.height - 1);
                if let Some(color) = image.sample(col, row) {
                    grid.set(px, py, color);
                }
            }
        }
    }

    grid
}
