//! Icon collection for one page
//!
//! Filters the page's images by geometry (width band, footer zone, optional
//! near-duplicate suppression) and classifies the survivors against the
//! legend.

use crate::classifier::Classifier;
use crate::geometry::Rect;
use crate::images::{PageScan, PlacedImage};
use crate::legend::{Legend, SKIP_LABEL};
use crate::raster::PixelGrid;

/// A classified icon on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    /// Bounding box in page space
    pub bbox: Rect,
    /// Legend label, `None` when no sampled pixel matched
    pub label: Option<String>,
}

impl Icon {
    pub fn is_skip(&self) -> bool {
        self.label.as_deref() == Some(SKIP_LABEL)
    }

    /// Label to write next to this icon, if any
    pub fn printable_label(&self) -> Option<&str> {
        match self.label.as_deref() {
            Some(SKIP_LABEL) | None => None,
            Some(label) => Some(label),
        }
    }
}

/// Geometry filters applied before classification
#[derive(Debug, Clone)]
pub struct IconFilter {
    /// Accepted bounding-box width range, inclusive
    pub size_band: (f32, f32),
    /// Images whose top edge is below this fraction of the page height are
    /// in the legend/footer zone
    pub legend_cutoff_ratio: f32,
    /// Drop images whose top-left corner lies within this distance (on both
    /// axes) of an already accepted one
    pub dedup_radius: Option<f32>,
}

impl Default for IconFilter {
    fn default() -> Self {
        Self {
            size_band: (8.0, 80.0),
            legend_cutoff_ratio: 0.9,
            dedup_radius: None,
        }
    }
}

/// Why an image was or was not collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    TooNarrow,
    TooWide,
    InFooter,
    Duplicate,
}

/// One enumerated image with its filter verdict
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub image: &'a PlacedImage,
    pub verdict: Verdict,
}

impl IconFilter {
    /// Geometry verdict for a box on a page of `page_height` points,
    /// ignoring duplicates
    pub fn check(&self, bbox: &Rect, page_height: f32) -> Verdict {
        let (min_width, max_width) = self.size_band;
        let width = bbox.width();
        if width < min_width {
            Verdict::TooNarrow
        } else if width > max_width {
            Verdict::TooWide
        } else if bbox.y0 > page_height * self.legend_cutoff_ratio {
            Verdict::InFooter
        } else {
            Verdict::Accepted
        }
    }

    fn is_duplicate(&self, bbox: &Rect, kept: &[Rect]) -> bool {
        let Some(radius) = self.dedup_radius else {
            return false;
        };
        kept.iter()
            .any(|k| (k.x0 - bbox.x0).abs() < radius && (k.y0 - bbox.y0).abs() < radius)
    }

    /// Run the filters over every image on the page, in content order
    pub fn candidates<'a>(&self, scan: &'a PageScan) -> Vec<Candidate<'a>> {
        let page_height = scan.page_box.height();
        let mut kept: Vec<Rect> = Vec::new();

        scan.images
            .iter()
            .map(|image| {
                let mut verdict = self.check(&image.bbox, page_height);
                if verdict == Verdict::Accepted {
                    if self.is_duplicate(&image.bbox, &kept) {
                        verdict = Verdict::Duplicate;
                    } else {
                        kept.push(image.bbox);
                    }
                }
                Candidate { image, verdict }
            })
            .collect()
    }
}

/// Collect and classify the icons of one page.
///
/// Output keeps content order. The same `grid` is shared by every
/// classification on the page.
pub fn collect_icons(
    scan: &PageScan,
    grid: &PixelGrid,
    filter: &IconFilter,
    classifier: &Classifier,
    legend: &Legend,
) -> Vec<Icon> {
    filter
        .candidates(scan)
        .into_iter()
        .filter(|c| {
            if c.verdict != Verdict::Accepted {
                log::debug!("Image /{} at {:?} rejected: {:?}", c.image.name, c.image.bbox, c.verdict);
            }
            c.verdict == Verdict::Accepted
        })
        .map(|c| {
            let label = classifier
                .classify(grid, &c.image.bbox, legend)
                .map(|entry| entry.label.clone());
            log::debug!("Image /{} at {:?} classified as {:?}", c.image.name, c.image.bbox, label);
            Icon {
                bbox: c.image.bbox,
                label,
            }
        })
        .collect()
}
