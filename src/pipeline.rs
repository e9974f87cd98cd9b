//! Whole-document labeling run
//!
//! Every page goes through rasterize, collect, classify, place and commit in
//! that order. Pages are independent and processed in document order.

use crate::classifier::Classifier;
use crate::collector::{collect_icons, Icon, IconFilter};
use crate::font::{LabelFont, TextMeasure};
use crate::geometry::PageBox;
use crate::images::{decode_page_images, scan_page};
use crate::legend::Legend;
use crate::placer::{place_labels, LabelPlacement, PlacerConfig};
use crate::raster::rasterize;
use crate::render::{LabelStyle, LabelWriter};
use crate::LabelError;
use lopdf::{Document, ObjectId};
use std::path::PathBuf;

/// Hints logged when a whole document yields no labels
pub const NO_MATCH_HINTS: [&str; 2] = [
    "the icons may be vector drawings rather than embedded images",
    "the printed colours may have drifted from the legend; try a custom --legend",
];

/// Configuration for a labeling run
#[derive(Debug, Clone)]
pub struct LabelOptions {
    pub legend: Legend,
    /// Accepted icon width range in points, inclusive
    pub size_band: (f32, f32),
    /// Icons whose top edge lies below this fraction of the page height are
    /// ignored
    pub legend_cutoff_ratio: f32,
    /// Maximum RGB distance for a legend match (exclusive)
    pub color_tolerance: f32,
    /// Pixels with a channel sum above this are background
    pub background_sum: u32,
    pub sample_stride: u32,
    pub sample_inset: u32,
    /// Raster resolution in pixels per point
    pub raster_scale: f32,
    /// Suppress icons whose top-left corner is within this radius of an
    /// already accepted one
    pub dedup_radius: Option<f32>,
    /// TrueType/OpenType font for the labels; Helvetica when unset
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub text_color: (f32, f32, f32),
    pub label_gap: f32,
    pub baseline_offset: f32,
    pub max_placement_iterations: u32,
    pub avoid_label_collisions: bool,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            legend: Legend::default(),
            size_band: (8.0, 80.0),
            legend_cutoff_ratio: 0.9,
            color_tolerance: 45.0,
            background_sum: 700,
            sample_stride: 2,
            sample_inset: 2,
            raster_scale: 1.0,
            dedup_radius: None,
            font_path: None,
            font_size: 6.0,
            text_color: (0.2, 0.2, 0.2),
            label_gap: 5.0,
            baseline_offset: 2.0,
            max_placement_iterations: 256,
            avoid_label_collisions: false,
        }
    }
}

impl LabelOptions {
    pub fn classifier(&self) -> Classifier {
        Classifier {
            tolerance: self.color_tolerance,
            background_sum: self.background_sum,
            stride: self.sample_stride,
            inset: self.sample_inset,
        }
    }

    pub fn icon_filter(&self) -> IconFilter {
        IconFilter {
            size_band: self.size_band,
            legend_cutoff_ratio: self.legend_cutoff_ratio,
            dedup_radius: self.dedup_radius,
        }
    }

    pub fn placer_config(&self) -> PlacerConfig {
        PlacerConfig {
            font_size: self.font_size,
            gap: self.label_gap,
            baseline_offset: self.baseline_offset,
            max_iterations: self.max_placement_iterations,
            avoid_label_collisions: self.avoid_label_collisions,
        }
    }

    pub fn label_style(&self) -> LabelStyle {
        LabelStyle {
            font_size: self.font_size,
            color: self.text_color,
        }
    }
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages_processed: usize,
    /// Every image placement found on any page
    pub images_seen: usize,
    /// Images that passed the geometry filters
    pub icons_detected: usize,
    pub labels_placed: usize,
    /// Icons classified as `SKIP`
    pub skipped: usize,
    /// Icons no legend entry matched
    pub unmatched: usize,
    /// Labels left overlapping an icon by the iteration guard
    pub unresolved_collisions: usize,
}

impl RunStats {
    /// Icons that matched a legend entry, `SKIP` included
    pub fn icons_classified(&self) -> usize {
        self.icons_detected - self.unmatched
    }

    /// True when at least one icon matched the legend
    pub fn has_matches(&self) -> bool {
        self.icons_classified() > 0
    }

    fn add_page(&mut self, plan: &PagePlan) {
        self.pages_processed += 1;
        self.images_seen += plan.images_seen;
        self.icons_detected += plan.icons.len();
        self.skipped += plan.icons.iter().filter(|i| i.is_skip()).count();
        self.unmatched += plan.icons.iter().filter(|i| i.label.is_none()).count();
        self.unresolved_collisions += plan.placements.iter().filter(|p| !p.resolved).count();
    }
}

/// Read-only outcome of processing one page
#[derive(Debug, Clone)]
pub struct PagePlan {
    /// 1-based page number
    pub page_number: u32,
    pub page_id: ObjectId,
    pub page_box: PageBox,
    pub images_seen: usize,
    pub icons: Vec<Icon>,
    pub placements: Vec<LabelPlacement>,
}

/// Rasterize, collect, classify and place for one page
pub fn plan_page(
    doc: &Document,
    page_number: u32,
    page_id: ObjectId,
    options: &LabelOptions,
    measure: &dyn TextMeasure,
) -> Result<PagePlan, LabelError> {
    let scan = scan_page(doc, page_id)?;
    let decoded = decode_page_images(doc, &scan);
    let grid = rasterize(&scan, &decoded, options.raster_scale);

    let icons = collect_icons(
        &scan,
        &grid,
        &options.icon_filter(),
        &options.classifier(),
        &options.legend,
    );
    let placements = place_labels(&icons, measure, &options.placer_config());

    log::debug!(
        "Page {}: {} images, {} icons, {} labels",
        page_number,
        scan.images.len(),
        icons.len(),
        placements.len()
    );

    Ok(PagePlan {
        page_number,
        page_id,
        page_box: scan.page_box,
        images_seen: scan.images.len(),
        icons,
        placements,
    })
}

/// Plan every page without modifying the document
pub fn plan_document(doc: &Document, options: &LabelOptions) -> Result<Vec<PagePlan>, LabelError> {
    let font = LabelFont::load_or_builtin(options.font_path.as_deref());
    doc.get_pages()
        .into_iter()
        .map(|(page_number, page_id)| plan_page(doc, page_number, page_id, options, &font))
        .collect()
}

/// Label every page of `doc` in place.
///
/// A document without any matching icon is not an error: a warning is
/// logged and the document is left without labels.
pub fn label_document(doc: &mut Document, options: &LabelOptions) -> Result<RunStats, LabelError> {
    let font = LabelFont::load_or_builtin(options.font_path.as_deref());
    let mut writer = LabelWriter::new(font, options.label_style());
    let mut stats = RunStats::default();

    let pages = doc.get_pages();
    log::info!("Labeling {} pages with {} legend entries", pages.len(), options.legend.len());

    for (page_number, page_id) in pages {
        let plan = plan_page(doc, page_number, page_id, options, writer.font())?;
        stats.add_page(&plan);
        writer.write_page(doc, page_id, &plan.page_box, &plan.placements)?;
    }

    stats.labels_placed = writer.labels_written();
    writer.finish(doc)?;

    log::info!(
        "Processed {} pages: {} icons, {} labels, {} skipped, {} unmatched",
        stats.pages_processed,
        stats.icons_detected,
        stats.labels_placed,
        stats.skipped,
        stats.unmatched
    );
    if !stats.has_matches() {
        log::warn!("No icons matched the legend; saving the document without labels");
        for hint in NO_MATCH_HINTS {
            log::warn!("  possible cause: {}", hint);
        }
    } else if stats.labels_placed == 0 {
        log::info!("All {} matched icons are marked SKIP; no labels placed", stats.skipped);
    }

    Ok(stats)
}
