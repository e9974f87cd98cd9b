//! Label placement with leftward collision resolution
//!
//! Each label is right-aligned a small gap to the left of its icon and
//! spans the icon's height. While the label box overlaps another icon, it
//! is moved to end just left of that icon. Labels are only checked against
//! icons unless `avoid_label_collisions` is set, so by default two labels
//! may still overlap each other.

use crate::collector::Icon;
use crate::font::TextMeasure;
use crate::geometry::Rect;

/// Placement parameters
#[derive(Debug, Clone)]
pub struct PlacerConfig {
    /// Label font size in points
    pub font_size: f32,
    /// Horizontal gap between a label and the icon or obstacle to its right
    pub gap: f32,
    /// Baseline sits this far above the icon's bottom edge
    pub baseline_offset: f32,
    /// Maximum number of shifts per label
    pub max_iterations: u32,
    /// Also treat labels placed earlier on the page as obstacles
    pub avoid_label_collisions: bool,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            font_size: 6.0,
            gap: 5.0,
            baseline_offset: 2.0,
            max_iterations: 256,
            avoid_label_collisions: false,
        }
    }
}

/// Where one label goes
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    /// Index of the icon in the page's icon list
    pub icon_index: usize,
    /// The icon's bounding box
    pub icon_bbox: Rect,
    pub text: String,
    /// Text origin (left end of the baseline), page space
    pub anchor: (f32, f32),
    /// Box the label occupies, page space
    pub text_rect: Rect,
    /// Number of leftward moves made
    pub shifts: u32,
    /// False when the iteration guard stopped the search
    pub resolved: bool,
}

/// Place one label for `icons[index]`. Pure: icons and obstacles are only
/// read.
pub fn place_label(
    icons: &[Icon],
    index: usize,
    text: &str,
    measure: &dyn TextMeasure,
    config: &PlacerConfig,
    extra_obstacles: &[Rect],
) -> LabelPlacement {
    let icon = &icons[index].bbox;
    let width = measure.text_width(text, config.font_size);
    let mut right_edge = icon.x0 - config.gap;
    let mut shifts = 0;

    let (text_rect, resolved) = loop {
        let candidate = Rect::new(right_edge - width, icon.y0, right_edge, icon.y1);
        let obstacle = icons
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .map(|(_, other)| &other.bbox)
            .chain(extra_obstacles.iter())
            .find(|bbox| bbox.intersects(&candidate));

        match obstacle {
            None => break (candidate, true),
            Some(_) if shifts >= config.max_iterations => {
                log::warn!(
                    "Label {:?} for icon at {:?} still overlaps after {} shifts; leaving it in place",
                    text,
                    icon,
                    shifts
                );
                break (candidate, false);
            }
            Some(bbox) => {
                log::debug!(
                    "Label {:?} collides with {:?}, moving right edge {} -> {}",
                    text,
                    bbox,
                    right_edge,
                    bbox.x0 - config.gap
                );
                right_edge = bbox.x0 - config.gap;
                shifts += 1;
            }
        }
    };

    LabelPlacement {
        icon_index: index,
        icon_bbox: *icon,
        text: text.to_string(),
        anchor: (text_rect.x0, icon.y1 - config.baseline_offset),
        text_rect,
        shifts,
        resolved,
    }
}

/// Place labels for every printable icon on a page, in icon order.
/// Icons without a label or labelled `SKIP` get no placement but still act
/// as obstacles.
pub fn place_labels(
    icons: &[Icon],
    measure: &dyn TextMeasure,
    config: &PlacerConfig,
) -> Vec<LabelPlacement> {
    let mut placements: Vec<LabelPlacement> = Vec::new();

    for (index, icon) in icons.iter().enumerate() {
        let Some(text) = icon.printable_label() else {
            continue;
        };
        let placed_rects: Vec<Rect> = if config.avoid_label_collisions {
            placements.iter().map(|p| p.text_rect).collect()
        } else {
            Vec::new()
        };
        placements.push(place_label(icons, index, text, measure, config, &placed_rects));
    }

    placements
}
