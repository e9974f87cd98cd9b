//! Colour legend: ordered reference colours mapped to fraction labels
//!
//! Order matters. The classifier returns the first entry within tolerance,
//! so aliases for the same fraction and overlapping shades are resolved by
//! declaration order, not by nearest colour.

use crate::LabelError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Sentinel label for fractions that are recognised but never written
pub const SKIP_LABEL: &str = "SKIP";

/// An 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Sum of the three channels (0..=765)
    pub fn channel_sum(&self) -> u32 {
        self.0 as u32 + self.1 as u32 + self.2 as u32
    }

    /// Euclidean distance in RGB space
    pub fn distance(&self, other: &Rgb) -> f32 {
        let dr = self.0 as f32 - other.0 as f32;
        let dg = self.1 as f32 - other.1 as f32;
        let db = self.2 as f32 - other.2 as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// One legend row
#[derive(Debug, Clone, PartialEq)]
pub struct ColorEntry {
    pub label: String,
    pub color: Rgb,
}

impl ColorEntry {
    pub fn new(label: impl Into<String>, color: Rgb) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }

    pub fn is_skip(&self) -> bool {
        self.label == SKIP_LABEL
    }
}

/// Ordered legend table
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    entries: Vec<ColorEntry>,
}

impl Default for Legend {
    /// Palette of the municipal calendar this tool was tuned on. Two
    /// plastic shades are listed because the print run varies; bulky waste
    /// and electro-waste icons are recognised but suppressed.
    fn default() -> Self {
        Self::new(vec![
            ColorEntry::new("PAPIER", Rgb(0, 95, 170)),
            ColorEntry::new("PAPIER", Rgb(30, 125, 200)),
            ColorEntry::new("SZKŁO", Rgb(0, 150, 70)),
            ColorEntry::new("PLASTIK", Rgb(255, 205, 0)),
            ColorEntry::new("PLASTIK", Rgb(245, 180, 0)),
            ColorEntry::new("BIO", Rgb(130, 80, 40)),
            ColorEntry::new("ZMIESZANE", Rgb(60, 60, 60)),
            ColorEntry::new(SKIP_LABEL, Rgb(220, 40, 30)),
            ColorEntry::new(SKIP_LABEL, Rgb(120, 60, 150)),
        ])
    }
}

static HEX_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<label>[^=]+?)\s*=\s*#(?P<hex>[0-9A-Fa-f]{6})$").unwrap()
});

static TRIPLE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<label>[^=]+?)\s*=\s*(?P<r>\d{1,3})\s*,\s*(?P<g>\d{1,3})\s*,\s*(?P<b>\d{1,3})$")
        .unwrap()
});

impl Legend {
    pub fn new(entries: Vec<ColorEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ColorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a legend file (see [`Legend::parse`])
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a legend from text.
    ///
    /// One entry per line, either `LABEL = #RRGGBB` or `LABEL = R, G, B`.
    /// Lines starting with `#` are comments, blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        let mut entries = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(caps) = HEX_ENTRY.captures(line) {
                let hex = &caps["hex"];
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
                entries.push(ColorEntry::new(
                    caps["label"].trim(),
                    Rgb(channel(0), channel(2), channel(4)),
                ));
            } else if let Some(caps) = TRIPLE_ENTRY.captures(line) {
                let channel = |name: &str| -> Result<u8, LabelError> {
                    caps[name].parse::<u8>().map_err(|_| LabelError::Legend {
                        line: line_no,
                        message: format!("channel {} out of range 0-255", &caps[name]),
                    })
                };
                entries.push(ColorEntry::new(
                    caps["label"].trim(),
                    Rgb(channel("r")?, channel("g")?, channel("b")?),
                ));
            } else {
                return Err(LabelError::Legend {
                    line: line_no,
                    message: format!("expected `LABEL = #RRGGBB` or `LABEL = R, G, B`, got {:?}", line),
                });
            }
        }

        if entries.is_empty() {
            return Err(LabelError::Legend {
                line: 0,
                message: "legend has no entries".to_string(),
            });
        }

        Ok(Self::new(entries))
    }
}
