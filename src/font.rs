//! Label fonts and text measurement
//!
//! Two fonts are supported: the standard-14 Helvetica (always available,
//! WinAnsi only) and a TrueType/OpenType file loaded from disk and embedded
//! as a CID font.

use crate::LabelError;
use std::path::Path;

/// Text width measurement used by the label placer
pub trait TextMeasure {
    /// Advance width of `text` at `size` points, in points
    fn text_width(&self, text: &str, size: f32) -> f32;
}

/// Helvetica advance widths (1/1000 em) for codes 32..=126
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Helvetica advance widths for codes 160..=255 (Latin-1 half of WinAnsi)
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 160-175
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 176-191
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 192-207
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 208-223
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 224-239
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 240-255
];

/// WinAnsi codes 128..=159 that map to characters outside Latin-1
const WINANSI_EXTRAS: [(char, u8, u16); 13] = [
    ('€', 0x80, 556),
    ('…', 0x85, 1000),
    ('Š', 0x8A, 667),
    ('Ž', 0x8E, 611),
    ('‘', 0x91, 222),
    ('’', 0x92, 222),
    ('“', 0x93, 333),
    ('”', 0x94, 333),
    ('•', 0x95, 350),
    ('–', 0x96, 556),
    ('—', 0x97, 1000),
    ('š', 0x9A, 500),
    ('ž', 0x9E, 500),
];

/// Byte substituted for characters WinAnsi cannot express
pub const WINANSI_REPLACEMENT: u8 = b'?';

/// WinAnsi code for `ch`, if it has one
pub fn winansi_code(ch: char) -> Option<u8> {
    match ch as u32 {
        32..=126 | 160..=255 => Some(ch as u32 as u8),
        _ => WINANSI_EXTRAS
            .iter()
            .find(|(c, _, _)| *c == ch)
            .map(|(_, code, _)| *code),
    }
}

/// Encode text to WinAnsi, replacing unsupported characters with `?`.
/// Returns the bytes and the characters that were replaced.
pub fn winansi_encode(text: &str) -> (Vec<u8>, Vec<char>) {
    let mut bytes = Vec::with_capacity(text.len());
    let mut missing = Vec::new();
    for ch in text.chars() {
        match winansi_code(ch) {
            Some(code) => bytes.push(code),
            None => {
                bytes.push(WINANSI_REPLACEMENT);
                missing.push(ch);
            }
        }
    }
    (bytes, missing)
}

fn helvetica_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_ASCII[(code - 32) as usize],
        160..=255 => HELVETICA_LATIN1[(code - 160) as usize],
        _ => WINANSI_EXTRAS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(_, _, w)| *w)
            .unwrap_or(556),
    }
}

/// A TrueType/OpenType font program held in memory
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    /// PostScript name, sanitized for use as a PDF name
    pub name: String,
    data: Vec<u8>,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: i16,
    /// `[x_min, y_min, x_max, y_max]` in font units
    pub bbox: [i16; 4],
}

impl TrueTypeFont {
    /// Load a font file. Any failure is [`LabelError::FontUnavailable`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let unavailable = |reason: String| LabelError::FontUnavailable {
            path: path.display().to_string(),
            reason,
        };
        let data = std::fs::read(path).map_err(|e| unavailable(e.to_string()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "LabelFont".to_string());
        Self::from_bytes(data, &stem).map_err(unavailable)
    }

    /// Parse a font program, using `fallback_name` when it has no
    /// PostScript name
    pub fn from_bytes(data: Vec<u8>, fallback_name: &str) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| e.to_string())?;
        if face.units_per_em() == 0 {
            return Err("font reports zero units per em".to_string());
        }

        let postscript = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string());
        let name = sanitize_name(postscript.as_deref().unwrap_or(fallback_name));

        let bb = face.global_bounding_box();
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        drop(face);

        Ok(Self {
            name,
            data,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bb.x_min, bb.y_min, bb.x_max, bb.y_max],
        })
    }

    /// Raw font program
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }

    /// Glyph ids for each character; `None` where the font has no glyph
    pub fn glyph_ids(&self, text: &str) -> Vec<(char, Option<u16>)> {
        let face = self.face();
        text.chars()
            .map(|ch| (ch, face.as_ref().and_then(|f| f.glyph_index(ch)).map(|g| g.0)))
            .collect()
    }

    /// Advance of a glyph in font units
    pub fn advance(&self, gid: u16) -> u16 {
        self.face()
            .and_then(|f| f.glyph_hor_advance(ttf_parser::GlyphId(gid)))
            .unwrap_or(0)
    }

    /// Advance of a glyph in 1/1000 em, as written to the `/W` array
    pub fn advance_1000(&self, gid: u16) -> f32 {
        self.advance(gid) as f32 * 1000.0 / self.units_per_em as f32
    }

    /// Scale a font-unit value to 1/1000 em
    pub fn to_1000(&self, value: i16) -> i64 {
        (value as f32 * 1000.0 / self.units_per_em as f32).round() as i64
    }
}

impl TextMeasure for TrueTypeFont {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let units: u32 = text
            .chars()
            .map(|ch| {
                let gid = face.glyph_index(ch).unwrap_or(ttf_parser::GlyphId(0));
                face.glyph_hor_advance(gid).unwrap_or(0) as u32
            })
            .sum();
        units as f32 * size / self.units_per_em as f32
    }
}

/// Keep only characters valid in a PDF name token
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "LabelFont".to_string()
    } else {
        cleaned
    }
}

/// The font labels are drawn with
#[derive(Debug, Clone)]
pub enum LabelFont {
    /// Standard-14 Helvetica, WinAnsi encoded. Characters outside WinAnsi
    /// are written as `?`.
    Helvetica,
    /// Embedded TrueType font, Identity-H encoded
    TrueType(TrueTypeFont),
}

impl LabelFont {
    /// Load the configured font, falling back to Helvetica on failure
    pub fn load_or_builtin(path: Option<&Path>) -> LabelFont {
        let Some(path) = path else {
            return LabelFont::Helvetica;
        };
        match TrueTypeFont::load(path) {
            Ok(font) => {
                log::info!("Using label font {} ({})", font.name, path.display());
                LabelFont::TrueType(font)
            }
            Err(e) => {
                log::warn!(
                    "{}; falling back to built-in Helvetica (characters outside WinAnsi will print as '?')",
                    e
                );
                LabelFont::Helvetica
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LabelFont::Helvetica)
    }
}

impl TextMeasure for LabelFont {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        match self {
            LabelFont::Helvetica => {
                let (bytes, _) = winansi_encode(text);
                let units: u32 = bytes.iter().map(|&b| helvetica_width(b) as u32).sum();
                units as f32 * size / 1000.0
            }
            LabelFont::TrueType(font) => font.text_width(text, size),
        }
    }
}
