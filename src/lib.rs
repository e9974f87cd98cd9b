//! Waste-collection calendar labeling using lopdf
//!
//! This crate provides:
//! - Detection of colour-coded icons embedded as images in a PDF schedule
//! - Classification of each icon against an ordered colour legend
//! - Placement of a text label left of every icon, avoiding other icons
//! - Writing the labels back into the document with a built-in or embedded font

pub mod classifier;
pub mod collector;
pub mod font;
pub mod geometry;
pub mod images;
pub mod legend;
pub mod pipeline;
pub mod placer;
pub mod raster;
pub mod render;

pub use classifier::Classifier;
pub use collector::{collect_icons, Icon, IconFilter, Verdict};
pub use font::{LabelFont, TextMeasure, TrueTypeFont};
pub use geometry::{PageBox, Rect};
pub use legend::{ColorEntry, Legend, Rgb, SKIP_LABEL};
pub use pipeline::{label_document, plan_document, LabelOptions, PagePlan, RunStats};
pub use placer::{place_labels, LabelPlacement, PlacerConfig};

use lopdf::Document;
use std::path::Path;

/// Label a PDF file and write the result.
///
/// The output file is only written once the whole document was processed.
pub fn label_schedule<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &LabelOptions,
) -> Result<RunStats, LabelError> {
    let input = input.as_ref();
    let buffer = read_input(input)?;

    let (labeled, stats) = label_schedule_mem(&buffer, options)?;
    std::fs::write(output.as_ref(), labeled)?;

    log::info!("Wrote {}", output.as_ref().display());
    Ok(stats)
}

/// Label a PDF held in memory, returning the serialized result
pub fn label_schedule_mem(buffer: &[u8], options: &LabelOptions) -> Result<(Vec<u8>, RunStats), LabelError> {
    let mut doc = load_document_mem(buffer)?;
    let stats = label_document(&mut doc, options)?;

    let mut labeled = Vec::new();
    doc.save_to(&mut labeled)?;
    Ok((labeled, stats))
}

/// Load a document from a file, mapping access failures to their own kinds
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document, LabelError> {
    let buffer = read_input(path.as_ref())?;
    load_document_mem(&buffer)
}

/// Load a document from memory, rejecting encrypted files
pub fn load_document_mem(buffer: &[u8]) -> Result<Document, LabelError> {
    reject_encrypted(Document::load_mem(buffer)?)
}

fn reject_encrypted(doc: Document) -> Result<Document, LabelError> {
    if doc.is_encrypted() {
        return Err(LabelError::Encrypted);
    }
    Ok(doc)
}

fn read_input(path: &Path) -> Result<Vec<u8>, LabelError> {
    std::fs::read(path).map_err(|e| input_error(path, e))
}

/// Map a failure to read the input file to its error kind
fn input_error(path: &Path, e: std::io::Error) -> LabelError {
    let path = path.display().to_string();
    match e.kind() {
        std::io::ErrorKind::NotFound => LabelError::InputNotFound { path },
        std::io::ErrorKind::PermissionDenied => LabelError::InputLocked { path },
        // ERROR_SHARING_VIOLATION
        _ if cfg!(windows) && e.raw_os_error() == Some(32) => LabelError::InputLocked { path },
        _ => LabelError::Io(e),
    }
}

/// Broad failure categories surfaced to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputNotFound,
    InputLocked,
    FontUnavailable,
    Generic,
}

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },
    #[error("Input file is locked or not readable: {path}")]
    InputLocked { path: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),
    #[error("Font {path} unavailable: {reason}")]
    FontUnavailable { path: String, reason: String },
    #[error("Legend line {line}: {message}")]
    Legend { line: usize, message: String },
}

impl LabelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LabelError::InputNotFound { .. } => ErrorKind::InputNotFound,
            LabelError::InputLocked { .. } => ErrorKind::InputLocked,
            LabelError::FontUnavailable { .. } => ErrorKind::FontUnavailable,
            _ => ErrorKind::Generic,
        }
    }

    /// What the user can do about it
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::InputNotFound => Some("check the input path; it must point to an existing PDF file"),
            ErrorKind::InputLocked => {
                Some("close any program that has the file open (e.g. a PDF viewer) and check read permissions")
            }
            ErrorKind::FontUnavailable => Some("labels fall back to the built-in Helvetica font"),
            ErrorKind::Generic => None,
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InputNotFound => 2,
            ErrorKind::InputLocked => 3,
            _ => 4,
        }
    }
}

impl From<lopdf::Error> for LabelError {
    fn from(e: lopdf::Error) -> Self {
        LabelError::Parse(e.to_string())
    }
}
