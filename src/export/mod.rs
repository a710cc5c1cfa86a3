//! Writes the stored annotations into a copy of the source PDF.

mod backend;
mod compositor;
mod pdf;
mod worker;

use thiserror::Error;

use crate::config::AppConfig;
use crate::geometry::Color;

pub use backend::PdfBackend;
pub use compositor::{composite, export_document, export_with, CompositeSummary, ExportedPdf};
pub use pdf::{EmbeddedImage, LopdfBackend};
#[cfg(test)]
pub(crate) use pdf::fixtures;
pub use worker::{spawn_export, ExportHandle, ExportJob, ExportOutcome, WorkerPoll};

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("an export is already in progress")]
    Busy,
    #[error("failed to parse PDF: {0}")]
    Parse(#[source] lopdf::Error),
    #[error("PDF structure error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("page index {page_index} is outside the document ({page_count} pages)")]
    PageOutOfRange { page_index: usize, page_count: usize },
    #[error("failed to decode signature image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to serialize PDF: {0}")]
    Serialize(String),
    #[error("export worker stopped before delivering a result")]
    WorkerDisconnected,
}

/// Drawing parameters that are not stored on the annotations themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportStyle {
    pub highlight_opacity: f32,
    pub underline_thickness: f64,
    pub comment_font_size: f64,
    pub comment_color: Color,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            highlight_opacity: 0.5,
            underline_thickness: 2.0,
            comment_font_size: 12.0,
            comment_color: Color::BLACK,
        }
    }
}

impl From<&AppConfig> for ExportStyle {
    fn from(config: &AppConfig) -> Self {
        Self {
            highlight_opacity: config.highlight_opacity,
            underline_thickness: config.underline_thickness,
            comment_font_size: config.comment_font_size,
            comment_color: Color::BLACK,
        }
    }
}
