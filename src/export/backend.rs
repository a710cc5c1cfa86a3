use crate::geometry::{Color, PdfPoints, Point, Rect, Size};

use super::ExportResult;

/// The PDF construction collaborator the compositor draws through.
///
/// Page indices are zero-based; coordinates are PDF points with the origin
/// at the page's bottom-left corner.
pub trait PdfBackend {
    type Image;

    fn page_sizes(&self) -> Vec<Size<PdfPoints>>;

    fn draw_rectangle(
        &mut self,
        page_index: usize,
        rect: Rect<PdfPoints>,
        color: Color,
        opacity: f32,
    ) -> ExportResult<()>;

    fn draw_line(
        &mut self,
        page_index: usize,
        start: Point<PdfPoints>,
        end: Point<PdfPoints>,
        thickness: f64,
        color: Color,
    ) -> ExportResult<()>;

    fn embed_png(&mut self, png: &[u8]) -> ExportResult<Self::Image>;

    fn draw_image(
        &mut self,
        page_index: usize,
        image: &Self::Image,
        rect: Rect<PdfPoints>,
    ) -> ExportResult<()>;

    fn draw_text(
        &mut self,
        page_index: usize,
        text: &str,
        baseline: Point<PdfPoints>,
        font_size: f64,
        color: Color,
    ) -> ExportResult<()>;

    fn save(self) -> ExportResult<Vec<u8>>;
}
