//! Conversions between the four coordinate spaces.
//!
//! Capture converts viewport coordinates into page-relative ones by
//! subtracting the rendered page container's origin. The placement editor
//! maps its fixed preview surface onto the page with independent per-axis
//! scale factors. Export flips page-relative rectangles into PDF user space,
//! whose origin is the bottom-left corner.

use crate::geometry::{PageRelative, PdfPoints, Point, Preview, Rect, Size, Viewport};

/// Offset applied below a zero-height primitive (underline baseline) when it is flipped.
pub const BASELINE_OFFSET: f64 = 2.0;

pub fn to_page_relative(point: Point<Viewport>, container: Rect<Viewport>) -> Point<PageRelative> {
    Point::new(
        (point.x - container.x).max(0.0),
        (point.y - container.y).max(0.0),
    )
}

/// Re-expresses a viewport rectangle relative to the page container.
///
/// Any part lying above or left of the container is cut off so the result
/// never has a negative origin.
pub fn rect_to_page_relative(rect: Rect<Viewport>, container: Rect<Viewport>) -> Rect<PageRelative> {
    let left = rect.x - container.x;
    let top = rect.y - container.y;
    let right = left + rect.width;
    let bottom = top + rect.height;
    let left = left.max(0.0);
    let top = top.max(0.0);
    Rect::new(left, top, right - left, bottom - top)
}

pub fn to_pdf_rect(rect: Rect<PageRelative>, page_height_points: f64) -> Rect<PdfPoints> {
    PageProjection::new(page_height_points, 1.0).rect_to_pdf(rect)
}

pub fn to_pdf_point(
    point: Point<PageRelative>,
    page_height_points: f64,
    offset: f64,
) -> Point<PdfPoints> {
    PageProjection::new(page_height_points, 1.0).point_to_pdf(point, offset)
}

/// Per-axis factors mapping preview units onto page-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors { x: 1.0, y: 1.0 };

    /// `page / preview` per axis. A degenerate dimension on either side falls back to 1:1.
    pub fn between(page: Size<PageRelative>, preview: Size<Preview>) -> Self {
        Self {
            x: guarded_ratio(page.width, preview.width),
            y: guarded_ratio(page.height, preview.height),
        }
    }

    pub fn preview_to_page(&self, rect: Rect<Preview>) -> Rect<PageRelative> {
        Rect::new(
            rect.x * self.x,
            rect.y * self.y,
            rect.width * self.x,
            rect.height * self.y,
        )
    }

    pub fn page_to_preview(&self, rect: Rect<PageRelative>) -> Rect<Preview> {
        Rect::new(
            rect.x / self.x,
            rect.y / self.y,
            rect.width / self.x,
            rect.height / self.y,
        )
    }
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if !(numerator.is_finite() && denominator.is_finite()) || numerator <= 0.0 || denominator <= 0.0 {
        return 1.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// Projection of one page's page-relative space into its PDF user space.
///
/// Page-relative coordinates are measured at `render_scale`; dividing by it
/// yields points. At scale 1.0 one rendered pixel is one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageProjection {
    page_height: f64,
    render_scale: f64,
}

impl PageProjection {
    pub fn new(page_height_points: f64, render_scale: f64) -> Self {
        Self {
            page_height: page_height_points,
            render_scale: guarded_ratio(render_scale, 1.0),
        }
    }

    pub const fn page_height(&self) -> f64 {
        self.page_height
    }

    pub const fn render_scale(&self) -> f64 {
        self.render_scale
    }

    fn unscale(&self, value: f64) -> f64 {
        value / self.render_scale
    }

    /// `pdf_y = page_height - y - height`; x does not flip.
    pub fn rect_to_pdf(&self, rect: Rect<PageRelative>) -> Rect<PdfPoints> {
        let x = self.unscale(rect.x);
        let y = self.unscale(rect.y);
        let width = self.unscale(rect.width);
        let height = self.unscale(rect.height);
        Rect::new(x, self.page_height - y - height, width, height)
    }

    /// Flips a zero-height primitive, using `offset` in place of a height.
    pub fn point_to_pdf(&self, point: Point<PageRelative>, offset: f64) -> Point<PdfPoints> {
        let x = self.unscale(point.x);
        let y = self.unscale(point.y);
        Point::new(x, self.page_height - y - offset)
    }

    pub fn rect_from_pdf(&self, rect: Rect<PdfPoints>) -> Rect<PageRelative> {
        let top = self.page_height - rect.y - rect.height;
        Rect::new(
            rect.x * self.render_scale,
            top * self.render_scale,
            rect.width * self.render_scale,
            rect.height * self.render_scale,
        )
    }
}
