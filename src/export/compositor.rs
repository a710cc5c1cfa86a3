use crate::annotations::{
    AnnotationRef, AnnotationSnapshot, CommentPlacement, MarkupAnnotation, MarkupKind,
    SignaturePlacement,
};
use crate::geometry::{PdfPoints, Point, Size};
use crate::transform::{PageProjection, BASELINE_OFFSET};

use super::{ExportResult, ExportStyle, LopdfBackend, PdfBackend};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeSummary {
    pub drawn: usize,
    /// Entries whose page does not exist in the document.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPdf {
    pub bytes: Vec<u8>,
    pub summary: CompositeSummary,
}

/// Draws every entry of `snapshot` onto `backend` in creation order.
pub fn composite<B: PdfBackend + ?Sized>(
    backend: &mut B,
    snapshot: &AnnotationSnapshot,
    style: &ExportStyle,
) -> ExportResult<CompositeSummary> {
    let pages = backend.page_sizes();
    let mut summary = CompositeSummary::default();

    for entry in snapshot.ordered() {
        let Some((page_index, page_size)) = resolve_page(&pages, entry.page_number()) else {
            tracing::warn!(
                page = entry.page_number(),
                page_count = pages.len(),
                kind = entry.kind_label(),
                "annotation targets a page outside the document; skipping"
            );
            summary.skipped += 1;
            continue;
        };

        match entry {
            AnnotationRef::Markup(markup) => {
                draw_markup(backend, page_index, page_size, markup, style)?;
            }
            AnnotationRef::Signature(signature) => {
                draw_signature(backend, page_index, page_size, signature)?;
            }
            AnnotationRef::Comment(comment) => {
                draw_comment(backend, page_index, page_size, comment, style)?;
            }
        }
        summary.drawn += 1;
    }

    Ok(summary)
}

pub fn export_with<B: PdfBackend>(
    mut backend: B,
    snapshot: &AnnotationSnapshot,
    style: &ExportStyle,
) -> ExportResult<ExportedPdf> {
    let summary = composite(&mut backend, snapshot, style)?;
    let bytes = backend.save()?;
    tracing::info!(
        drawn = summary.drawn,
        skipped = summary.skipped,
        size = bytes.len(),
        "annotated PDF composed"
    );
    Ok(ExportedPdf { bytes, summary })
}

/// Parses `source` with lopdf and composes the snapshot onto it.
pub fn export_document(
    source: &[u8],
    snapshot: &AnnotationSnapshot,
    style: &ExportStyle,
) -> ExportResult<ExportedPdf> {
    export_with(LopdfBackend::load(source)?, snapshot, style)
}

fn resolve_page(pages: &[Size<PdfPoints>], page_number: u32) -> Option<(usize, Size<PdfPoints>)> {
    let index = usize::try_from(page_number).ok()?.checked_sub(1)?;
    pages.get(index).map(|size| (index, *size))
}

fn draw_markup<B: PdfBackend + ?Sized>(
    backend: &mut B,
    page_index: usize,
    page_size: Size<PdfPoints>,
    markup: &MarkupAnnotation,
    style: &ExportStyle,
) -> ExportResult<()> {
    let projection = PageProjection::new(page_size.height, markup.render_scale);
    match markup.kind {
        MarkupKind::Highlight => backend.draw_rectangle(
            page_index,
            projection.rect_to_pdf(markup.region),
            markup.color,
            style.highlight_opacity,
        ),
        MarkupKind::Underline => {
            let region = markup.region;
            let start = projection.point_to_pdf(Point::new(region.x, region.bottom()), BASELINE_OFFSET);
            let end =
                projection.point_to_pdf(Point::new(region.right(), region.bottom()), BASELINE_OFFSET);
            backend.draw_line(page_index, start, end, style.underline_thickness, markup.color)
        }
    }
}

fn draw_signature<B: PdfBackend + ?Sized>(
    backend: &mut B,
    page_index: usize,
    page_size: Size<PdfPoints>,
    signature: &SignaturePlacement,
) -> ExportResult<()> {
    let projection = PageProjection::new(page_size.height, signature.render_scale);
    let image = backend.embed_png(&signature.image_png)?;
    backend.draw_image(page_index, &image, projection.rect_to_pdf(signature.anchor))
}

fn draw_comment<B: PdfBackend + ?Sized>(
    backend: &mut B,
    page_index: usize,
    page_size: Size<PdfPoints>,
    comment: &CommentPlacement,
    style: &ExportStyle,
) -> ExportResult<()> {
    let projection = PageProjection::new(page_size.height, comment.render_scale);
    // Baseline one em below the anchor's top edge keeps the glyphs inside the box.
    let baseline = projection.point_to_pdf(comment.anchor.origin(), style.comment_font_size);
    backend.draw_text(
        page_index,
        &comment.text,
        baseline,
        style.comment_font_size,
        style.comment_color,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::annotations::{AnnotationStore, SelectionCandidate};
    use crate::export::ExportError;
    use crate::geometry::{Color, PageRelative, Rect};

    #[derive(Debug, Clone, PartialEq)]
    enum DrawCall {
        Rectangle {
            page: usize,
            rect: Rect<PdfPoints>,
            color: [f32; 3],
            opacity: f32,
        },
        Line {
            page: usize,
            start: Point<PdfPoints>,
            end: Point<PdfPoints>,
            thickness: f64,
        },
        Image {
            page: usize,
            handle: usize,
            rect: Rect<PdfPoints>,
        },
        Text {
            page: usize,
            text: String,
            baseline: Point<PdfPoints>,
            font_size: f64,
        },
    }

    #[derive(Debug, Default)]
    struct RecordingBackend {
        pages: Vec<Size<PdfPoints>>,
        calls: Vec<DrawCall>,
        embedded: Vec<Vec<u8>>,
        reject_images: bool,
    }

    impl RecordingBackend {
        fn letter(page_count: usize) -> Self {
            Self {
                pages: vec![Size::new(612.0, 792.0); page_count],
                ..Self::default()
            }
        }
    }

    impl PdfBackend for RecordingBackend {
        type Image = usize;

        fn page_sizes(&self) -> Vec<Size<PdfPoints>> {
            self.pages.clone()
        }

        fn draw_rectangle(
            &mut self,
            page_index: usize,
            rect: Rect<PdfPoints>,
            color: Color,
            opacity: f32,
        ) -> ExportResult<()> {
            self.calls.push(DrawCall::Rectangle {
                page: page_index,
                rect,
                color: color.unit_rgb(),
                opacity,
            });
            Ok(())
        }

        fn draw_line(
            &mut self,
            page_index: usize,
            start: Point<PdfPoints>,
            end: Point<PdfPoints>,
            thickness: f64,
            _color: Color,
        ) -> ExportResult<()> {
            self.calls.push(DrawCall::Line {
                page: page_index,
                start,
                end,
                thickness,
            });
            Ok(())
        }

        fn embed_png(&mut self, png: &[u8]) -> ExportResult<usize> {
            if self.reject_images {
                return Err(ExportError::Serialize("image rejected".into()));
            }
            self.embedded.push(png.to_vec());
            Ok(self.embedded.len() - 1)
        }

        fn draw_image(
            &mut self,
            page_index: usize,
            image: &usize,
            rect: Rect<PdfPoints>,
        ) -> ExportResult<()> {
            self.calls.push(DrawCall::Image {
                page: page_index,
                handle: *image,
                rect,
            });
            Ok(())
        }

        fn draw_text(
            &mut self,
            page_index: usize,
            text: &str,
            baseline: Point<PdfPoints>,
            font_size: f64,
            _color: Color,
        ) -> ExportResult<()> {
            self.calls.push(DrawCall::Text {
                page: page_index,
                text: text.to_string(),
                baseline,
                font_size,
            });
            Ok(())
        }

        fn save(self) -> ExportResult<Vec<u8>> {
            Ok(format!("{} calls", self.calls.len()).into_bytes())
        }
    }

    fn highlight(store: &mut AnnotationStore, page: u32, region: Rect<PageRelative>) {
        store
            .begin_selection(SelectionCandidate::new("text", page, region, 1.0))
            .expect("selection");
        store
            .commit_markup(MarkupKind::Highlight, Color::GOLD)
            .expect("markup");
    }

    #[test]
    fn highlight_is_flipped_into_pdf_space() {
        let mut store = AnnotationStore::new();
        highlight(&mut store, 1, Rect::new(50.0, 100.0, 120.0, 20.0));

        let mut backend = RecordingBackend::letter(1);
        let summary = composite(&mut backend, &store.snapshot(), &ExportStyle::default())
            .expect("composite");

        assert_eq!(summary, CompositeSummary { drawn: 1, skipped: 0 });
        let DrawCall::Rectangle {
            page,
            rect,
            color,
            opacity,
        } = &backend.calls[0]
        else {
            panic!("expected a rectangle, got {:?}", backend.calls[0]);
        };
        assert_eq!(*page, 0);
        assert_eq!(*rect, Rect::new(50.0, 672.0, 120.0, 20.0));
        assert_eq!(color[0], 1.0);
        assert!((color[1] - 0.843).abs() < 1e-3);
        assert_eq!(color[2], 0.0);
        assert_eq!(*opacity, 0.5);
    }

    #[test]
    fn render_scale_is_divided_out() {
        let mut store = AnnotationStore::new();
        store
            .begin_selection(SelectionCandidate::new(
                "zoomed",
                1,
                Rect::new(100.0, 200.0, 240.0, 40.0),
                2.0,
            ))
            .expect("selection");
        store.commit_markup(MarkupKind::Highlight, Color::GOLD);

        let mut backend = RecordingBackend::letter(1);
        composite(&mut backend, &store.snapshot(), &ExportStyle::default()).expect("composite");
        assert!(matches!(
            &backend.calls[0],
            DrawCall::Rectangle { rect, .. } if *rect == Rect::new(50.0, 672.0, 120.0, 20.0)
        ));
    }

    #[test]
    fn underline_runs_along_bottom_edge_below_baseline() {
        let mut store = AnnotationStore::new();
        store
            .begin_selection(SelectionCandidate::new(
                "line",
                1,
                Rect::new(50.0, 100.0, 120.0, 20.0),
                1.0,
            ))
            .expect("selection");
        store.commit_markup(MarkupKind::Underline, Color::new(255, 0, 0));

        let mut backend = RecordingBackend::letter(1);
        composite(&mut backend, &store.snapshot(), &ExportStyle::default()).expect("composite");
        assert_eq!(
            backend.calls,
            vec![DrawCall::Line {
                page: 0,
                start: Point::new(50.0, 670.0),
                end: Point::new(170.0, 670.0),
                thickness: 2.0,
            }]
        );
    }

    #[test]
    fn missing_pages_are_skipped_without_failing() {
        let mut store = AnnotationStore::new();
        highlight(&mut store, 5, Rect::new(10.0, 10.0, 10.0, 10.0));
        highlight(&mut store, 2, Rect::new(10.0, 10.0, 10.0, 10.0));

        let mut backend = RecordingBackend::letter(3);
        let summary = composite(&mut backend, &store.snapshot(), &ExportStyle::default())
            .expect("composite");

        assert_eq!(summary, CompositeSummary { drawn: 1, skipped: 1 });
        assert!(matches!(backend.calls.as_slice(), [DrawCall::Rectangle { page: 1, .. }]));
    }

    #[test]
    fn entries_are_drawn_in_creation_order_across_kinds() {
        let mut store = AnnotationStore::new();
        store
            .add_comment("first", Rect::new(10.0, 20.0, 150.0, 60.0), 1, 1.0)
            .expect("comment");
        store
            .add_signature(vec![1_u8, 2, 3], Rect::new(60.0, 80.0, 160.0, 160.0), 1, 1.0)
            .expect("signature");
        highlight(&mut store, 1, Rect::new(50.0, 100.0, 120.0, 20.0));

        let mut backend = RecordingBackend::letter(1);
        composite(&mut backend, &store.snapshot(), &ExportStyle::default()).expect("composite");

        assert_eq!(
            backend.calls[0],
            DrawCall::Text {
                page: 0,
                text: "first".into(),
                baseline: Point::new(10.0, 760.0),
                font_size: 12.0,
            }
        );
        assert_eq!(
            backend.calls[1],
            DrawCall::Image {
                page: 0,
                handle: 0,
                rect: Rect::new(60.0, 552.0, 160.0, 160.0),
            }
        );
        assert!(matches!(backend.calls[2], DrawCall::Rectangle { .. }));
        assert_eq!(backend.embedded, vec![vec![1_u8, 2, 3]]);
    }

    #[test]
    fn backend_failure_aborts_the_export() {
        let mut store = AnnotationStore::new();
        store
            .add_signature(Arc::<[u8]>::from(vec![9_u8]), Rect::new(0.0, 0.0, 40.0, 20.0), 1, 1.0)
            .expect("signature");

        let backend = RecordingBackend {
            reject_images: true,
            ..RecordingBackend::letter(1)
        };
        assert!(export_with(backend, &store.snapshot(), &ExportStyle::default()).is_err());
    }

    #[test]
    fn empty_snapshot_still_saves_a_copy() {
        let exported = export_with(
            RecordingBackend::letter(2),
            &AnnotationSnapshot::default(),
            &ExportStyle::default(),
        )
        .expect("export");
        assert_eq!(exported.summary, CompositeSummary::default());
        assert_eq!(exported.bytes, b"0 calls".to_vec());
    }
}
