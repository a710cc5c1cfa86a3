//! Placement editor shared by signature and comment creation.
//!
//! The user positions and sizes a box on a fixed preview surface that is
//! decoupled from the real page size. Committing scales the box onto the
//! page per axis and appends the placement to the annotation store.

pub mod drag;
pub mod signature;

use thiserror::Error;

use crate::annotations::{AnnotationError, AnnotationStore};
use crate::geometry::{PageRelative, Point, Preview, Rect, Size};
use crate::transform::ScaleFactors;

pub use drag::{DragKind, DragSession};
pub use signature::{PenOptions, PenPoint, PenStroke, SignaturePad};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    Signature,
    Comment,
}

impl PlacementMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Comment => "comment",
        }
    }

    /// Smallest box the user may resize down to, in preview units.
    pub const fn min_size(self) -> (f64, f64) {
        match self {
            Self::Signature => (40.0, 20.0),
            Self::Comment => (100.0, 50.0),
        }
    }

    const fn initial_anchor(self) -> (f64, f64, f64, f64) {
        match self {
            Self::Signature => (100.0, 100.0, 120.0, 48.0),
            Self::Comment => (100.0, 100.0, 150.0, 60.0),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("comment text is blank")]
    BlankComment,
    #[error("signature has no strokes")]
    EmptySignature,
    #[error("failed to encode signature image: {0}")]
    SignatureEncoding(#[from] image::ImageError),
    #[error("imported signature is not a readable PNG: {0}")]
    InvalidSignatureImage(#[source] image::ImageError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

pub type PlacementResult<T> = std::result::Result<T, PlacementError>;

/// Page the placement will land on, as currently rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTarget {
    pub page_number: u32,
    pub page_size: Size<PageRelative>,
    pub render_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignatureInk {
    Pad(SignaturePad),
    /// A ready-made PNG, for hosts that import an image instead of drawing.
    Image(Vec<u8>),
}

impl SignatureInk {
    fn encode_png(&self) -> PlacementResult<Option<Vec<u8>>> {
        match self {
            Self::Pad(pad) => Ok(pad.to_trimmed_png()?),
            Self::Image(bytes) if bytes.is_empty() => Ok(None),
            Self::Image(bytes) => {
                image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
                    .map_err(PlacementError::InvalidSignatureImage)?;
                Ok(Some(bytes.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementContent {
    Signature(SignatureInk),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct PlacementEditor {
    mode: PlacementMode,
    target: PlacementTarget,
    preview_size: Size<Preview>,
    anchor: Rect<Preview>,
    content: PlacementContent,
    drag_active: bool,
}

impl PlacementEditor {
    fn new(
        mode: PlacementMode,
        target: PlacementTarget,
        preview_size: Size<Preview>,
        content: PlacementContent,
    ) -> Self {
        let (x, y, width, height) = mode.initial_anchor();
        let mut editor = Self {
            mode,
            target,
            preview_size,
            anchor: Rect::new(x, y, width, height),
            content,
            drag_active: false,
        };
        editor.set_anchor(editor.anchor);
        editor
    }

    pub fn signature(target: PlacementTarget, preview_size: Size<Preview>, pad: SignaturePad) -> Self {
        Self::new(
            PlacementMode::Signature,
            target,
            preview_size,
            PlacementContent::Signature(SignatureInk::Pad(pad)),
        )
    }

    pub fn comment(target: PlacementTarget, preview_size: Size<Preview>) -> Self {
        Self::new(
            PlacementMode::Comment,
            target,
            preview_size,
            PlacementContent::Comment(String::new()),
        )
    }

    pub const fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub const fn target(&self) -> PlacementTarget {
        self.target
    }

    pub const fn anchor(&self) -> Rect<Preview> {
        self.anchor
    }

    pub const fn preview_size(&self) -> Size<Preview> {
        self.preview_size
    }

    pub const fn is_dragging(&self) -> bool {
        self.drag_active
    }

    pub fn content(&self) -> &PlacementContent {
        &self.content
    }

    fn min_size(&self) -> (f64, f64) {
        let (min_width, min_height) = self.mode.min_size();
        (
            min_width.min(self.preview_size.width.max(0.0)),
            min_height.min(self.preview_size.height.max(0.0)),
        )
    }

    /// Moves/resizes the box, enforcing the size floor and keeping it on the preview.
    pub fn set_anchor(&mut self, proposed: Rect<Preview>) -> Rect<Preview> {
        let (min_width, min_height) = self.min_size();
        let x = if proposed.x.is_finite() { proposed.x } else { self.anchor.x };
        let y = if proposed.y.is_finite() { proposed.y } else { self.anchor.y };
        let sized = Rect::new(
            x,
            y,
            proposed.width.max(min_width),
            proposed.height.max(min_height),
        );
        self.anchor = sized.clamped_within(self.preview_size);
        self.anchor
    }

    /// Resizes from the bottom-right handle; the top-left corner stays put.
    pub fn resize_to(&mut self, width: f64, height: f64) -> Rect<Preview> {
        let (min_width, min_height) = self.min_size();
        let max_width = (self.preview_size.width - self.anchor.x).max(min_width);
        let max_height = (self.preview_size.height - self.anchor.y).max(min_height);
        let width = if width.is_finite() { width } else { min_width };
        let height = if height.is_finite() { height } else { min_height };
        self.anchor = Rect::new(
            self.anchor.x,
            self.anchor.y,
            width.clamp(min_width, max_width),
            height.clamp(min_height, max_height),
        );
        self.anchor
    }

    pub fn begin_drag(&mut self, kind: DragKind, pointer: Point<Preview>) -> DragSession<'_> {
        DragSession::begin(self, kind, pointer)
    }

    /// Replaces the comment text. Returns `false` in signature mode.
    pub fn set_comment_text(&mut self, text: impl Into<String>) -> bool {
        match &mut self.content {
            PlacementContent::Comment(current) => {
                *current = text.into();
                true
            }
            PlacementContent::Signature(_) => false,
        }
    }

    pub fn signature_pad_mut(&mut self) -> Option<&mut SignaturePad> {
        match &mut self.content {
            PlacementContent::Signature(SignatureInk::Pad(pad)) => Some(pad),
            _ => None,
        }
    }

    /// Uses an imported PNG instead of pad strokes. Returns `false` in comment mode.
    pub fn set_signature_image(&mut self, png: Vec<u8>) -> bool {
        match &mut self.content {
            PlacementContent::Signature(ink) => {
                *ink = SignatureInk::Image(png);
                true
            }
            PlacementContent::Comment(_) => false,
        }
    }

    pub fn scale_factors(&self) -> ScaleFactors {
        ScaleFactors::between(self.target.page_size, self.preview_size)
    }

    /// The preview box expressed in the target page's page-relative space.
    pub fn scaled_anchor(&self) -> Rect<PageRelative> {
        self.scale_factors().preview_to_page(self.anchor)
    }

    /// Validates the content and appends the placement to `store`.
    ///
    /// On error nothing is stored and the editor stays usable, so the host
    /// can keep the surface open for correction. Returns the new entry's
    /// sequence number.
    pub fn commit(&self, store: &mut AnnotationStore) -> PlacementResult<u64> {
        let anchor = self.scaled_anchor();
        let PlacementTarget {
            page_number,
            render_scale,
            ..
        } = self.target;

        let sequence = match &self.content {
            PlacementContent::Comment(text) => {
                if text.trim().is_empty() {
                    return Err(PlacementError::BlankComment);
                }
                store
                    .add_comment(text.clone(), anchor, page_number, render_scale)?
                    .sequence
            }
            PlacementContent::Signature(ink) => {
                let png = ink.encode_png()?.ok_or(PlacementError::EmptySignature)?;
                store
                    .add_signature(png, anchor, page_number, render_scale)?
                    .sequence
            }
        };

        tracing::info!(
            mode = self.mode.label(),
            page = page_number,
            anchor = %anchor,
            "placement committed"
        );
        Ok(sequence)
    }
}
