use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{Color, PageRelative, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupKind {
    Highlight,
    Underline,
}

impl MarkupKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Highlight => "highlight",
            Self::Underline => "underline",
        }
    }
}

/// A highlight or underline over captured text.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupAnnotation {
    pub sequence: u64,
    pub kind: MarkupKind,
    pub color: Color,
    pub source_text: String,
    pub page_number: u32,
    pub region: Rect<PageRelative>,
    pub render_scale: f64,
}

/// A signature image placed on a page. `image_png` is shared so snapshots stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePlacement {
    pub sequence: u64,
    pub image_png: Arc<[u8]>,
    pub page_number: u32,
    pub anchor: Rect<PageRelative>,
    pub render_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentPlacement {
    pub sequence: u64,
    pub text: String,
    pub page_number: u32,
    pub anchor: Rect<PageRelative>,
    pub render_scale: f64,
}

/// Result of a text-selection gesture that has not been given a markup type yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub source_text: String,
    pub page_number: u32,
    pub region: Rect<PageRelative>,
    pub render_scale: f64,
}

impl SelectionCandidate {
    pub fn new(
        source_text: impl Into<String>,
        page_number: u32,
        region: Rect<PageRelative>,
        render_scale: f64,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            page_number,
            region,
            render_scale,
        }
    }
}

/// Borrowed view over one stored entry of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationRef<'a> {
    Markup(&'a MarkupAnnotation),
    Signature(&'a SignaturePlacement),
    Comment(&'a CommentPlacement),
}

impl AnnotationRef<'_> {
    pub const fn sequence(&self) -> u64 {
        match self {
            Self::Markup(markup) => markup.sequence,
            Self::Signature(signature) => signature.sequence,
            Self::Comment(comment) => comment.sequence,
        }
    }

    pub const fn page_number(&self) -> u32 {
        match self {
            Self::Markup(markup) => markup.page_number,
            Self::Signature(signature) => signature.page_number,
            Self::Comment(comment) => comment.page_number,
        }
    }

    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Markup(markup) => markup.kind.label(),
            Self::Signature(_) => "signature",
            Self::Comment(_) => "comment",
        }
    }
}

/// Point-in-time copy of the three collections, taken when an export starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSnapshot {
    pub markups: Vec<MarkupAnnotation>,
    pub signatures: Vec<SignaturePlacement>,
    pub comments: Vec<CommentPlacement>,
}

impl AnnotationSnapshot {
    pub fn len(&self) -> usize {
        self.markups.len() + self.signatures.len() + self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in creation order.
    pub fn ordered(&self) -> Vec<AnnotationRef<'_>> {
        let mut entries = self
            .markups
            .iter()
            .map(AnnotationRef::Markup)
            .chain(self.signatures.iter().map(AnnotationRef::Signature))
            .chain(self.comments.iter().map(AnnotationRef::Comment))
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.sequence());
        entries
    }
}
