use std::sync::Arc;

use super::error::{AnnotationError, AnnotationResult};
use super::model::{
    AnnotationSnapshot, CommentPlacement, MarkupAnnotation, MarkupKind, SelectionCandidate,
    SignaturePlacement,
};
use crate::geometry::{Color, PageRelative, Rect};

/// Append-only, page-scoped annotation collections for one loaded document.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    markups: Vec<MarkupAnnotation>,
    signatures: Vec<SignaturePlacement>,
    comments: Vec<CommentPlacement>,
    pending_selection: Option<SelectionCandidate>,
    next_sequence: u64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            markups: Vec::new(),
            signatures: Vec::new(),
            comments: Vec::new(),
            pending_selection: None,
            next_sequence: 1,
        }
    }

    fn allocate_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }

    fn validate_page(page_number: u32) -> AnnotationResult<()> {
        if page_number == 0 {
            return Err(AnnotationError::InvalidPageNumber(page_number));
        }
        Ok(())
    }

    /// Holds `candidate` until a markup type is chosen, replacing any earlier one.
    pub fn begin_selection(&mut self, candidate: SelectionCandidate) -> AnnotationResult<()> {
        Self::validate_page(candidate.page_number)?;
        if candidate.region.is_empty() {
            return Err(AnnotationError::EmptySelection);
        }
        tracing::debug!(
            page = candidate.page_number,
            region = %candidate.region,
            "selection candidate ready"
        );
        self.pending_selection = Some(candidate);
        Ok(())
    }

    pub fn pending_selection(&self) -> Option<&SelectionCandidate> {
        self.pending_selection.as_ref()
    }

    /// Turns the pending selection into a markup. Without one this is a no-op.
    pub fn commit_markup(&mut self, kind: MarkupKind, color: Color) -> Option<&MarkupAnnotation> {
        let candidate = self.pending_selection.take()?;
        let sequence = self.allocate_sequence();
        tracing::debug!(
            sequence,
            kind = kind.label(),
            color = %color.to_hex(),
            page = candidate.page_number,
            "markup committed"
        );
        self.markups.push(MarkupAnnotation {
            sequence,
            kind,
            color,
            source_text: candidate.source_text,
            page_number: candidate.page_number,
            region: candidate.region,
            render_scale: candidate.render_scale,
        });
        self.markups.last()
    }

    pub fn add_signature(
        &mut self,
        image_png: impl Into<Arc<[u8]>>,
        anchor: Rect<PageRelative>,
        page_number: u32,
        render_scale: f64,
    ) -> AnnotationResult<&SignaturePlacement> {
        Self::validate_page(page_number)?;
        let image_png = image_png.into();
        if image_png.is_empty() {
            return Err(AnnotationError::EmptySignature);
        }

        let sequence = self.allocate_sequence();
        tracing::debug!(sequence, page = page_number, anchor = %anchor, "signature placed");
        self.signatures.push(SignaturePlacement {
            sequence,
            image_png,
            page_number,
            anchor,
            render_scale,
        });
        Ok(&self.signatures[self.signatures.len() - 1])
    }

    pub fn add_comment(
        &mut self,
        text: impl Into<String>,
        anchor: Rect<PageRelative>,
        page_number: u32,
        render_scale: f64,
    ) -> AnnotationResult<&CommentPlacement> {
        Self::validate_page(page_number)?;
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AnnotationError::BlankComment);
        }

        let sequence = self.allocate_sequence();
        tracing::debug!(sequence, page = page_number, anchor = %anchor, "comment placed");
        self.comments.push(CommentPlacement {
            sequence,
            text,
            page_number,
            anchor,
            render_scale,
        });
        Ok(&self.comments[self.comments.len() - 1])
    }

    pub fn clear_selection(&mut self) -> bool {
        self.pending_selection.take().is_some()
    }

    /// Drops every entry and any pending selection; used when a new file is loaded.
    pub fn reset(&mut self) {
        self.markups.clear();
        self.signatures.clear();
        self.comments.clear();
        self.pending_selection = None;
        self.next_sequence = 1;
    }

    pub fn markups(&self) -> &[MarkupAnnotation] {
        &self.markups
    }

    pub fn signatures(&self) -> &[SignaturePlacement] {
        &self.signatures
    }

    pub fn comments(&self) -> &[CommentPlacement] {
        &self.comments
    }

    pub fn is_empty(&self) -> bool {
        self.markups.is_empty() && self.signatures.is_empty() && self.comments.is_empty()
    }

    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            markups: self.markups.clone(),
            signatures: self.signatures.clone(),
            comments: self.comments.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(page_number: u32) -> SelectionCandidate {
        SelectionCandidate::new(
            "selected words",
            page_number,
            Rect::new(50.0, 100.0, 120.0, 20.0),
            1.0,
        )
    }

    #[test]
    fn commit_markup_without_pending_selection_is_a_noop() {
        let mut store = AnnotationStore::new();
        assert!(store.commit_markup(MarkupKind::Highlight, Color::GOLD).is_none());
        assert!(store.markups().is_empty());
    }

    #[test]
    fn commit_markup_consumes_pending_selection() {
        let mut store = AnnotationStore::new();
        store
            .begin_selection(candidate(2))
            .expect("non-empty selection should be accepted");

        let markup = store
            .commit_markup(MarkupKind::Underline, Color::new(255, 0, 0))
            .expect("pending selection should commit")
            .clone();
        assert_eq!(markup.kind, MarkupKind::Underline);
        assert_eq!(markup.page_number, 2);
        assert_eq!(markup.source_text, "selected words");
        assert_eq!(markup.region, Rect::new(50.0, 100.0, 120.0, 20.0));
        assert!(store.pending_selection().is_none());

        assert!(store.commit_markup(MarkupKind::Highlight, Color::GOLD).is_none());
        assert_eq!(store.markups().len(), 1);
    }

    #[test]
    fn begin_selection_rejects_zero_size_regions_and_page_zero() {
        let mut store = AnnotationStore::new();
        let flat = SelectionCandidate::new("x", 1, Rect::new(5.0, 5.0, 10.0, 0.0), 1.0);
        assert_eq!(
            store.begin_selection(flat),
            Err(AnnotationError::EmptySelection)
        );
        assert_eq!(
            store.begin_selection(candidate(0)),
            Err(AnnotationError::InvalidPageNumber(0))
        );
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn whitespace_comment_leaves_collection_unchanged() {
        let mut store = AnnotationStore::new();
        let err = store
            .add_comment("  \n\t", Rect::new(0.0, 0.0, 100.0, 50.0), 1, 1.0)
            .expect_err("blank comment should be rejected");
        assert_eq!(err, AnnotationError::BlankComment);
        assert!(store.comments().is_empty());
    }

    #[test]
    fn empty_signature_image_is_rejected() {
        let mut store = AnnotationStore::new();
        let err = store
            .add_signature(Vec::new(), Rect::new(0.0, 0.0, 40.0, 20.0), 1, 1.0)
            .expect_err("empty image should be rejected");
        assert_eq!(err, AnnotationError::EmptySignature);
        assert!(store.signatures().is_empty());
    }

    #[test]
    fn sequences_record_creation_order_across_kinds() {
        let mut store = AnnotationStore::new();
        store
            .add_comment("first", Rect::new(0.0, 0.0, 100.0, 50.0), 1, 1.0)
            .expect("comment");
        store.begin_selection(candidate(1)).expect("selection");
        store.commit_markup(MarkupKind::Highlight, Color::GOLD);
        store
            .add_signature(vec![1, 2, 3], Rect::new(0.0, 0.0, 40.0, 20.0), 1, 1.0)
            .expect("signature");

        let snapshot = store.snapshot();
        let labels = snapshot
            .ordered()
            .iter()
            .map(|entry| entry.kind_label())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["comment", "highlight", "signature"]);
    }

    #[test]
    fn reset_clears_collections_and_pending_selection() {
        let mut store = AnnotationStore::new();
        store.begin_selection(candidate(1)).expect("selection");
        store.commit_markup(MarkupKind::Highlight, Color::GOLD);
        store
            .add_comment("note", Rect::new(0.0, 0.0, 100.0, 50.0), 1, 1.0)
            .expect("comment");
        store
            .add_signature(vec![9], Rect::new(0.0, 0.0, 40.0, 20.0), 1, 1.0)
            .expect("signature");
        store.begin_selection(candidate(1)).expect("selection");

        store.reset();

        assert!(store.is_empty());
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let mut store = AnnotationStore::new();
        store
            .add_comment("before", Rect::new(0.0, 0.0, 100.0, 50.0), 1, 1.0)
            .expect("comment");
        let snapshot = store.snapshot();
        store
            .add_comment("after", Rect::new(0.0, 0.0, 100.0, 50.0), 1, 1.0)
            .expect("comment");
        store.reset();

        assert_eq!(snapshot.comments.len(), 1);
        assert_eq!(snapshot.comments[0].text, "before");
    }
}
