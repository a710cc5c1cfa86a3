//! Text-selection capture against a page's text layer.
//!
//! The host owns the rendered page and its native selection; it exposes them
//! through [`TextLayer`]. A finished gesture is turned into a
//! [`SelectionCandidate`] whose region is relative to the page container.

use crate::annotations::SelectionCandidate;
use crate::geometry::{Rect, Viewport};
use crate::transform::rect_to_page_relative;

/// The selected range as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelection {
    pub text: String,
    /// Client rects of the range, one per line box.
    pub client_rects: Vec<Rect<Viewport>>,
}

impl RangeSelection {
    pub fn new(text: impl Into<String>, client_rects: Vec<Rect<Viewport>>) -> Self {
        Self {
            text: text.into(),
            client_rects,
        }
    }

    /// Union of the range's client rects, ignoring collapsed ones. When every
    /// rect is collapsed the first one is returned as is.
    pub fn bounding_rect(&self) -> Option<Rect<Viewport>> {
        let first = *self.client_rects.first()?;
        let mut visible = self.client_rects.iter().filter(|rect| !rect.is_empty());
        let Some(seed) = visible.next() else {
            return Some(first);
        };
        Some(visible.fold(*seed, |union, rect| union.union(rect)))
    }
}

pub trait TextLayer {
    /// The rendered page container's bounding box.
    fn container_rect(&self) -> Rect<Viewport>;
    /// The current native selection inside this layer, if any.
    fn selection(&self) -> Option<RangeSelection>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The text layer is not mounted yet (page still rendering).
    NoSurface,
    /// Nothing, or only whitespace, is selected.
    NoSelection,
    /// The selection has no area once measured.
    EmptyRegion,
    Captured(SelectionCandidate),
}

impl CaptureOutcome {
    pub fn into_candidate(self) -> Option<SelectionCandidate> {
        match self {
            Self::Captured(candidate) => Some(candidate),
            _ => None,
        }
    }
}

pub fn capture_selection_with<L: TextLayer + ?Sized>(
    layer: Option<&L>,
    page_number: u32,
    render_scale: f64,
) -> CaptureOutcome {
    let Some(layer) = layer else {
        tracing::debug!(page = page_number, "text layer not mounted; ignoring gesture");
        return CaptureOutcome::NoSurface;
    };

    let Some(selection) = layer
        .selection()
        .filter(|selection| !selection.text.trim().is_empty())
    else {
        tracing::debug!(page = page_number, "no text selected");
        return CaptureOutcome::NoSelection;
    };

    let Some(bounds) = selection.bounding_rect() else {
        return CaptureOutcome::EmptyRegion;
    };
    let region = rect_to_page_relative(bounds, layer.container_rect());
    if region.is_empty() {
        tracing::debug!(page = page_number, %region, "selection has no area");
        return CaptureOutcome::EmptyRegion;
    }

    CaptureOutcome::Captured(SelectionCandidate::new(
        selection.text,
        page_number,
        region,
        render_scale,
    ))
}

/// A text layer whose container and selection are fixed up front.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTextLayer {
    pub container: Rect<Viewport>,
    pub selection: Option<RangeSelection>,
}

impl StaticTextLayer {
    pub fn new(container: Rect<Viewport>, selection: Option<RangeSelection>) -> Self {
        Self {
            container,
            selection,
        }
    }
}

impl TextLayer for StaticTextLayer {
    fn container_rect(&self) -> Rect<Viewport> {
        self.container
    }

    fn selection(&self) -> Option<RangeSelection> {
        self.selection.clone()
    }
}
