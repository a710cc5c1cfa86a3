use crate::geometry::{Point, Preview, Rect};

use super::PlacementEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

/// One pointer gesture on the placement box.
///
/// The editor counts as dragging for exactly the lifetime of this value.
/// `finish` keeps the last geometry; dropping the session any other way
/// (pointer cancel, early return) restores the box it started from.
#[derive(Debug)]
pub struct DragSession<'a> {
    editor: &'a mut PlacementEditor,
    kind: DragKind,
    start: Point<Preview>,
    origin: Rect<Preview>,
    finished: bool,
}

impl<'a> DragSession<'a> {
    pub(super) fn begin(editor: &'a mut PlacementEditor, kind: DragKind, start: Point<Preview>) -> Self {
        let origin = editor.anchor();
        editor.drag_active = true;
        tracing::debug!(?kind, mode = editor.mode().label(), "placement drag started");
        Self {
            editor,
            kind,
            start,
            origin,
            finished: false,
        }
    }

    pub const fn kind(&self) -> DragKind {
        self.kind
    }

    /// Applies the pointer position and returns the constrained box.
    pub fn update(&mut self, pointer: Point<Preview>) -> Rect<Preview> {
        let dx = pointer.x - self.start.x;
        let dy = pointer.y - self.start.y;
        match self.kind {
            DragKind::Move => self.editor.set_anchor(self.origin.translated(dx, dy)),
            DragKind::Resize => self
                .editor
                .resize_to(self.origin.width + dx, self.origin.height + dy),
        }
    }

    pub fn finish(mut self) -> Rect<Preview> {
        self.finished = true;
        self.editor.anchor()
    }

    pub fn cancel(self) {}
}

impl Drop for DragSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(kind = ?self.kind, "placement drag aborted; restoring box");
            self.editor.anchor = self.origin;
        }
        self.editor.drag_active = false;
    }
}
