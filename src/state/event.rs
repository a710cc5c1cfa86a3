use crate::annotations::MarkupKind;

use super::model::SelectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    ArmTool(MarkupKind),
    DisarmTool,
    PointerReleased,
    CaptureSucceeded,
    CaptureDiscarded,
    CommitMarkup,
    PageChanged,
    DocumentLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<SelectionState>,
    pub event: SelectionEvent,
    pub to: SelectionState,
}

impl StateTransition {
    pub const fn new(
        from: Option<SelectionState>,
        event: SelectionEvent,
        to: SelectionState,
    ) -> Self {
        Self { from, event, to }
    }
}
