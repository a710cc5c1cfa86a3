use crate::annotations::MarkupKind;

/// Where the text-selection capture flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Arming(MarkupKind),
    Capturing(MarkupKind),
    CandidateReady(MarkupKind),
}

impl SelectionState {
    pub const fn active_tool(self) -> Option<MarkupKind> {
        match self {
            Self::Idle => None,
            Self::Arming(kind) | Self::Capturing(kind) | Self::CandidateReady(kind) => Some(kind),
        }
    }
}
