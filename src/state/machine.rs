use super::error::{StateError, StateResult};
use super::{SelectionEvent, SelectionState, StateTransition};

/// Most recent transitions kept for diagnostics.
const HISTORY_LIMIT: usize = 64;

/// Selection capture flow: `Idle -> Arming -> Capturing -> CandidateReady -> Idle`.
#[derive(Debug)]
pub struct SelectionMachine {
    state: SelectionState,
    transition_history: Vec<StateTransition>,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self {
            state: SelectionState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn can_transition(&self, event: SelectionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SelectionEvent) -> Option<SelectionState> {
        use SelectionEvent::*;
        use SelectionState::*;
        match (self.state, event) {
            (Idle, ArmTool(kind)) => Some(Arming(kind)),
            (Arming(current), ArmTool(kind)) if current == kind => Some(Idle),
            (Arming(_), ArmTool(kind)) => Some(Arming(kind)),
            (CandidateReady(current), ArmTool(kind)) if current == kind => Some(Idle),
            (CandidateReady(_), ArmTool(kind)) => Some(CandidateReady(kind)),
            (Arming(kind), PointerReleased) => Some(Capturing(kind)),
            (CandidateReady(kind), PointerReleased) => Some(Capturing(kind)),
            (Capturing(kind), CaptureSucceeded) => Some(CandidateReady(kind)),
            (Capturing(kind), CaptureDiscarded) => Some(Arming(kind)),
            (CandidateReady(_), CommitMarkup) => Some(Idle),
            (_, DisarmTool) | (_, PageChanged) | (_, DocumentLoaded) => Some(Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SelectionEvent) -> StateResult<SelectionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request selection transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::debug!(from = ?from, event = ?event, "selection transition not applicable");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        if event == SelectionEvent::DocumentLoaded {
            self.transition_history.clear();
        } else if self.transition_history.len() >= HISTORY_LIMIT {
            self.transition_history.remove(0);
        }
        self.transition_history.push(record);

        Ok(self.state)
    }
}

#[cfg(test)]
impl SelectionMachine {
    fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SelectionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SelectionState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::MarkupKind;

    #[test]
    fn can_transition_tracks_valid_and_invalid_events() {
        let mut machine = SelectionMachine::new();
        assert!(machine.can_transition(SelectionEvent::ArmTool(MarkupKind::Highlight)));
        assert!(!machine.can_transition(SelectionEvent::PointerReleased));
        assert!(!machine.can_transition(SelectionEvent::CommitMarkup));

        let _ = machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("idle -> arming should transition");

        assert!(machine.can_transition(SelectionEvent::PointerReleased));
        assert!(!machine.can_transition(SelectionEvent::CommitMarkup));
    }

    #[test]
    fn full_capture_flow_records_ordered_history() {
        let mut machine = SelectionMachine::new();
        for event in [
            SelectionEvent::ArmTool(MarkupKind::Underline),
            SelectionEvent::PointerReleased,
            SelectionEvent::CaptureSucceeded,
            SelectionEvent::CommitMarkup,
        ] {
            machine.transition(event).expect("flow event should apply");
        }

        assert_eq!(machine.state(), SelectionState::Idle);
        assert_eq!(machine.history().len(), 4);
        assert_eq!(
            machine.history()[1],
            StateTransition::new(
                Some(SelectionState::Arming(MarkupKind::Underline)),
                SelectionEvent::PointerReleased,
                SelectionState::Capturing(MarkupKind::Underline)
            )
        );
        assert_eq!(
            machine.history()[2].to,
            SelectionState::CandidateReady(MarkupKind::Underline)
        );
    }

    #[test]
    fn empty_capture_returns_to_arming() {
        let mut machine = SelectionMachine::new();
        machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("arm");
        machine
            .transition(SelectionEvent::PointerReleased)
            .expect("release");
        let state = machine
            .transition(SelectionEvent::CaptureDiscarded)
            .expect("discard");
        assert_eq!(state, SelectionState::Arming(MarkupKind::Highlight));
    }

    #[test]
    fn arming_the_same_tool_twice_toggles_it_off() {
        let mut machine = SelectionMachine::new();
        machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("arm");
        let state = machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("toggle");
        assert_eq!(state, SelectionState::Idle);
    }

    #[test]
    fn page_change_and_document_load_always_return_to_idle() {
        for reset_event in [
            SelectionEvent::PageChanged,
            SelectionEvent::DocumentLoaded,
            SelectionEvent::DisarmTool,
        ] {
            let mut machine = SelectionMachine::new();
            machine
                .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
                .expect("arm");
            machine
                .transition(SelectionEvent::PointerReleased)
                .expect("release");
            machine
                .transition(SelectionEvent::CaptureSucceeded)
                .expect("capture");
            let state = machine.transition(reset_event).expect("reset");
            assert_eq!(state, SelectionState::Idle, "{reset_event:?}");
        }
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = SelectionMachine::new();

        let err = machine
            .transition(SelectionEvent::CaptureSucceeded)
            .expect_err("idle -> capture succeeded should fail");
        assert!(matches!(
            err,
            StateError::InvalidStateTransition {
                from: SelectionState::Idle,
                event: SelectionEvent::CaptureSucceeded
            }
        ));
        assert_eq!(machine.state(), SelectionState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn document_load_starts_a_fresh_history() {
        let mut machine = SelectionMachine::new();
        machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("arm");
        machine
            .transition(SelectionEvent::PointerReleased)
            .expect("release");
        machine
            .transition(SelectionEvent::DocumentLoaded)
            .expect("load");

        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.history()[0].event, SelectionEvent::DocumentLoaded);
    }

    #[test]
    fn history_keeps_only_the_latest_transitions() {
        let mut machine = SelectionMachine::new();
        for _ in 0..HISTORY_LIMIT {
            machine
                .transition(SelectionEvent::ArmTool(MarkupKind::Underline))
                .expect("toggle");
        }
        machine
            .transition(SelectionEvent::ArmTool(MarkupKind::Highlight))
            .expect("arm highlight");

        assert_eq!(machine.history().len(), HISTORY_LIMIT);
        assert_eq!(
            machine.history().last().map(|record| record.to),
            Some(SelectionState::Arming(MarkupKind::Highlight))
        );
    }
}
