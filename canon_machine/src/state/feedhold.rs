//! Feedhold sub-state transitions.
//!
//! `OFF → SYNC → PLAN → DECEL → HOLD`, entered only while the machine is in
//! `HOLD`. Exit (cycle start) and abort return to `OFF` from any active
//! sub-state.

use canon_common::machine::state::FeedholdState;

use super::TransitionResult;

/// Feedhold sequencing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedholdEvent {
    /// Hold requested by the operator.
    Request,
    /// In-flight segment finished.
    SegmentBoundary,
    /// Planner accepted the replan request.
    Planned,
    /// Runtime velocity reached zero.
    Stopped,
    /// Hold released.
    Exit,
    /// Abort.
    Abort,
}

#[derive(Debug, Clone)]
pub struct FeedholdStateMachine {
    state: FeedholdState,
}

impl FeedholdStateMachine {
    pub const fn new() -> Self {
        Self {
            state: FeedholdState::Off,
        }
    }

    #[inline]
    pub const fn state(&self) -> FeedholdState {
        self.state
    }

    /// True for any sub-state but `Off`.
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, FeedholdState::Off)
    }

    pub fn handle_event(&mut self, event: FeedholdEvent) -> TransitionResult<FeedholdState> {
        use FeedholdEvent::*;
        use FeedholdState::*;

        let next = match (self.state, event) {
            (_, Abort) => Off,
            (Off, Request) => Sync,
            (Sync, SegmentBoundary) => Plan,
            (Plan, Planned) => Decel,
            (Decel, Stopped) => Hold,
            (Sync | Plan | Decel | Hold, Exit) => Off,
            (Off, _) => return TransitionResult::Rejected("no feedhold in progress"),
            (_, Request) => return TransitionResult::Rejected("feedhold already in progress"),
            _ => return TransitionResult::Rejected("feedhold event out of sequence"),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

impl Default for FeedholdStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
