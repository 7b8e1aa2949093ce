//! Homing sub-state transitions.
//!
//! `NOT_HOMED`/`HOMED` are the persistent values; `IN_CYCLE` is transient.
//! Failure and abort during a cycle leave `NOT_HOMED`.

use canon_common::machine::state::HomingState;

use super::TransitionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingEvent {
    Start,
    Succeeded,
    Failed,
    Abort,
}

#[derive(Debug, Clone)]
pub struct HomingStateMachine {
    state: HomingState,
}

impl HomingStateMachine {
    pub const fn new() -> Self {
        Self {
            state: HomingState::NotHomed,
        }
    }

    /// Start with a persisted homed flag.
    pub const fn restored(homed: bool) -> Self {
        Self {
            state: if homed {
                HomingState::Homed
            } else {
                HomingState::NotHomed
            },
        }
    }

    #[inline]
    pub const fn state(&self) -> HomingState {
        self.state
    }

    #[inline]
    pub const fn is_homed(&self) -> bool {
        matches!(self.state, HomingState::Homed)
    }

    #[inline]
    pub const fn in_cycle(&self) -> bool {
        matches!(self.state, HomingState::InCycle)
    }

    pub fn handle_event(&mut self, event: HomingEvent) -> TransitionResult<HomingState> {
        use HomingEvent::*;
        use HomingState::*;

        let next = match (self.state, event) {
            (NotHomed | Homed, Start) => InCycle,
            (InCycle, Succeeded) => Homed,
            (InCycle, Failed) | (InCycle, Abort) => NotHomed,
            // abort outside a cycle keeps the persisted value
            (s, Abort) => s,
            (InCycle, Start) => return TransitionResult::Rejected("homing cycle already running"),
            _ => return TransitionResult::Rejected("no homing cycle in progress"),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

impl Default for HomingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
