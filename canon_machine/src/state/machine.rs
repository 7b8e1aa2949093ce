//! Top-level machine state transitions.
//!
//! ```text
//!   RESET ──cycle_start──▶ RUN ──program_stop──▶ STOP ──cycle_start──▶ RUN
//!                           │  ──program_end───▶ RESET
//!                           │  ──feedhold──────▶ HOLD ──cycle_start──▶ END_HOLD
//!                           │                                            │ (auto)
//!                           ◀────────────────────────────────────────────┘ RUN or STOP
//!   RESET/RUN/STOP ──homing_start──▶ HOMING ──complete──▶ RUN / ──failed──▶ STOP
//!   any ──abort / hardware_fault──▶ RESET
//! ```
//!
//! `RUN`+cycle_start and `HOLD`+feedhold are accepted no-ops. Every pair not
//! listed is rejected.

use canon_common::machine::state::MachineState;

use super::TransitionResult;

/// Machine-level event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Operator cycle start.
    CycleStart,
    /// M0/M1 reached.
    ProgramStop,
    /// M2/M30 reached.
    ProgramEnd,
    /// Operator feedhold.
    Feedhold,
    /// Automatic exit from END_HOLD; `stop_pending` was captured at hold entry.
    HoldExit { stop_pending: bool },
    /// Unconditional abort.
    Abort,
    /// Fault reported by the planner.
    HardwareFault,
    /// Homing cycle started.
    HomingStart,
    /// Homing cycle finished successfully.
    HomingComplete,
    /// Homing cycle failed.
    HomingFailed,
}

/// Machine state holder.
#[derive(Debug, Clone)]
pub struct MachineStateMachine {
    state: MachineState,
}

impl MachineStateMachine {
    /// Create a new machine state machine in Reset.
    pub const fn new() -> Self {
        Self {
            state: MachineState::Reset,
        }
    }

    #[inline]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: MachineEvent) -> TransitionResult<MachineState> {
        use MachineEvent::*;
        use MachineState::*;

        let next = match (self.state, event) {
            // any → Reset, overrides everything else
            (_, Abort) | (_, HardwareFault) => Reset,

            (Reset, CycleStart) => Run,
            (Stop, CycleStart) => Run,
            (Run, CycleStart) => Run,

            (Run, ProgramStop) => Stop,
            (Run, ProgramEnd) => Reset,

            (Run, Feedhold) => Hold,
            (Hold, Feedhold) => Hold,
            (Hold, CycleStart) => EndHold,
            (EndHold, HoldExit { stop_pending: false }) => Run,
            (EndHold, HoldExit { stop_pending: true }) => Stop,

            (Reset, HomingStart) | (Run, HomingStart) | (Stop, HomingStart) => Homing,
            (Homing, HomingComplete) => Run,
            (Homing, HomingFailed) => Stop,

            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.state, event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// Motion requests may be issued.
    #[inline]
    pub const fn allows_motion(&self) -> bool {
        matches!(self.state, MachineState::Run)
    }

    /// Homing-internal moves may be issued.
    #[inline]
    pub const fn allows_homing_motion(&self) -> bool {
        matches!(self.state, MachineState::Homing)
    }

    /// Modal setters are accepted (everything but an active homing cycle).
    #[inline]
    pub const fn allows_modal_changes(&self) -> bool {
        !matches!(self.state, MachineState::Homing)
    }
}

impl Default for MachineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_transition_reason(state: MachineState, event: MachineEvent) -> &'static str {
    use MachineEvent::*;
    use MachineState::*;
    match (state, event) {
        (Homing, _) => "Homing: only completion, failure or abort allowed",
        (_, HoldExit { .. }) => "HoldExit only valid in EndHold",
        (_, Feedhold) => "Feedhold only valid in Run or Hold",
        (_, ProgramStop) | (_, ProgramEnd) => "program stop/end only valid in Run",
        (_, HomingComplete) | (_, HomingFailed) => "no homing cycle in progress",
        (EndHold, _) => "EndHold: waiting for automatic exit",
        (Hold, _) => "Hold: only CycleStart, Feedhold or abort allowed",
        _ => "invalid event for current state",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
