//! Return-to-home (G28) cycle.
//!
//! Traverses to an optional intermediate point, then to machine zero on every
//! enabled axis. One move per step, each issued once the planner is idle, so
//! the cycle can be held and resumed like any other motion.

use canon_common::consts::AXES;
use canon_common::machine::axis::AxisVector;
use canon_common::machine::config::AxisConfig;
use canon_common::machine::state::AxisMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnHomePhase {
    Idle,
    Intermediate,
    Home,
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnHomeStep {
    Idle,
    /// Submit a traverse to `target`.
    Move { target: AxisVector },
    Complete,
}

#[derive(Debug, Clone)]
pub struct ReturnHomeCycle {
    phase: ReturnHomePhase,
    intermediate: Option<AxisVector>,
}

impl ReturnHomeCycle {
    pub const fn new() -> Self {
        Self {
            phase: ReturnHomePhase::Idle,
            intermediate: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> ReturnHomePhase {
        self.phase
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase != ReturnHomePhase::Idle
    }

    pub fn start(&mut self, intermediate: Option<AxisVector>) {
        self.intermediate = intermediate;
        self.phase = if intermediate.is_some() {
            ReturnHomePhase::Intermediate
        } else {
            ReturnHomePhase::Home
        };
    }

    pub fn abort(&mut self) {
        self.phase = ReturnHomePhase::Idle;
        self.intermediate = None;
    }

    /// Advance one step; call only while the planner is idle.
    pub fn step(&mut self, position: &AxisVector, axes: &[AxisConfig; AXES]) -> ReturnHomeStep {
        match self.phase {
            ReturnHomePhase::Idle => ReturnHomeStep::Idle,
            ReturnHomePhase::Intermediate => {
                self.phase = ReturnHomePhase::Home;
                match self.intermediate {
                    Some(target) => ReturnHomeStep::Move { target },
                    None => self.step(position, axes),
                }
            }
            ReturnHomePhase::Home => {
                self.phase = ReturnHomePhase::Settle;
                let mut target = *position;
                for cfg in axes.iter().filter(|a| a.mode != AxisMode::Disabled) {
                    target[cfg.axis] = 0.0;
                }
                ReturnHomeStep::Move { target }
            }
            ReturnHomePhase::Settle => {
                self.abort();
                ReturnHomeStep::Complete
            }
        }
    }
}

impl Default for ReturnHomeCycle {
    fn default() -> Self {
        Self::new()
    }
}
