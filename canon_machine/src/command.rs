//! Command processing root.
//!
//! The dispatcher and its canonical functions, the block executor, and the
//! homing and return-to-home cycle supervisors advanced by scheduler ticks.

pub mod block;
pub mod canonical;
pub mod dispatch;
pub mod homing;
pub mod return_home;

/// Result of one scheduler tick of a cycle callback.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleStep {
    /// No cycle running.
    Idle,
    /// Cycle running, call again next tick.
    InProgress,
    /// Cycle finished on this tick.
    Complete,
    /// Cycle aborted on this tick.
    Failed(canon_common::machine::error::CanonError),
}

impl CycleStep {
    #[inline]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}
