//! State machine module root.
//!
//! Top-level machine state plus its feedhold and homing sub-states. Each
//! machine holds only its current value and answers events with a
//! [`TransitionResult`]; side effects belong to the dispatcher.

pub mod feedhold;
pub mod homing;
pub mod machine;

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult<S> {
    /// Transition succeeded, new state.
    Ok(S),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

impl<S: Copy> TransitionResult<S> {
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// New state, or `None` if rejected.
    #[inline]
    pub fn state(&self) -> Option<S> {
        match self {
            Self::Ok(s) => Some(*s),
            Self::Rejected(_) => None,
        }
    }
}
