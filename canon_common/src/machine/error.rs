//! Dispatch status codes.
//!
//! Every error is local to one block: it prevents that block's commit and
//! outbound requests and leaves the machine state untouched. Only abort and a
//! planner-reported hardware fault act machine-wide, and neither is an error.

use thiserror::Error;

use super::axis::Axis;
use super::codes::{BlockCodes, ModalGroup};
use super::state::MachineState;

/// Rejection reason returned by a dispatch call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanonError {
    /// Two codes from the same modal group in one block.
    #[error("modal group conflict in {}: {}", .0, .1.describe())]
    ModalGroupConflict(ModalGroup, BlockCodes),

    /// Command not allowed in the current machine state.
    #[error("machine not ready: {operation} not allowed in {state:?}")]
    MachineNotReady {
        operation: &'static str,
        state: MachineState,
    },

    /// Arc cannot be constructed from the programmed values.
    #[error("arc geometry error: {reason}")]
    ArcGeometryError { reason: &'static str },

    /// Value outside the axis' domain (non-finite or beyond travel).
    #[error("axis {axis} value {value} out of range")]
    AxisRangeError { axis: Axis, value: f64 },

    /// G10 P value or coordinate selector out of range.
    #[error("invalid coordinate system {0}")]
    InvalidCoordinateSystem(u8),

    /// T value above the configured tool count.
    #[error("invalid tool number {0}")]
    InvalidToolNumber(u8),

    /// Recognized canonical function without an implementation.
    #[error("unimplemented feature: {0}")]
    UnimplementedFeature(&'static str),

    /// Feed move without a usable feed rate.
    #[error("feed rate not set for feed move")]
    FeedRateNotSet,

    /// Non-finite or negative auxiliary value (F, S, P).
    #[error("invalid {word} word value {value}")]
    InvalidWordValue { word: char, value: f64 },

    /// Planner refused a request.
    #[error("planner rejected request: {0}")]
    PlannerRejected(String),

    /// Block produced more outbound requests than the buffer holds.
    #[error("outbound request buffer full")]
    OutboxOverflow,
}

impl CanonError {
    /// Warnings do not reject the block; the function is a no-op.
    #[inline]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::UnimplementedFeature(_))
    }

    /// Numeric status code for console and status reports.
    pub const fn code(&self) -> u8 {
        match self {
            Self::ModalGroupConflict(..) => 10,
            Self::MachineNotReady { .. } => 11,
            Self::ArcGeometryError { .. } => 12,
            Self::AxisRangeError { .. } => 13,
            Self::InvalidCoordinateSystem(_) => 14,
            Self::InvalidToolNumber(_) => 15,
            Self::UnimplementedFeature(_) => 16,
            Self::FeedRateNotSet => 17,
            Self::InvalidWordValue { .. } => 18,
            Self::PlannerRejected(_) => 19,
            Self::OutboxOverflow => 20,
        }
    }
}
