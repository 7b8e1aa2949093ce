//! External collaborator interfaces.
//!
//! The layer talks to three collaborators: the motion planner, the spindle
//! and tool driver, and the console. Configuration is read once at
//! construction. Requests sent to collaborators are plain values; outbound
//! traffic of one block is buffered and released only after commit.

use canon_common::machine::axis::{AxisFlags, AxisVector};
use canon_common::machine::block::ConsoleText;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{Direction, FeedRateMode, PathControl, Plane, SpindleMode};
use canon_common::machine::status::StatusReport;
use thiserror::Error;

use crate::arc::ArcGeometry;

// ─── Planner ────────────────────────────────────────────────────────

/// Kind of straight move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// G0, maximum velocity.
    Traverse,
    /// G1 at the programmed feed rate.
    Feed,
    /// Homing-internal move; the driver stops it on switch contact.
    Homing,
}

/// Straight-line motion request, absolute machine coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRequest {
    pub kind: MoveKind,
    pub target: AxisVector,
    /// mm/min, or minutes⁻¹ in inverse time mode.
    pub feed_rate: f64,
    pub feed_rate_mode: FeedRateMode,
    pub path_control: PathControl,
    /// Axes computed but not actuated.
    pub inhibited: AxisFlags,
    pub linenum: u32,
}

/// Arc motion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcRequest {
    pub target: AxisVector,
    pub plane: Plane,
    pub direction: Direction,
    pub geometry: ArcGeometry,
    pub feed_rate: f64,
    pub feed_rate_mode: FeedRateMode,
    pub path_control: PathControl,
    pub inhibited: AxisFlags,
    pub linenum: u32,
}

/// Queued planner request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlannerRequest {
    Line(LineRequest),
    Arc(ArcRequest),
    /// G4 [s].
    Dwell { seconds: f64 },
    /// Marker; the planner calls back `exec_stop()` when it is reached.
    ProgramStop,
    /// Marker; the planner calls back `exec_end()` when it is reached.
    ProgramEnd,
}

impl PlannerRequest {
    /// End point if this request moves the machine.
    pub fn target(&self) -> Option<AxisVector> {
        match self {
            Self::Line(l) => Some(l.target),
            Self::Arc(a) => Some(a.target),
            _ => None,
        }
    }
}

/// Immediate signal to the planner, bypassing its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerSignal {
    /// Replan queued motion to a controlled stop.
    PlanFeedhold,
    /// Resume from the held point.
    Resume,
    /// Discard the queue and stop now.
    Abort,
}

/// Planner refusal.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct PlannerError(pub String);

impl From<PlannerError> for CanonError {
    fn from(e: PlannerError) -> Self {
        CanonError::PlannerRejected(e.0)
    }
}

/// Real-time trajectory planner.
pub trait Planner {
    /// Queue a request.
    fn submit(&mut self, request: PlannerRequest) -> Result<(), PlannerError>;

    /// Deliver an immediate signal.
    fn signal(&mut self, signal: PlannerSignal);

    /// Free queue slots.
    fn available(&self) -> usize;

    /// Motion queued or executing.
    fn is_busy(&self) -> bool;

    /// Live machine position [mm/deg].
    fn runtime_position(&self) -> AxisVector;

    /// Redefine the machine position without moving (idle planner only).
    fn set_position(&mut self, position: AxisVector);

    /// Live path velocity [mm/min].
    fn runtime_velocity(&self) -> f64;

    /// The in-flight segment has finished.
    fn at_segment_boundary(&self) -> bool;
}

// ─── Spindle / Tool ─────────────────────────────────────────────────

/// Spindle or tool command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpindleCommand {
    Speed(f64),
    Mode(SpindleMode),
    SelectTool(u8),
    ChangeTool(u8),
}

/// Spindle and tool changer driver.
pub trait SpindleDriver {
    fn execute(&mut self, command: SpindleCommand);
}

// ─── Console ────────────────────────────────────────────────────────

/// Console and status collaborator.
pub trait Console {
    fn comment(&mut self, text: &str);
    fn message(&mut self, text: &str);
    fn status_report(&mut self, report: &StatusReport);
    fn block_rejected(&mut self, linenum: u32, error: &CanonError);
}

// ─── Outbox ─────────────────────────────────────────────────────────

/// Deferred cycle start requested by a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleRequest {
    /// G28 with an optional resolved intermediate point.
    ReturnToHome { intermediate: Option<AxisVector> },
    /// G28.1 / G30 for the given axes.
    Homing { axes: AxisFlags },
}

/// Program flow action requested by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramAction {
    Stop,
    End,
}

/// One buffered outbound item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Planner(PlannerRequest),
    Spindle(SpindleCommand),
    Comment(ConsoleText),
    Message(ConsoleText),
    Cycle(CycleRequest),
    Program(ProgramAction),
}
