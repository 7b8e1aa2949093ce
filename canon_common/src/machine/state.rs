//! State and modal-selector enums for the canonical machine.
//!
//! All enums use `#[repr(u8)]` so they round-trip through status reports and
//! persisted settings as small integers. Global state (`MachineState`) and its
//! two sub-states (`FeedholdState`, `HomingState`) come first, followed by the
//! modal selectors carried in the gcode model.

use serde::{Deserialize, Serialize};

use super::axis::Axis;
use crate::consts::MM_PER_INCH;

// ─── Machine State ──────────────────────────────────────────────────

/// Top-level machine state.
///
/// Motion may only be issued in `Run` (and `Homing` for homing-internal moves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MachineState {
    /// Machine has been reset or aborted.
    Reset = 0,
    /// Machine is running.
    Run = 1,
    /// Program stop or no more blocks.
    Stop = 2,
    /// Feedhold in progress.
    Hold = 3,
    /// Transitional state leaving feedhold.
    EndHold = 4,
    /// Homing cycle running.
    Homing = 5,
}

impl MachineState {
    pub const ALL: [MachineState; 6] = [
        Self::Reset,
        Self::Run,
        Self::Stop,
        Self::Hold,
        Self::EndHold,
        Self::Homing,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Reset),
            1 => Some(Self::Run),
            2 => Some(Self::Stop),
            3 => Some(Self::Hold),
            4 => Some(Self::EndHold),
            5 => Some(Self::Homing),
            _ => None,
        }
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::Reset
    }
}

/// Feedhold sub-state, meaningful only while `MachineState::Hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FeedholdState {
    /// No feedhold in effect.
    Off = 0,
    /// Waiting for the in-flight segment boundary.
    Sync = 1,
    /// Planner replanning queued motion to a stop.
    Plan = 2,
    /// Decelerating to the hold point.
    Decel = 3,
    /// Holding at zero velocity.
    Hold = 4,
}

impl FeedholdState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Sync),
            2 => Some(Self::Plan),
            3 => Some(Self::Decel),
            4 => Some(Self::Hold),
            _ => None,
        }
    }
}

impl Default for FeedholdState {
    fn default() -> Self {
        Self::Off
    }
}

/// Homing state. `NotHomed`/`Homed` are persistent (0/1), `InCycle` is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomingState {
    NotHomed = 0,
    Homed = 1,
    InCycle = 2,
}

impl HomingState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotHomed),
            1 => Some(Self::Homed),
            2 => Some(Self::InCycle),
            _ => None,
        }
    }
}

impl Default for HomingState {
    fn default() -> Self {
        Self::NotHomed
    }
}

// ─── Block Actions ──────────────────────────────────────────────────

/// Action requested by the current block. Unlike `MotionMode` this does not
/// persist across blocks and may carry a non-modal command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NextAction {
    /// No motion in this block.
    #[default]
    None = 0,
    /// Motion as selected by `MotionMode`.
    Motion = 1,
    /// G4.
    Dwell = 2,
    /// G28.
    ReturnToHome = 3,
    /// G28.1 / G30 homing cycle.
    HomingCycle = 4,
    /// G10 L2.
    SetCoordOffset = 5,
    /// G92 family.
    SetOriginOffset = 6,
}

/// Modal group 1 motion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MotionMode {
    /// G0.
    StraightTraverse = 0,
    /// G1.
    #[default]
    StraightFeed = 1,
    /// G2.
    CwArc = 2,
    /// G3.
    CcwArc = 3,
    /// G80.
    CancelMotionMode = 4,
}

impl MotionMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::StraightTraverse),
            1 => Some(Self::StraightFeed),
            2 => Some(Self::CwArc),
            3 => Some(Self::CcwArc),
            4 => Some(Self::CancelMotionMode),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_arc(&self) -> bool {
        matches!(self, Self::CwArc | Self::CcwArc)
    }

    /// Modes that consume a feed rate.
    #[inline]
    pub const fn is_feed(&self) -> bool {
        matches!(self, Self::StraightFeed | Self::CwArc | Self::CcwArc)
    }
}

/// Captured program flow (M0/M1 pause, M2/M30 complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProgramFlow {
    #[default]
    Running = 0,
    Paused = 1,
    Completed = 2,
}

// ─── Modal Selectors ────────────────────────────────────────────────

/// Active working plane (G17/G18/G19).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Plane {
    /// G17: X, Y, normal Z.
    #[default]
    Xy = 0,
    /// G18: X, Z, normal Y.
    Xz = 1,
    /// G19: Y, Z, normal X.
    Yz = 2,
}

impl Plane {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Xy),
            1 => Some(Self::Xz),
            2 => Some(Self::Yz),
            _ => None,
        }
    }

    /// `[axis_0, axis_1, normal]` for this plane.
    #[inline]
    pub const fn axes(&self) -> [Axis; 3] {
        match self {
            Self::Xy => [Axis::X, Axis::Y, Axis::Z],
            Self::Xz => [Axis::X, Axis::Z, Axis::Y],
            Self::Yz => [Axis::Y, Axis::Z, Axis::X],
        }
    }
}

/// Linear units of incoming values (G20/G21). Rotary axes are always degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UnitsMode {
    /// G20.
    Inches = 0,
    /// G21.
    #[default]
    Millimeters = 1,
}

impl UnitsMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inches),
            1 => Some(Self::Millimeters),
            _ => None,
        }
    }

    /// Millimeters per input unit.
    #[inline]
    pub const fn scale(&self) -> f64 {
        match self {
            Self::Inches => MM_PER_INCH,
            Self::Millimeters => 1.0,
        }
    }

    #[inline]
    pub fn to_mm(&self, value: f64) -> f64 {
        value * self.scale()
    }

    #[inline]
    pub fn from_mm(&self, value: f64) -> f64 {
        value / self.scale()
    }
}

/// Coordinate system: machine coordinates or one of G54..G59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CoordSystem {
    Absolute = 0,
    #[default]
    G54 = 1,
    G55 = 2,
    G56 = 3,
    G57 = 4,
    G58 = 5,
    G59 = 6,
}

impl CoordSystem {
    pub const ALL: [CoordSystem; 7] = [
        Self::Absolute,
        Self::G54,
        Self::G55,
        Self::G56,
        Self::G57,
        Self::G58,
        Self::G59,
    ];

    /// Work systems only (G10 L2 P1..P6).
    pub const WORK: [CoordSystem; 6] =
        [Self::G54, Self::G55, Self::G56, Self::G57, Self::G58, Self::G59];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Absolute),
            1 => Some(Self::G54),
            2 => Some(Self::G55),
            3 => Some(Self::G56),
            4 => Some(Self::G57),
            5 => Some(Self::G58),
            6 => Some(Self::G59),
            _ => None,
        }
    }

    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

/// Path control mode (G61/G61.1/G64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PathControl {
    ExactStop = 0,
    ExactPath = 1,
    #[default]
    Continuous = 2,
}

impl PathControl {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ExactStop),
            1 => Some(Self::ExactPath),
            2 => Some(Self::Continuous),
            _ => None,
        }
    }
}

/// Distance mode (G90/G91).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DistanceMode {
    #[default]
    Absolute = 0,
    Incremental = 1,
}

impl DistanceMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Absolute),
            1 => Some(Self::Incremental),
            _ => None,
        }
    }
}

/// Feed rate interpretation (G93/G94).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FeedRateMode {
    /// G93: F is the inverse of the move time in minutes.
    InverseTime = 0,
    /// G94: F is distance per minute.
    #[default]
    UnitsPerMinute = 1,
}

/// Origin offset command (G92 family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OriginOffsetMode {
    /// G92: set origin offsets.
    #[default]
    Set = 0,
    /// G92.1: zero out and disable.
    Cancel = 1,
    /// G92.2: stop applying, keep values.
    Suspend = 2,
    /// G92.3: resume applying suspended values.
    Resume = 3,
}

/// Spindle turning (M3/M4/M5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SpindleMode {
    #[default]
    Off = 0,
    Cw = 1,
    Ccw = 2,
}

impl SpindleMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Cw),
            2 => Some(Self::Ccw),
            _ => None,
        }
    }
}

/// Rotation direction for arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    Cw = 0,
    Ccw = 1,
}

/// Per-axis operating mode from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AxisMode {
    /// Axis ignored: input never changes its target.
    Disabled = 0,
    /// Coordinated motion with standard behavior.
    #[default]
    Standard = 1,
    /// Computed but not actuated.
    Inhibited = 2,
    /// Rotary axis programmed in linear units along its radius.
    Radius = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_state_round_trip() {
        for s in MachineState::ALL {
            assert_eq!(MachineState::from_u8(s as u8), Some(s));
        }
        assert_eq!(MachineState::from_u8(6), None);
        assert_eq!(MachineState::default(), MachineState::Reset);
    }

    #[test]
    fn homing_persistent_values() {
        assert_eq!(HomingState::NotHomed as u8, 0);
        assert_eq!(HomingState::Homed as u8, 1);
        assert_eq!(HomingState::from_u8(2), Some(HomingState::InCycle));
    }

    #[test]
    fn plane_axes() {
        assert_eq!(Plane::Xy.axes(), [Axis::X, Axis::Y, Axis::Z]);
        assert_eq!(Plane::Xz.axes(), [Axis::X, Axis::Z, Axis::Y]);
        assert_eq!(Plane::Yz.axes(), [Axis::Y, Axis::Z, Axis::X]);
    }

    #[test]
    fn units_scale() {
        assert_eq!(UnitsMode::Inches.to_mm(1.0), 25.4);
        assert_eq!(UnitsMode::Millimeters.to_mm(3.0), 3.0);
        assert!((UnitsMode::Inches.from_mm(50.8) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn coord_system_index() {
        for (i, cs) in CoordSystem::ALL.iter().enumerate() {
            assert_eq!(cs.index(), i);
            assert_eq!(CoordSystem::from_u8(i as u8), Some(*cs));
        }
        assert_eq!(CoordSystem::from_u8(7), None);
    }

    #[test]
    fn motion_mode_classes() {
        assert!(MotionMode::CwArc.is_arc());
        assert!(!MotionMode::StraightFeed.is_arc());
        assert!(MotionMode::StraightFeed.is_feed());
        assert!(!MotionMode::StraightTraverse.is_feed());
    }
}
