//! The gcode model record and its change-flag companion.
//!
//! Three instances are kept by the modal state store:
//!
//! - **committed** — normalized canonical state: millimeters, degrees,
//!   machine coordinates. Only the dispatcher's commit step writes it.
//! - **incoming** — values of the block being resolved, in the units and
//!   coordinate frame they were programmed in. Rebuilt for every block from
//!   the committed record via [`GCodeModel::carry_forward`].
//! - **flags** — which words and codes the current block set explicitly
//!   ([`GCodeFlags`]).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::axis::{Axis, AxisFlags, AxisVector};
use super::codes::BlockCodes;
use super::state::{
    CoordSystem, DistanceMode, FeedRateMode, MotionMode, NextAction, PathControl, Plane,
    ProgramFlow, SpindleMode, UnitsMode,
};

/// Gcode model record. Meaning of values depends on which instance it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GCodeModel {
    /// Action of the current block (non-modal).
    pub next_action: NextAction,
    /// Group 1 motion mode, persists across blocks.
    pub motion_mode: MotionMode,
    /// Captured program flow.
    pub program_flow: ProgramFlow,

    /// Where the move should go.
    pub target: AxisVector,
    /// Last committed position (committed record only).
    pub position: AxisVector,
    /// G92 origin offsets [mm/deg].
    pub origin_offset: AxisVector,

    /// F, normalized to mm/min in the committed record.
    pub feed_rate: f64,
    /// F as minutes⁻¹, used only in inverse time mode.
    pub inverse_feed_rate: f64,
    /// G93/G94.
    pub feed_rate_mode: FeedRateMode,

    /// G17/G18/G19.
    pub select_plane: Plane,
    pub plane_axis_0: Axis,
    pub plane_axis_1: Axis,
    pub plane_axis_2: Axis,

    /// G54..G59, or machine coordinates.
    pub coord_system: CoordSystem,
    /// G10 L2 P value (raw, validated on dispatch).
    pub set_coord_offset: u8,
    /// G20/G21.
    pub units_mode: UnitsMode,
    /// G53: move in machine coordinates, this block only.
    pub absolute_override: bool,
    /// G61/G61.1/G64.
    pub path_control: PathControl,
    /// G90/G91.
    pub distance_mode: DistanceMode,
    /// True while G92 origin offsets are applied.
    pub origin_offset_mode: bool,

    /// T value.
    pub tool: u8,
    /// M6 requested in this block.
    pub change_tool: bool,
    /// M3/M4/M5.
    pub spindle_mode: SpindleMode,
    /// S value [RPM].
    pub spindle_speed: f64,

    /// G4 P value [s].
    pub dwell_time: f64,
    /// R value.
    pub arc_radius: f64,
    /// I, J, K values.
    pub arc_offset: [f64; 3],
}

impl Default for GCodeModel {
    fn default() -> Self {
        let plane = Plane::default();
        let [a0, a1, a2] = plane.axes();
        Self {
            next_action: NextAction::None,
            motion_mode: MotionMode::default(),
            program_flow: ProgramFlow::Running,
            target: AxisVector::ZERO,
            position: AxisVector::ZERO,
            origin_offset: AxisVector::ZERO,
            feed_rate: 0.0,
            inverse_feed_rate: 0.0,
            feed_rate_mode: FeedRateMode::default(),
            select_plane: plane,
            plane_axis_0: a0,
            plane_axis_1: a1,
            plane_axis_2: a2,
            coord_system: CoordSystem::default(),
            set_coord_offset: 0,
            units_mode: UnitsMode::default(),
            absolute_override: false,
            path_control: PathControl::default(),
            distance_mode: DistanceMode::default(),
            origin_offset_mode: false,
            tool: 0,
            change_tool: false,
            spindle_mode: SpindleMode::Off,
            spindle_speed: 0.0,
            dwell_time: 0.0,
            arc_radius: 0.0,
            arc_offset: [0.0; 3],
        }
    }
}

impl GCodeModel {
    /// Select a plane and resolve its axes.
    pub fn set_plane(&mut self, plane: Plane) {
        let [a0, a1, a2] = plane.axes();
        self.select_plane = plane;
        self.plane_axis_0 = a0;
        self.plane_axis_1 = a1;
        self.plane_axis_2 = a2;
    }

    /// Build the starting record for a new block from this (committed) record.
    ///
    /// Modal state carries forward; per-block values are cleared. The target
    /// starts at the committed position so unset axes do not move.
    pub fn carry_forward(&self) -> Self {
        Self {
            next_action: NextAction::None,
            target: self.position,
            set_coord_offset: 0,
            absolute_override: false,
            change_tool: false,
            dwell_time: 0.0,
            arc_radius: 0.0,
            arc_offset: [0.0; 3],
            inverse_feed_rate: 0.0,
            ..self.clone()
        }
    }
}

bitflags! {
    /// Non-axis words present in a block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WordFlags: u16 {
        const F = 0x0001;
        const S = 0x0002;
        const T = 0x0004;
        const P = 0x0008;
        const R = 0x0010;
        const I = 0x0020;
        const J = 0x0040;
        const K = 0x0080;
        const L = 0x0100;
        const N = 0x0200;
    }
}

impl WordFlags {
    /// Arc center offset words.
    pub const IJK: Self =
        Self::from_bits_truncate(Self::I.bits() | Self::J.bits() | Self::K.bits());
}

/// Which fields of the incoming record were set by the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GCodeFlags {
    /// G and M codes present.
    pub codes: BlockCodes,
    /// Letter words present (F, S, T, P, R, IJK, L, N).
    pub words: WordFlags,
    /// Axis words present.
    pub axes: AxisFlags,
}

impl GCodeFlags {
    #[inline]
    pub fn has_code(&self, code: BlockCodes) -> bool {
        self.codes.intersects(code)
    }

    #[inline]
    pub fn has_word(&self, word: WordFlags) -> bool {
        self.words.intersects(word)
    }

    #[inline]
    pub fn has_axis_words(&self) -> bool {
        !self.axes.is_empty()
    }

    /// True if nothing was set.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.words.is_empty() && self.axes.is_empty()
    }
}
