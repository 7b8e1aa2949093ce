//! One parsed command block: incoming values, change flags, and block text.
//!
//! The textual parser is an external collaborator. [`BlockBuilder`] is the
//! in-process way to produce the same `incoming`/`flags` pair: every G/M code
//! sets both its flag bit and the matching incoming value, every word sets its
//! value and word flag.

use serde::{Deserialize, Serialize};

use super::axis::{Axis, AxisVector};
use super::codes::BlockCodes;
use super::model::{GCodeFlags, GCodeModel, WordFlags};
use super::state::{
    CoordSystem, DistanceMode, FeedRateMode, MotionMode, NextAction, PathControl, Plane,
    SpindleMode, UnitsMode,
};
use crate::consts::CONSOLE_TEXT_CAPACITY;

/// Fixed-capacity console text (comments, messages).
pub type ConsoleText = heapless::String<CONSOLE_TEXT_CAPACITY>;

/// Copy `text` into a `ConsoleText`, truncating at a char boundary if needed.
pub fn console_text(text: &str) -> ConsoleText {
    let mut out = ConsoleText::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// A complete block as handed over by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GCodeBlock {
    /// Source line number (N word or file line).
    pub linenum: Option<u32>,
    /// Values as programmed.
    pub values: GCodeModel,
    /// What the block set.
    pub flags: GCodeFlags,
    /// Comment text, forwarded verbatim.
    pub comment: Option<ConsoleText>,
    /// MSG text, forwarded verbatim.
    pub message: Option<ConsoleText>,
}

/// Builder for [`GCodeBlock`].
///
/// Starts from the carried-forward incoming record so unset fields keep
/// their modal values.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    block: GCodeBlock,
}

impl BlockBuilder {
    /// Start a block whose defaults are `base` (normally `committed.carry_forward()`).
    pub fn from_base(base: GCodeModel) -> Self {
        Self {
            block: GCodeBlock {
                linenum: None,
                values: base,
                flags: GCodeFlags::default(),
                comment: None,
                message: None,
            },
        }
    }

    /// Start a block on power-on defaults.
    pub fn new() -> Self {
        Self::from_base(GCodeModel::default())
    }

    /// Source line number.
    pub fn n(mut self, linenum: u32) -> Self {
        self.block.linenum = Some(linenum);
        self.block.flags.words |= WordFlags::N;
        self
    }

    /// Add a G or M code (single-bit mask).
    pub fn code(mut self, code: BlockCodes) -> Self {
        self.block.flags.codes |= code;
        let v = &mut self.block.values;
        match code {
            c if c == BlockCodes::G0 => v.motion_mode = MotionMode::StraightTraverse,
            c if c == BlockCodes::G1 => v.motion_mode = MotionMode::StraightFeed,
            c if c == BlockCodes::G2 => v.motion_mode = MotionMode::CwArc,
            c if c == BlockCodes::G3 => v.motion_mode = MotionMode::CcwArc,
            c if c == BlockCodes::G80 => v.motion_mode = MotionMode::CancelMotionMode,
            c if c == BlockCodes::G4 => v.next_action = NextAction::Dwell,
            c if c == BlockCodes::G10 => v.next_action = NextAction::SetCoordOffset,
            c if c == BlockCodes::G28 => v.next_action = NextAction::ReturnToHome,
            c if c == BlockCodes::G28_1 || c == BlockCodes::G30 => {
                v.next_action = NextAction::HomingCycle
            }
            c if BlockCodes::ORIGIN_OFFSET.contains(c) => {
                v.next_action = NextAction::SetOriginOffset
            }
            c if c == BlockCodes::G53 => v.absolute_override = true,
            c if c == BlockCodes::G17 => v.set_plane(Plane::Xy),
            c if c == BlockCodes::G18 => v.set_plane(Plane::Xz),
            c if c == BlockCodes::G19 => v.set_plane(Plane::Yz),
            c if c == BlockCodes::G20 => v.units_mode = UnitsMode::Inches,
            c if c == BlockCodes::G21 => v.units_mode = UnitsMode::Millimeters,
            c if c == BlockCodes::G90 => v.distance_mode = DistanceMode::Absolute,
            c if c == BlockCodes::G91 => v.distance_mode = DistanceMode::Incremental,
            c if c == BlockCodes::G93 => v.feed_rate_mode = FeedRateMode::InverseTime,
            c if c == BlockCodes::G94 => v.feed_rate_mode = FeedRateMode::UnitsPerMinute,
            c if c == BlockCodes::G54 => v.coord_system = CoordSystem::G54,
            c if c == BlockCodes::G55 => v.coord_system = CoordSystem::G55,
            c if c == BlockCodes::G56 => v.coord_system = CoordSystem::G56,
            c if c == BlockCodes::G57 => v.coord_system = CoordSystem::G57,
            c if c == BlockCodes::G58 => v.coord_system = CoordSystem::G58,
            c if c == BlockCodes::G59 => v.coord_system = CoordSystem::G59,
            c if c == BlockCodes::G61 => v.path_control = PathControl::ExactStop,
            c if c == BlockCodes::G61_1 => v.path_control = PathControl::ExactPath,
            c if c == BlockCodes::G64 => v.path_control = PathControl::Continuous,
            c if c == BlockCodes::M3 => v.spindle_mode = SpindleMode::Cw,
            c if c == BlockCodes::M4 => v.spindle_mode = SpindleMode::Ccw,
            c if c == BlockCodes::M5 => v.spindle_mode = SpindleMode::Off,
            c if c == BlockCodes::M6 => v.change_tool = true,
            _ => {}
        }
        self
    }

    /// Axis word.
    pub fn axis(mut self, axis: Axis, value: f64) -> Self {
        self.block.values.target.set(axis, value);
        self.block.flags.axes |= axis.flag();
        self
    }

    pub fn x(self, value: f64) -> Self {
        self.axis(Axis::X, value)
    }
    pub fn y(self, value: f64) -> Self {
        self.axis(Axis::Y, value)
    }
    pub fn z(self, value: f64) -> Self {
        self.axis(Axis::Z, value)
    }
    pub fn a(self, value: f64) -> Self {
        self.axis(Axis::A, value)
    }
    pub fn b(self, value: f64) -> Self {
        self.axis(Axis::B, value)
    }
    pub fn c(self, value: f64) -> Self {
        self.axis(Axis::C, value)
    }

    /// All six axis words at once.
    pub fn axes(mut self, values: AxisVector) -> Self {
        for axis in Axis::ALL {
            self = self.axis(axis, values.get(axis));
        }
        self
    }

    /// F word (also stored as inverse feed rate for G93).
    pub fn f(mut self, value: f64) -> Self {
        self.block.values.feed_rate = value;
        self.block.values.inverse_feed_rate = value;
        self.block.flags.words |= WordFlags::F;
        self
    }

    /// S word.
    pub fn s(mut self, value: f64) -> Self {
        self.block.values.spindle_speed = value;
        self.block.flags.words |= WordFlags::S;
        self
    }

    /// T word.
    pub fn t(mut self, tool: u8) -> Self {
        self.block.values.tool = tool;
        self.block.flags.words |= WordFlags::T;
        self
    }

    /// P word: dwell seconds for G4, coordinate system number for G10.
    /// Values that are not a small whole number are stored as an
    /// out-of-range system number.
    pub fn p(mut self, value: f64) -> Self {
        self.block.values.dwell_time = value;
        self.block.values.set_coord_offset =
            if value >= 0.0 && value <= f64::from(u8::MAX) && value.fract() == 0.0 {
                value as u8
            } else {
                u8::MAX
            };
        self.block.flags.words |= WordFlags::P;
        self
    }

    /// L word (G10 L2).
    pub fn l(mut self) -> Self {
        self.block.flags.words |= WordFlags::L;
        self
    }

    /// R word.
    pub fn r(mut self, radius: f64) -> Self {
        self.block.values.arc_radius = radius;
        self.block.flags.words |= WordFlags::R;
        self
    }

    pub fn i(mut self, value: f64) -> Self {
        self.block.values.arc_offset[0] = value;
        self.block.flags.words |= WordFlags::I;
        self
    }
    pub fn j(mut self, value: f64) -> Self {
        self.block.values.arc_offset[1] = value;
        self.block.flags.words |= WordFlags::J;
        self
    }
    pub fn k(mut self, value: f64) -> Self {
        self.block.values.arc_offset[2] = value;
        self.block.flags.words |= WordFlags::K;
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.block.comment = Some(console_text(text));
        self
    }

    pub fn message(mut self, text: &str) -> Self {
        self.block.message = Some(console_text(text));
        self
    }

    pub fn build(self) -> GCodeBlock {
        self.block
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::axis::AxisFlags;

    #[test]
    fn codes_set_values_and_flags() {
        let block = BlockBuilder::new()
            .code(BlockCodes::G20)
            .code(BlockCodes::G91)
            .code(BlockCodes::G18)
            .code(BlockCodes::G0)
            .build();
        assert_eq!(block.values.units_mode, UnitsMode::Inches);
        assert_eq!(block.values.distance_mode, DistanceMode::Incremental);
        assert_eq!(block.values.select_plane, Plane::Xz);
        assert_eq!(block.values.plane_axis_2, Axis::Y);
        assert_eq!(block.values.motion_mode, MotionMode::StraightTraverse);
        assert!(block.flags.has_code(BlockCodes::G20 | BlockCodes::G91));
    }

    #[test]
    fn words_set_flags() {
        let block = BlockBuilder::new()
            .n(42)
            .x(10.0)
            .c(90.0)
            .f(250.0)
            .i(1.0)
            .k(-1.0)
            .build();
        assert_eq!(block.linenum, Some(42));
        assert_eq!(block.flags.axes, AxisFlags::X | AxisFlags::C);
        assert_eq!(block.values.target.x(), 10.0);
        assert!(block.flags.has_word(WordFlags::F));
        assert!(block.flags.words.contains(WordFlags::I | WordFlags::K));
        assert!(!block.flags.words.contains(WordFlags::J));
    }

    #[test]
    fn p_word_coord_number() {
        let b = BlockBuilder::new().code(BlockCodes::G10).l().p(2.0).build();
        assert_eq!(b.values.set_coord_offset, 2);
        assert_eq!(b.values.next_action, NextAction::SetCoordOffset);
        let b = BlockBuilder::new().code(BlockCodes::G10).p(1.5).build();
        assert_eq!(b.values.set_coord_offset, u8::MAX);
    }

    #[test]
    fn console_text_truncates() {
        let long = "x".repeat(CONSOLE_TEXT_CAPACITY + 10);
        assert_eq!(console_text(&long).len(), CONSOLE_TEXT_CAPACITY);
        assert_eq!(console_text("tool 3").as_str(), "tool 3");
    }
}
