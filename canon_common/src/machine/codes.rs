//! G/M code masks and modal groups.
//!
//! A parsed block records every G and M code it contains as one bit in
//! [`BlockCodes`]. Modal groups are fixed masks over those bits; a block is
//! legal when no group has more than one bit set.
//!
//! | Group            | Codes                                        |
//! |------------------|----------------------------------------------|
//! | NonModal (0)     | G4 G10 G28 G28.1 G30 G53 G92 G92.1 G92.2 G92.3 |
//! | Motion (1)       | G0 G1 G2 G3 G80 G38.2 G81..G89               |
//! | Plane (2)        | G17 G18 G19                                  |
//! | Distance (3)     | G90 G91                                      |
//! | ProgramStop (4)  | M0 M1 M2 M30                                 |
//! | FeedRateMode (5) | G93 G94                                      |
//! | Units (6)        | G20 G21                                      |
//! | Spindle (7)      | M3 M4 M5                                     |
//! | CoordSystem (12) | G54 .. G59                                   |
//! | PathControl (13) | G61 G61.1 G64                                |

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

bitflags! {
    /// Set of G/M codes present in one block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BlockCodes: u64 {
        // Non-modal
        const G4    = 1 << 0;
        const G10   = 1 << 1;
        const G28   = 1 << 2;
        const G28_1 = 1 << 3;
        const G30   = 1 << 4;
        const G53   = 1 << 5;
        const G92   = 1 << 6;
        const G92_1 = 1 << 7;
        const G92_2 = 1 << 8;
        const G92_3 = 1 << 9;
        // Motion
        const G0    = 1 << 10;
        const G1    = 1 << 11;
        const G2    = 1 << 12;
        const G3    = 1 << 13;
        const G80   = 1 << 14;
        const G38_2 = 1 << 15;
        const G81   = 1 << 16;
        const G82   = 1 << 17;
        const G83   = 1 << 18;
        const G84   = 1 << 19;
        const G85   = 1 << 20;
        const G86   = 1 << 21;
        const G87   = 1 << 22;
        const G88   = 1 << 23;
        const G89   = 1 << 24;
        // Plane
        const G17   = 1 << 25;
        const G18   = 1 << 26;
        const G19   = 1 << 27;
        // Distance mode
        const G90   = 1 << 28;
        const G91   = 1 << 29;
        // Program stop
        const M0    = 1 << 30;
        const M1    = 1 << 31;
        const M2    = 1 << 32;
        const M30   = 1 << 33;
        // Feed rate mode
        const G93   = 1 << 34;
        const G94   = 1 << 35;
        // Units
        const G20   = 1 << 36;
        const G21   = 1 << 37;
        // Spindle
        const M3    = 1 << 38;
        const M4    = 1 << 39;
        const M5    = 1 << 40;
        // Coordinate system
        const G54   = 1 << 41;
        const G55   = 1 << 42;
        const G56   = 1 << 43;
        const G57   = 1 << 44;
        const G58   = 1 << 45;
        const G59   = 1 << 46;
        // Path control
        const G61   = 1 << 47;
        const G61_1 = 1 << 48;
        const G64   = 1 << 49;
        // Tool change
        const M6    = 1 << 50;
        // Recognized, not implemented
        const M7    = 1 << 51;
        const M8    = 1 << 52;
        const M9    = 1 << 53;
        const M48   = 1 << 54;
        const M49   = 1 << 55;
        const G40   = 1 << 56;
        const G41   = 1 << 57;
        const G42   = 1 << 58;
        const G43   = 1 << 59;
        const G49   = 1 << 60;
    }
}

const_assert!(BlockCodes::G49.bits() < (1u64 << 63));

impl BlockCodes {
    /// Canned cycles and probing: accepted as motion-group members for
    /// conflict checking, then reported as unimplemented.
    pub const UNIMPLEMENTED_MOTION: Self = Self::from_bits_truncate(
        Self::G38_2.bits()
            | Self::G81.bits()
            | Self::G82.bits()
            | Self::G83.bits()
            | Self::G84.bits()
            | Self::G85.bits()
            | Self::G86.bits()
            | Self::G87.bits()
            | Self::G88.bits()
            | Self::G89.bits(),
    );

    /// Coolant (M7/M8/M9).
    pub const COOLANT: Self =
        Self::from_bits_truncate(Self::M7.bits() | Self::M8.bits() | Self::M9.bits());

    /// Feed/speed override enable (M48/M49).
    pub const OVERRIDES: Self = Self::from_bits_truncate(Self::M48.bits() | Self::M49.bits());

    /// Cutter radius and tool length compensation.
    pub const COMPENSATION: Self = Self::from_bits_truncate(
        Self::G40.bits() | Self::G41.bits() | Self::G42.bits() | Self::G43.bits() | Self::G49.bits(),
    );

    /// Codes that set the G92 origin-offset family.
    pub const ORIGIN_OFFSET: Self = Self::from_bits_truncate(
        Self::G92.bits() | Self::G92_1.bits() | Self::G92_2.bits() | Self::G92_3.bits(),
    );

    /// Human-readable code list, e.g. `"G0 G1"`.
    pub fn describe(&self) -> String {
        self.iter_names()
            .map(|(name, _)| name.replace('_', "."))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─── Modal Groups ───────────────────────────────────────────────────

/// Mutually exclusive modal groups (RS274/NGC numbering in docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModalGroup {
    /// Group 0.
    NonModal = 0,
    /// Group 1.
    Motion = 1,
    /// Group 2.
    PlaneSelection = 2,
    /// Group 3.
    DistanceMode = 3,
    /// Group 4.
    ProgramStop = 4,
    /// Group 5.
    FeedRateMode = 5,
    /// Group 6.
    Units = 6,
    /// Group 7.
    SpindleTurning = 7,
    /// Group 12.
    CoordinateSystem = 12,
    /// Group 13.
    PathControl = 13,
}

impl ModalGroup {
    pub const ALL: [ModalGroup; 10] = [
        Self::NonModal,
        Self::Motion,
        Self::PlaneSelection,
        Self::DistanceMode,
        Self::ProgramStop,
        Self::FeedRateMode,
        Self::Units,
        Self::SpindleTurning,
        Self::CoordinateSystem,
        Self::PathControl,
    ];

    /// Codes belonging to this group.
    pub const fn members(&self) -> BlockCodes {
        use BlockCodes as C;
        let bits = match self {
            Self::NonModal => {
                C::G4.bits()
                    | C::G10.bits()
                    | C::G28.bits()
                    | C::G28_1.bits()
                    | C::G30.bits()
                    | C::G53.bits()
                    | C::ORIGIN_OFFSET.bits()
            }
            Self::Motion => {
                C::G0.bits()
                    | C::G1.bits()
                    | C::G2.bits()
                    | C::G3.bits()
                    | C::G80.bits()
                    | C::UNIMPLEMENTED_MOTION.bits()
            }
            Self::PlaneSelection => C::G17.bits() | C::G18.bits() | C::G19.bits(),
            Self::DistanceMode => C::G90.bits() | C::G91.bits(),
            Self::ProgramStop => C::M0.bits() | C::M1.bits() | C::M2.bits() | C::M30.bits(),
            Self::FeedRateMode => C::G93.bits() | C::G94.bits(),
            Self::Units => C::G20.bits() | C::G21.bits(),
            Self::SpindleTurning => C::M3.bits() | C::M4.bits() | C::M5.bits(),
            Self::CoordinateSystem => {
                C::G54.bits()
                    | C::G55.bits()
                    | C::G56.bits()
                    | C::G57.bits()
                    | C::G58.bits()
                    | C::G59.bits()
            }
            Self::PathControl => C::G61.bits() | C::G61_1.bits() | C::G64.bits(),
        };
        BlockCodes::from_bits_truncate(bits)
    }

    /// Group containing `code` (a single-bit mask), if any.
    pub fn of(code: BlockCodes) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.members().contains(code))
    }
}

impl std::fmt::Display for ModalGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NonModal => "non-modal",
            Self::Motion => "motion",
            Self::PlaneSelection => "plane selection",
            Self::DistanceMode => "distance mode",
            Self::ProgramStop => "program stop",
            Self::FeedRateMode => "feed rate mode",
            Self::Units => "units",
            Self::SpindleTurning => "spindle turning",
            Self::CoordinateSystem => "coordinate system selection",
            Self::PathControl => "path control",
        };
        write!(f, "{name} (group {})", *self as u8)
    }
}
