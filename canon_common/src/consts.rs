//! System-wide constants for the canonical machine workspace.
//!
//! Single source of truth for numeric limits and conversion factors.

use static_assertions::const_assert_eq;

/// Number of axes carried in every axis vector (X, Y, Z, A, B, C).
pub const AXES: usize = 6;

/// Number of linear axes (X, Y, Z). Remaining axes are rotary.
pub const LINEAR_AXES: usize = 3;

/// Millimeters per inch (G20 → G21 scale).
pub const MM_PER_INCH: f64 = 25.4;

/// Number of coordinate systems including machine coordinates (ABSOLUTE, G54..G59).
pub const COORD_SYSTEMS: usize = 7;

/// Default highest tool number accepted by T words.
pub const TOOL_MAX_DEFAULT: u8 = 32;

/// Radius-mode arcs accept a negative chord discriminant down to this value
/// and treat it as an exact half-circle (floating-point slack).
pub const ARC_RADIUS_TOLERANCE: f64 = 1e-9;

/// Arcs with a radius below this are degenerate [mm].
pub const ARC_MIN_RADIUS: f64 = 1e-6;

/// Absolute slack between start and end radius of a center-format arc [mm].
pub const ARC_ENDPOINT_TOLERANCE: f64 = 0.005;

/// Relative slack between start and end radius of a center-format arc.
pub const ARC_ENDPOINT_TOLERANCE_REL: f64 = 0.001;

/// Velocity below which a decelerating feedhold counts as stopped [mm/min].
pub const HOLD_VELOCITY_EPSILON_DEFAULT: f64 = 1e-3;

/// Capacity of the per-block outbound request buffer.
pub const OUTBOX_CAPACITY: usize = 16;

/// Capacity of console comment/message strings.
pub const CONSOLE_TEXT_CAPACITY: usize = 128;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/canon/machine.toml";

const_assert_eq!(AXES, 6);
const_assert_eq!(COORD_SYSTEMS, 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(LINEAR_AXES < AXES);
        assert!(OUTBOX_CAPACITY >= 8);
        assert!(TOOL_MAX_DEFAULT > 0);
        assert!(ARC_RADIUS_TOLERANCE < ARC_MIN_RADIUS);
    }

    #[test]
    fn inch_scale() {
        assert!((MM_PER_INCH * 2.0 - 50.8).abs() < 1e-12);
    }
}
