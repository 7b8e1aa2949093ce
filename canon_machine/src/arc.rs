//! Arc geometry in the selected plane.
//!
//! Center-format arcs give the center as I/J/K offsets from the start point.
//! Radius-format arcs give R; the center is one of two points on the chord's
//! perpendicular bisector. For a chord (x, y) and radius r:
//!
//! ```text
//! h = -sqrt(4r² - x² - y²) / hypot(x, y)     (negated for CCW, again for R < 0)
//! i = (x - y·h) / 2
//! j = (y + x·h) / 2
//! ```
//!
//! Positive R selects the arc of at most 180°, negative R the longer one.

use std::f64::consts::PI;

use canon_common::consts::{
    ARC_ENDPOINT_TOLERANCE, ARC_ENDPOINT_TOLERANCE_REL, ARC_MIN_RADIUS, ARC_RADIUS_TOLERANCE,
};
use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::error::CanonError;
use canon_common::machine::state::Direction;

/// Arc parameters handed to the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    /// Center in the plane's first two axes, machine coordinates [mm].
    pub center: [f64; 2],
    /// [mm]
    pub radius: f64,
    /// Signed sweep [rad]; negative is clockwise.
    pub angular_travel: f64,
    /// Travel along the plane normal (helix) [mm].
    pub linear_travel: f64,
    /// Path length [mm].
    pub length: f64,
}

/// Center offset (from `start`) of a radius-format arc.
///
/// Fails if the radius is smaller than half the chord or the endpoints coincide.
pub fn radius_to_center_offset(
    start: [f64; 2],
    end: [f64; 2],
    radius: f64,
    direction: Direction,
) -> Result<[f64; 2], CanonError> {
    let x = end[0] - start[0];
    let y = end[1] - start[1];
    let chord = x.hypot(y);
    if chord < ARC_MIN_RADIUS {
        return Err(CanonError::ArcGeometryError {
            reason: "radius arc end point equals start point",
        });
    }

    let mut disc = 4.0 * radius * radius - x * x - y * y;
    if disc < -ARC_RADIUS_TOLERANCE {
        return Err(CanonError::ArcGeometryError {
            reason: "radius smaller than half the chord",
        });
    }
    if disc < 0.0 {
        disc = 0.0;
    }

    let mut h = -disc.sqrt() / chord;
    if direction == Direction::Ccw {
        h = -h;
    }
    if radius < 0.0 {
        h = -h;
    }
    Ok([(x - y * h) / 2.0, (y + x * h) / 2.0])
}

/// Full arc geometry from start, target, plane axes and center offset.
///
/// `plane` is `[axis_0, axis_1, normal]`. A center-format arc whose end point
/// equals its start point is a full circle.
pub fn arc_geometry(
    start: &AxisVector,
    target: &AxisVector,
    plane: [Axis; 3],
    offset: [f64; 2],
    direction: Direction,
    radius_format: bool,
) -> Result<ArcGeometry, CanonError> {
    let [a0, a1, normal] = plane;
    let radius = offset[0].hypot(offset[1]);
    if radius < ARC_MIN_RADIUS {
        return Err(CanonError::ArcGeometryError {
            reason: "zero radius arc",
        });
    }
    let center = [start[a0] + offset[0], start[a1] + offset[1]];

    // start and end vectors relative to the center
    let rs = [-offset[0], -offset[1]];
    let re = [target[a0] - center[0], target[a1] - center[1]];

    let end_radius = re[0].hypot(re[1]);
    if (end_radius - radius).abs() > ARC_ENDPOINT_TOLERANCE + ARC_ENDPOINT_TOLERANCE_REL * radius {
        return Err(CanonError::ArcGeometryError {
            reason: "end point is not on the arc",
        });
    }

    let chord = (target[a0] - start[a0]).hypot(target[a1] - start[a1]);
    let angular_travel = if chord < ARC_MIN_RADIUS && !radius_format {
        match direction {
            Direction::Cw => -2.0 * PI,
            Direction::Ccw => 2.0 * PI,
        }
    } else {
        let cross = rs[0] * re[1] - rs[1] * re[0];
        let dot = rs[0] * re[0] + rs[1] * re[1];
        let mut angle = cross.atan2(dot);
        match direction {
            Direction::Cw if angle >= 0.0 => angle -= 2.0 * PI,
            Direction::Ccw if angle <= 0.0 => angle += 2.0 * PI,
            _ => {}
        }
        angle
    };

    let linear_travel = target[normal] - start[normal];
    let length = (angular_travel * radius).hypot(linear_travel);

    Ok(ArcGeometry {
        center,
        radius,
        angular_travel,
        linear_travel,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XY: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exact_half_circle_center() {
        let off = radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 5.0, Direction::Cw).unwrap();
        assert!(close(off[0], 5.0) && close(off[1], 0.0), "{off:?}");
    }

    #[test]
    fn slightly_larger_radius_succeeds() {
        let off =
            radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 5.0001, Direction::Cw).unwrap();
        assert!(close(off[0], 5.0));
        assert!(off[1] < 0.0, "cw short arc has its center below the chord");
    }

    #[test]
    fn radius_too_small_fails() {
        assert_eq!(
            radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 4.9, Direction::Cw),
            Err(CanonError::ArcGeometryError {
                reason: "radius smaller than half the chord"
            })
        );
    }

    #[test]
    fn coincident_endpoints_fail_in_radius_format() {
        assert!(radius_to_center_offset([1.0, 1.0], [1.0, 1.0], 5.0, Direction::Ccw).is_err());
    }

    #[test]
    fn direction_and_sign_select_center() {
        let cw = radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 10.0, Direction::Cw).unwrap();
        let ccw = radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 10.0, Direction::Ccw).unwrap();
        let cw_long =
            radius_to_center_offset([0.0, 0.0], [10.0, 0.0], -10.0, Direction::Cw).unwrap();
        assert!(cw[1] < 0.0);
        assert!(ccw[1] > 0.0);
        assert!(close(cw_long[1], ccw[1]));
    }

    #[test]
    fn short_and_long_sweeps() {
        let start = AxisVector::ZERO;
        let end = AxisVector::xyz(10.0, 0.0, 0.0);
        let short = radius_to_center_offset([0.0, 0.0], [10.0, 0.0], 10.0, Direction::Cw).unwrap();
        let g = arc_geometry(&start, &end, XY, short, Direction::Cw, true).unwrap();
        assert!(g.angular_travel < 0.0 && g.angular_travel > -PI);

        let long = radius_to_center_offset([0.0, 0.0], [10.0, 0.0], -10.0, Direction::Cw).unwrap();
        let g = arc_geometry(&start, &end, XY, long, Direction::Cw, true).unwrap();
        assert!(g.angular_travel < -PI);
        assert!(close(g.radius, 10.0));
    }

    #[test]
    fn half_circle_geometry() {
        let g = arc_geometry(
            &AxisVector::ZERO,
            &AxisVector::xyz(10.0, 0.0, 2.0),
            XY,
            [5.0, 0.0],
            Direction::Ccw,
            false,
        )
        .unwrap();
        assert_eq!(g.center, [5.0, 0.0]);
        assert!(close(g.angular_travel, PI));
        assert_eq!(g.linear_travel, 2.0);
        assert!(close(g.length, (5.0 * PI).hypot(2.0)));
    }

    #[test]
    fn full_circle_in_center_format() {
        let p = AxisVector::xyz(3.0, 4.0, 0.0);
        let g = arc_geometry(&p, &p, XY, [0.0, 5.0], Direction::Cw, false).unwrap();
        assert!(close(g.angular_travel, -2.0 * PI));
        assert_eq!(g.center, [3.0, 9.0]);
    }

    #[test]
    fn other_planes_use_their_axes() {
        // G18: X, Z in plane, Y is normal
        let g = arc_geometry(
            &AxisVector::ZERO,
            &AxisVector::xyz(10.0, 1.0, 0.0),
            [Axis::X, Axis::Z, Axis::Y],
            [5.0, 0.0],
            Direction::Cw,
            false,
        )
        .unwrap();
        assert_eq!(g.linear_travel, 1.0);
        assert!(close(g.angular_travel, -PI));
    }

    #[test]
    fn zero_radius_and_bad_endpoint() {
        let err = arc_geometry(
            &AxisVector::ZERO,
            &AxisVector::xyz(1.0, 0.0, 0.0),
            XY,
            [0.0, 0.0],
            Direction::Cw,
            false,
        );
        assert!(matches!(err, Err(CanonError::ArcGeometryError { .. })));
        let err = arc_geometry(
            &AxisVector::ZERO,
            &AxisVector::xyz(20.0, 0.0, 0.0),
            XY,
            [5.0, 0.0],
            Direction::Cw,
            false,
        );
        assert_eq!(
            err,
            Err(CanonError::ArcGeometryError {
                reason: "end point is not on the arc"
            })
        );
    }
}
