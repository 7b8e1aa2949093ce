//! Unit & Coordinate Resolver.
//!
//! Turns programmed axis values into absolute machine-space targets:
//!
//! ```text
//! absolute:     target = to_mm(input) + coord_offset + origin_offset (if active)
//! G53:          target = to_mm(input)
//! incremental:  target = position + to_mm(input)
//! unset axis:   target = position
//! ```
//!
//! Linear values scale by 25.4 in G20. Rotary values are degrees, except
//! rotary axes in radius mode, which take a linear distance along the
//! circumference. Pure functions only; nothing here commits state.

use std::f64::consts::PI;

use canon_common::machine::axis::{Axis, AxisFlags, AxisVector};
use canon_common::machine::config::AxisConfig;
use canon_common::machine::error::CanonError;
use canon_common::machine::model::GCodeModel;
use canon_common::machine::state::{AxisMode, DistanceMode, FeedRateMode, UnitsMode};

/// Inputs the resolver reads besides the programmed values.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Committed model; modal selectors of the current block are already in it.
    pub committed: &'a GCodeModel,
    /// Offset of the active coordinate system.
    pub coord_offset: AxisVector,
    /// Per-axis settings.
    pub axes: &'a [AxisConfig; 6],
}

impl ResolveContext<'_> {
    /// Origin offset for `axis` if applied, zero otherwise.
    #[inline]
    fn origin_offset(&self, axis: Axis) -> f64 {
        if self.committed.origin_offset_mode {
            self.committed.origin_offset[axis]
        } else {
            0.0
        }
    }

    /// Coordinate plus origin offset for `axis`, zero under G53.
    #[inline]
    pub fn offset(&self, axis: Axis) -> f64 {
        if self.committed.absolute_override {
            0.0
        } else {
            self.coord_offset[axis] + self.origin_offset(axis)
        }
    }
}

/// Convert one programmed value to mm (linear) or degrees (rotary).
pub fn to_canonical(units: UnitsMode, axis: &AxisConfig, value: f64) -> f64 {
    if axis.axis.is_linear() {
        units.to_mm(value)
    } else if axis.mode == AxisMode::Radius {
        units.to_mm(value) * 360.0 / (2.0 * PI * axis.radius)
    } else {
        value
    }
}

/// Inverse of [`to_canonical`].
pub fn from_canonical(units: UnitsMode, axis: &AxisConfig, value: f64) -> f64 {
    if axis.axis.is_linear() {
        units.from_mm(value)
    } else if axis.mode == AxisMode::Radius {
        units.from_mm(value * 2.0 * PI * axis.radius / 360.0)
    } else {
        value
    }
}

/// Resolve the absolute machine-space target of the current block.
///
/// Axes not in `flags` and disabled axes keep the committed position.
pub fn resolve_target(
    values: &AxisVector,
    flags: AxisFlags,
    ctx: &ResolveContext<'_>,
) -> Result<AxisVector, CanonError> {
    let m = ctx.committed;
    let mut target = m.position;
    for axis in flags.axes() {
        let cfg = &ctx.axes[axis.index()];
        if cfg.mode == AxisMode::Disabled {
            continue;
        }
        let input = values[axis];
        if !input.is_finite() {
            return Err(CanonError::AxisRangeError { axis, value: input });
        }
        let value = to_canonical(m.units_mode, cfg, input);
        target[axis] = match m.distance_mode {
            DistanceMode::Incremental => m.position[axis] + value,
            DistanceMode::Absolute => value + ctx.offset(axis),
        };
    }
    Ok(target)
}

/// Programmed value that resolves to `target` for `axis` (inverse transform).
pub fn unresolve_axis(target: f64, axis: Axis, ctx: &ResolveContext<'_>) -> f64 {
    let m = ctx.committed;
    let cfg = &ctx.axes[axis.index()];
    let canonical = match m.distance_mode {
        DistanceMode::Incremental => target - m.position[axis],
        DistanceMode::Absolute => target - ctx.offset(axis),
    };
    from_canonical(m.units_mode, cfg, canonical)
}

/// Normalize a programmed F word.
///
/// Units-per-minute feeds scale with units; inverse time stays in minutes⁻¹.
pub fn normalize_feed_rate(mode: FeedRateMode, units: UnitsMode, value: f64) -> f64 {
    match mode {
        FeedRateMode::UnitsPerMinute => units.to_mm(value),
        FeedRateMode::InverseTime => value,
    }
}

/// Axes the planner must compute but not actuate.
pub fn inhibited_axes(axes: &[AxisConfig; 6]) -> AxisFlags {
    axes.iter()
        .filter(|a| a.mode == AxisMode::Inhibited)
        .fold(AxisFlags::empty(), |acc, a| acc | a.axis.flag())
}

/// Soft limit check of a resolved target.
pub fn check_travel(target: &AxisVector, axes: &[AxisConfig; 6]) -> Result<(), CanonError> {
    for cfg in axes {
        if cfg.mode == AxisMode::Disabled {
            continue;
        }
        let value = target[cfg.axis];
        if !cfg.in_travel(value) {
            return Err(CanonError::AxisRangeError {
                axis: cfg.axis,
                value,
            });
        }
    }
    Ok(())
}
