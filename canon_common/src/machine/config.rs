//! Configuration structures for the canonical machine.
//!
//! This is the read-only configuration collaborator: power-on gcode defaults,
//! persisted G54..G59 offsets, per-axis modes and travel, homing parameters.
//! The machine layer reads these values and never writes them back.
//!
//! ```toml
//! [shared]
//! service_name = "mill-01"
//!
//! [defaults]
//! units = "millimeters"
//! plane = "xy"
//! coord_system = "g54"
//!
//! [offsets]
//! g54 = [10.0, 20.0, 0.0, 0.0, 0.0, 0.0]
//!
//! [machine]
//! tool_max = 24
//! soft_limits = true
//!
//! [[axes]]
//! axis = "X"
//! travel_min = 0.0
//! travel_max = 300.0
//! homing = { enabled = true, search_velocity = 1500.0 }
//!
//! [homing]
//! sequence = ["Z", "X", "Y"]
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::axis::{Axis, AxisVector};
use super::state::{
    AxisMode, CoordSystem, DistanceMode, FeedRateMode, PathControl, Plane, UnitsMode,
};
use crate::config::{ConfigError, SharedConfig, Validate};
use crate::consts::{COORD_SYSTEMS, HOLD_VELOCITY_EPSILON_DEFAULT, TOOL_MAX_DEFAULT};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete canonical machine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    /// Power-on / program-end gcode defaults.
    #[serde(default)]
    pub defaults: GCodeDefaults,
    /// Persisted work coordinate offsets.
    #[serde(default)]
    pub offsets: CoordOffsetsConfig,
    #[serde(default)]
    pub machine: MachineSettings,
    /// Per-axis settings; axes not listed use defaults.
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub homing: HomingConfig,
}

impl CanonConfig {
    /// Settings for `axis`, falling back to defaults if not listed.
    pub fn axis(&self, axis: Axis) -> AxisConfig {
        self.axes
            .iter()
            .find(|a| a.axis == axis)
            .cloned()
            .unwrap_or_else(|| AxisConfig::default_for(axis))
    }

    /// All six axis settings in vector order.
    pub fn axis_table(&self) -> [AxisConfig; 6] {
        Axis::ALL.map(|a| self.axis(a))
    }
}

impl Validate for CanonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.offsets.validate()?;
        self.machine.validate()?;
        validate_axes(&self.axes)?;
        self.homing.validate(self)?;
        Ok(())
    }
}

// ─── GCode Defaults ─────────────────────────────────────────────────

/// Modal values applied at power-on and restored by program end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GCodeDefaults {
    pub units: UnitsMode,
    pub plane: Plane,
    pub coord_system: CoordSystem,
    pub path_control: PathControl,
    pub distance_mode: DistanceMode,
    pub feed_rate_mode: FeedRateMode,
}

impl Default for GCodeDefaults {
    fn default() -> Self {
        Self {
            units: UnitsMode::Millimeters,
            plane: Plane::Xy,
            coord_system: CoordSystem::G54,
            path_control: PathControl::Continuous,
            distance_mode: DistanceMode::Absolute,
            feed_rate_mode: FeedRateMode::UnitsPerMinute,
        }
    }
}

// ─── Coordinate Offsets ─────────────────────────────────────────────

/// G54..G59 offsets, six values each (X Y Z A B C) in mm/deg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordOffsetsConfig {
    pub g54: [f64; 6],
    pub g55: [f64; 6],
    pub g56: [f64; 6],
    pub g57: [f64; 6],
    pub g58: [f64; 6],
    pub g59: [f64; 6],
}

impl CoordOffsetsConfig {
    /// Offset table indexed by `CoordSystem::index()`. Machine coordinates are zero.
    pub fn table(&self) -> [AxisVector; COORD_SYSTEMS] {
        [
            AxisVector::ZERO,
            self.g54.into(),
            self.g55.into(),
            self.g56.into(),
            self.g57.into(),
            self.g58.into(),
            self.g59.into(),
        ]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (cs, offsets) in CoordSystem::ALL.iter().zip(self.table()) {
            if !offsets.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "offsets for {cs:?} must be finite"
                )));
            }
        }
        Ok(())
    }
}

// ─── Machine Settings ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Highest accepted T number.
    pub tool_max: u8,
    /// Enforce axis travel on resolved targets once homed.
    pub soft_limits: bool,
    /// Velocity treated as stopped when decelerating into a feedhold [mm/min].
    pub hold_velocity_epsilon: f64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            tool_max: TOOL_MAX_DEFAULT,
            soft_limits: false,
            hold_velocity_epsilon: HOLD_VELOCITY_EPSILON_DEFAULT,
        }
    }
}

impl MachineSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tool_max == 0 {
            return Err(ConfigError::ValidationError(
                "tool_max must be at least 1".to_string(),
            ));
        }
        if !(self.hold_velocity_epsilon > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "hold_velocity_epsilon {} must be positive",
                self.hold_velocity_epsilon
            )));
        }
        Ok(())
    }
}

// ─── Axis Config ────────────────────────────────────────────────────

/// Per-axis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub axis: Axis,
    #[serde(default)]
    pub mode: AxisMode,
    /// Lower travel bound [mm/deg].
    #[serde(default = "default_travel_min")]
    pub travel_min: f64,
    /// Upper travel bound [mm/deg].
    #[serde(default = "default_travel_max")]
    pub travel_max: f64,
    /// Rotary radius for `AxisMode::Radius` [mm].
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub homing: AxisHomingConfig,
}

fn default_travel_min() -> f64 {
    -1.0e6
}
fn default_travel_max() -> f64 {
    1.0e6
}

impl AxisConfig {
    pub fn default_for(axis: Axis) -> Self {
        Self {
            axis,
            mode: AxisMode::Standard,
            travel_min: default_travel_min(),
            travel_max: default_travel_max(),
            radius: 0.0,
            homing: AxisHomingConfig::default(),
        }
    }

    /// Whether `value` lies within travel.
    #[inline]
    pub fn in_travel(&self, value: f64) -> bool {
        value >= self.travel_min && value <= self.travel_max
    }
}

fn validate_axes(axes: &[AxisConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for ax in axes {
        if !seen.insert(ax.axis) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate axis {}",
                ax.axis
            )));
        }
        if !(ax.travel_min < ax.travel_max) {
            return Err(ConfigError::ValidationError(format!(
                "axis {}: travel_min {} must be below travel_max {}",
                ax.axis, ax.travel_min, ax.travel_max
            )));
        }
        if ax.mode == AxisMode::Radius {
            if ax.axis.is_linear() {
                return Err(ConfigError::ValidationError(format!(
                    "axis {}: radius mode is only valid for rotary axes",
                    ax.axis
                )));
            }
            if !(ax.radius > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "axis {}: radius mode requires radius > 0",
                    ax.axis
                )));
            }
        }
        ax.homing.validate(ax.axis)?;
    }
    Ok(())
}

// ─── Homing Config ──────────────────────────────────────────────────

/// Homing approach direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomingDirection {
    Positive = 0,
    #[default]
    Negative = 1,
}

impl HomingDirection {
    /// Sign multiplier for search moves.
    #[inline]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// Per-axis homing parameters.
///
/// Search travels up to the axis' full travel toward the switch; the latch
/// phase backs off and re-approaches slowly; the zero backoff leaves the
/// switch before the position is set to `home_position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisHomingConfig {
    pub enabled: bool,
    pub direction: HomingDirection,
    /// [mm/min]
    pub search_velocity: f64,
    /// [mm/min]
    pub latch_velocity: f64,
    /// [mm]
    pub latch_backoff: f64,
    /// [mm]
    pub zero_backoff: f64,
    /// Machine position assigned once homed [mm/deg].
    pub home_position: f64,
}

impl Default for AxisHomingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: HomingDirection::Negative,
            search_velocity: 1000.0,
            latch_velocity: 100.0,
            latch_backoff: 5.0,
            zero_backoff: 1.0,
            home_position: 0.0,
        }
    }
}

impl AxisHomingConfig {
    fn validate(&self, axis: Axis) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.search_velocity > 0.0) || !(self.latch_velocity > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis {axis}: homing velocities must be positive"
            )));
        }
        if !(self.latch_backoff >= 0.0) || !(self.zero_backoff >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis {axis}: homing backoffs must be non-negative"
            )));
        }
        if !self.home_position.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "axis {axis}: home_position must be finite"
            )));
        }
        Ok(())
    }
}

/// Homing cycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// Order axes are homed in.
    pub sequence: Vec<Axis>,
    /// Start as homed (persisted flag from a previous session).
    pub restore_homed: bool,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            sequence: vec![Axis::Z, Axis::X, Axis::Y, Axis::A, Axis::B, Axis::C],
            restore_homed: false,
        }
    }
}

impl HomingConfig {
    fn validate(&self, config: &CanonConfig) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for axis in &self.sequence {
            if !seen.insert(*axis) {
                return Err(ConfigError::ValidationError(format!(
                    "homing sequence lists axis {axis} twice"
                )));
            }
            if config.axis(*axis).mode == AxisMode::Disabled && config.axis(*axis).homing.enabled {
                return Err(ConfigError::ValidationError(format!(
                    "axis {axis} is disabled but has homing enabled"
                )));
            }
        }
        Ok(())
    }
}
