//! TOML configuration loader with validation.
//!
//! Parses a [`CanonConfig`], validates it and derives the runtime tables the
//! dispatcher reads: per-axis settings in vector order, the seeded coordinate
//! offset table and the effective homing sequence.

use std::path::Path;

use canon_common::config::{ConfigError, ConfigLoader, Validate};
use canon_common::consts::{AXES, COORD_SYSTEMS};
use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::config::{AxisConfig, CanonConfig};
use canon_common::machine::state::AxisMode;
use tracing::{info, warn};

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CanonConfig,
    /// Per-axis settings indexed by `Axis::index()`.
    pub axes: [AxisConfig; AXES],
    /// Persisted offsets indexed by `CoordSystem::index()`.
    pub coord_offsets: [AxisVector; COORD_SYSTEMS],
    /// Axes the homing cycle visits, in order.
    pub homing_sequence: heapless::Vec<Axis, AXES>,
}

impl LoadedConfig {
    /// Validate `config` and derive the runtime tables.
    pub fn from_config(config: CanonConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let loaded = Self::derive(config)?;

        if loaded.config.machine.soft_limits
            && loaded.homing_sequence.is_empty()
            && !loaded.config.homing.restore_homed
        {
            warn!("soft limits enabled but no axis can be homed; limits will never apply");
        }
        Ok(loaded)
    }

    fn derive(config: CanonConfig) -> Result<Self, ConfigError> {
        let axes = config.axis_table();
        let mut homing_sequence = heapless::Vec::new();
        for axis in &config.homing.sequence {
            let cfg = &axes[axis.index()];
            if cfg.homing.enabled && cfg.mode != AxisMode::Disabled {
                homing_sequence.push(*axis).map_err(|_| {
                    ConfigError::ValidationError("homing sequence too long".to_string())
                })?;
            }
        }
        Ok(Self {
            coord_offsets: config.offsets.table(),
            axes,
            homing_sequence,
            config,
        })
    }
}

impl Default for LoadedConfig {
    fn default() -> Self {
        let config = CanonConfig::default();
        Self {
            axes: config.axis_table(),
            coord_offsets: config.offsets.table(),
            homing_sequence: heapless::Vec::new(),
            config,
        }
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let config = CanonConfig::load(path)?;
    let loaded = LoadedConfig::from_config(config)?;
    info!(
        path = %path.display(),
        service = %loaded.config.shared.service_name,
        homing_axes = loaded.homing_sequence.len(),
        "configuration validated"
    );
    Ok(loaded)
}

/// Parse and validate an in-memory TOML document.
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    LoadedConfig::from_config(CanonConfig::from_toml_str(content)?)
}
