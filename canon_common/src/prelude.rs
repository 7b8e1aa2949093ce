//! Prelude module for common re-exports.
//!
//! ```rust
//! use canon_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};
pub use crate::machine::config::CanonConfig;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXES, MM_PER_INCH};

// ─── Domain Types ───────────────────────────────────────────────────
pub use crate::machine::axis::{Axis, AxisFlags, AxisVector};
pub use crate::machine::block::{BlockBuilder, GCodeBlock};
pub use crate::machine::codes::{BlockCodes, ModalGroup};
pub use crate::machine::error::CanonError;
pub use crate::machine::model::{GCodeFlags, GCodeModel, WordFlags};
pub use crate::machine::state::{
    CoordSystem, DistanceMode, FeedRateMode, FeedholdState, HomingState, MachineState,
    MotionMode, PathControl, Plane, SpindleMode, UnitsMode,
};
pub use crate::machine::status::StatusReport;
