//! Status report payload.
//!
//! Short keys keep the JSON line compact on a serial console:
//!
//! ```json
//! {"seq":3,"line":20,"lc":4,"stat":"run","hold":"off","homd":"homed",
//!  "unit":"millimeters","coor":"g54","dist":"absolute","momo":"straight_feed",
//!  "feed":100.0,"vel":0.0,"wpos":[15.0,0.0,0.0,0.0,0.0,0.0],"mpos":[...]}
//! ```

use serde::{Deserialize, Serialize};

use super::state::{
    CoordSystem, DistanceMode, FeedholdState, HomingState, MachineState, MotionMode, UnitsMode,
};

/// Snapshot of committed and runtime state for one reportable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Report sequence number (wraps).
    #[serde(rename = "seq")]
    pub counter: u32,
    /// Last reported source line number.
    #[serde(rename = "line")]
    pub linenum: u32,
    /// Executed block count.
    #[serde(rename = "lc")]
    pub linecount: u32,
    #[serde(rename = "stat")]
    pub machine_state: MachineState,
    #[serde(rename = "hold")]
    pub hold_state: FeedholdState,
    #[serde(rename = "homd")]
    pub homing_state: HomingState,
    #[serde(rename = "unit")]
    pub units_mode: UnitsMode,
    #[serde(rename = "coor")]
    pub coord_system: CoordSystem,
    #[serde(rename = "dist")]
    pub distance_mode: DistanceMode,
    #[serde(rename = "momo")]
    pub motion_mode: MotionMode,
    /// Committed feed rate in current units per minute.
    #[serde(rename = "feed")]
    pub feed_rate: f64,
    /// Planner runtime velocity [mm/min].
    #[serde(rename = "vel")]
    pub velocity: f64,
    /// Model work position in current units.
    #[serde(rename = "wpos")]
    pub work_position: [f64; 6],
    /// Planner runtime machine position [mm/deg].
    #[serde(rename = "mpos")]
    pub machine_position: [f64; 6],
}

impl StatusReport {
    /// True while the machine may still be moving.
    pub fn is_active(&self) -> bool {
        matches!(
            self.machine_state,
            MachineState::Run | MachineState::Homing | MachineState::EndHold
        ) || self.hold_state != FeedholdState::Off
    }
}
