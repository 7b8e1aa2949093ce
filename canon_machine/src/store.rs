//! Modal State Store.
//!
//! Holds the three gcode model records, the working coordinate-offset table
//! and the process-wide runtime (counters plus the three state machines).
//! The store decides nothing about legality; it stages blocks, hands out
//! snapshots for rollback and exposes read accessors.

use canon_common::consts::COORD_SYSTEMS;
use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::block::GCodeBlock;
use canon_common::machine::config::GCodeDefaults;
use canon_common::machine::model::{GCodeFlags, GCodeModel};
use canon_common::machine::state::{
    CoordSystem, FeedholdState, HomingState, MachineState, MotionMode, SpindleMode, UnitsMode,
};

use crate::state::feedhold::FeedholdStateMachine;
use crate::state::homing::HomingStateMachine;
use crate::state::machine::MachineStateMachine;

// ─── Runtime ────────────────────────────────────────────────────────

/// Process-wide runtime values, power-on to reset.
#[derive(Debug, Clone, Default)]
pub struct MachineRuntime {
    /// Executed block count.
    pub linecount: u32,
    /// Last reported source line number.
    pub linenum: u32,
    pub machine: MachineStateMachine,
    pub hold: FeedholdStateMachine,
    pub homing: HomingStateMachine,
    /// Incremented on every reportable event; wraps.
    pub status_report_counter: u32,
}

impl MachineRuntime {
    #[inline]
    pub fn machine_state(&self) -> MachineState {
        self.machine.state()
    }

    #[inline]
    pub fn hold_state(&self) -> FeedholdState {
        self.hold.state()
    }

    #[inline]
    pub fn homing_state(&self) -> HomingState {
        self.homing.state()
    }

    /// Advance the status report counter and return the new value.
    pub fn next_report(&mut self) -> u32 {
        self.status_report_counter = self.status_report_counter.wrapping_add(1);
        self.status_report_counter
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

/// Everything a failed block may have touched.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    committed: GCodeModel,
    coord_offsets: [AxisVector; COORD_SYSTEMS],
}

// ─── Store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModalStore {
    /// Normalized canonical state.
    pub committed: GCodeModel,
    /// Values of the block being resolved, as programmed.
    pub incoming: GCodeModel,
    /// What the current block set.
    pub flags: GCodeFlags,
    /// Working copy of the coordinate offset table, indexed by `CoordSystem::index()`.
    pub coord_offsets: [AxisVector; COORD_SYSTEMS],
    pub runtime: MachineRuntime,
}

impl ModalStore {
    /// Store at power-on: defaults applied, offsets seeded from configuration.
    pub fn new(
        defaults: &GCodeDefaults,
        coord_offsets: [AxisVector; COORD_SYSTEMS],
        homed: bool,
    ) -> Self {
        let mut committed = GCodeModel::default();
        apply_defaults(&mut committed, defaults);
        Self {
            incoming: committed.carry_forward(),
            committed,
            flags: GCodeFlags::default(),
            coord_offsets,
            runtime: MachineRuntime {
                homing: HomingStateMachine::restored(homed),
                ..MachineRuntime::default()
            },
        }
    }

    /// Load a parsed block into the incoming records.
    pub fn stage(&mut self, block: &GCodeBlock) {
        self.incoming = block.values.clone();
        self.flags = block.flags;
        self.runtime.linenum = block
            .linenum
            .unwrap_or_else(|| self.runtime.linecount.wrapping_add(1));
    }

    /// Reset incoming records to the committed state (no words set).
    pub fn clear_incoming(&mut self) {
        self.incoming = self.committed.carry_forward();
        self.flags = GCodeFlags::default();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            committed: self.committed.clone(),
            coord_offsets: self.coord_offsets,
        }
    }

    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.committed = snapshot.committed;
        self.coord_offsets = snapshot.coord_offsets;
    }

    /// Offset of the active coordinate system.
    #[inline]
    pub fn active_coord_offset(&self) -> AxisVector {
        self.coord_offsets[self.committed.coord_system.index()]
    }

    /// Origin offset if currently applied, zero otherwise.
    #[inline]
    pub fn active_origin_offset(&self) -> AxisVector {
        if self.committed.origin_offset_mode {
            self.committed.origin_offset
        } else {
            AxisVector::ZERO
        }
    }

    /// Sum of all offsets applied to the committed position for one axis.
    pub fn total_offset(&self, axis: Axis) -> f64 {
        self.active_coord_offset()[axis] + self.active_origin_offset()[axis]
    }

    /// Work position of `axis` in the current units.
    pub fn work_position(&self, axis: Axis) -> f64 {
        let value = self.committed.position[axis] - self.total_offset(axis);
        to_display_units(self.committed.units_mode, axis, value)
    }

    /// Set committed position and target directly (machine coordinates).
    pub fn set_machine_coords(&mut self, position: AxisVector) {
        self.committed.position = position;
        self.committed.target = position;
    }

    /// Commit the current target as the new position.
    pub fn commit_target(&mut self, target: AxisVector) {
        self.committed.target = target;
        self.committed.position = target;
    }

    /// Modal reset applied at program end.
    pub fn reset_modal(&mut self, defaults: &GCodeDefaults) {
        let m = &mut self.committed;
        m.origin_offset = AxisVector::ZERO;
        m.origin_offset_mode = false;
        m.set_plane(defaults.plane);
        m.coord_system = defaults.coord_system;
        m.distance_mode = defaults.distance_mode;
        m.feed_rate_mode = defaults.feed_rate_mode;
        m.path_control = defaults.path_control;
        m.spindle_mode = SpindleMode::Off;
        m.motion_mode = MotionMode::StraightFeed;
    }

    /// Active coordinate system.
    #[inline]
    pub fn coord_system(&self) -> CoordSystem {
        self.committed.coord_system
    }
}

fn apply_defaults(model: &mut GCodeModel, defaults: &GCodeDefaults) {
    model.units_mode = defaults.units;
    model.set_plane(defaults.plane);
    model.coord_system = defaults.coord_system;
    model.path_control = defaults.path_control;
    model.distance_mode = defaults.distance_mode;
    model.feed_rate_mode = defaults.feed_rate_mode;
}

/// Convert a normalized value to the units it is displayed in.
#[inline]
pub fn to_display_units(units: UnitsMode, axis: Axis, value: f64) -> f64 {
    if axis.is_linear() {
        units.from_mm(value)
    } else {
        value
    }
}
