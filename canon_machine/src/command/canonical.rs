//! Canonical functions.
//!
//! Each public entry point is one transaction: it checks the machine state,
//! resolves its inputs, writes the committed model and buffers at most one
//! request per collaborator. The `op_*` bodies run inside a caller's
//! transaction so the block executor can chain them and commit once.
//!
//! Axis values passed in are as programmed (current units, work coordinates
//! unless the absolute override is set).

use canon_common::machine::axis::{AxisFlags, AxisVector};
use canon_common::machine::block::{console_text, ConsoleText};
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{
    CoordSystem, Direction, DistanceMode, FeedRateMode, MachineState, MotionMode, PathControl,
    Plane, ProgramFlow, SpindleMode, UnitsMode,
};
use tracing::{debug, warn};

use crate::arc::{arc_geometry, radius_to_center_offset};
use crate::collab::{
    ArcRequest, Console, CycleRequest, LineRequest, MoveKind, Outbound, Planner, PlannerRequest,
    ProgramAction, SpindleCommand, SpindleDriver,
};
use crate::command::dispatch::CanonicalMachine;
use crate::resolve::{
    check_travel, inhibited_axes, normalize_feed_rate, resolve_target, to_canonical,
    ResolveContext,
};

/// Arc center as programmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcCenter {
    /// I, J, K offsets from the start point, current units.
    Offset([f64; 3]),
    /// R word, current units; negative selects the arc over 180°.
    Radius(f64),
}

impl<P: Planner, S: SpindleDriver, C: Console> CanonicalMachine<P, S, C> {
    // ─── Modal Setters ──────────────────────────────────────────────

    /// G17 / G18 / G19.
    pub fn select_plane(&mut self, plane: Plane) -> Result<(), CanonError> {
        self.transact(|m| m.op_select_plane(plane))
    }

    pub(crate) fn op_select_plane(&mut self, plane: Plane) -> Result<(), CanonError> {
        self.require_modal("select plane")?;
        self.store.committed.set_plane(plane);
        debug!(?plane, "plane selected");
        Ok(())
    }

    /// G20 / G21.
    pub fn set_units_mode(&mut self, units: UnitsMode) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_units_mode(units))
    }

    pub(crate) fn op_set_units_mode(&mut self, units: UnitsMode) -> Result<(), CanonError> {
        self.require_modal("set units")?;
        self.store.committed.units_mode = units;
        debug!(?units, "units mode set");
        Ok(())
    }

    /// G90 / G91.
    pub fn set_distance_mode(&mut self, mode: DistanceMode) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_distance_mode(mode))
    }

    pub(crate) fn op_set_distance_mode(&mut self, mode: DistanceMode) -> Result<(), CanonError> {
        self.require_modal("set distance mode")?;
        self.store.committed.distance_mode = mode;
        debug!(?mode, "distance mode set");
        Ok(())
    }

    /// G54..G59.
    pub fn set_coord_system(&mut self, cs: CoordSystem) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_coord_system(cs))
    }

    pub(crate) fn op_set_coord_system(&mut self, cs: CoordSystem) -> Result<(), CanonError> {
        self.require_modal("set coordinate system")?;
        self.store.committed.coord_system = cs;
        debug!(?cs, offset = ?self.store.active_coord_offset(), "coordinate system selected");
        Ok(())
    }

    /// G61 / G61.1 / G64.
    pub fn set_path_control(&mut self, mode: PathControl) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_path_control(mode))
    }

    pub(crate) fn op_set_path_control(&mut self, mode: PathControl) -> Result<(), CanonError> {
        self.require_modal("set path control")?;
        self.store.committed.path_control = mode;
        Ok(())
    }

    /// G93 / G94.
    pub fn set_feed_rate_mode(&mut self, mode: FeedRateMode) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_feed_rate_mode(mode))
    }

    pub(crate) fn op_set_feed_rate_mode(&mut self, mode: FeedRateMode) -> Result<(), CanonError> {
        self.require_modal("set feed rate mode")?;
        self.store.committed.feed_rate_mode = mode;
        if mode == FeedRateMode::UnitsPerMinute {
            self.store.committed.inverse_feed_rate = 0.0;
        }
        Ok(())
    }

    /// F word in the current units and feed rate mode.
    pub fn set_feed_rate(&mut self, value: f64) -> Result<(), CanonError> {
        let units = self.units_mode();
        self.transact(|m| m.op_set_feed_rate(value, units))
    }

    /// F word programmed in `units`.
    pub(crate) fn op_set_feed_rate(&mut self, value: f64, units: UnitsMode) -> Result<(), CanonError> {
        self.require_modal("set feed rate")?;
        if !(value.is_finite() && value >= 0.0) {
            return Err(CanonError::InvalidWordValue { word: 'F', value });
        }
        let m = &mut self.store.committed;
        let normalized = normalize_feed_rate(m.feed_rate_mode, units, value);
        match m.feed_rate_mode {
            FeedRateMode::InverseTime => m.inverse_feed_rate = normalized,
            FeedRateMode::UnitsPerMinute => m.feed_rate = normalized,
        }
        debug!(feed_rate = normalized, mode = ?m.feed_rate_mode, "feed rate set");
        Ok(())
    }

    /// G53 for the following motion.
    pub fn set_absolute_override(&mut self, enabled: bool) -> Result<(), CanonError> {
        self.transact(|m| {
            m.require_modal("absolute override")?;
            m.store.committed.absolute_override = enabled;
            Ok(())
        })
    }

    // ─── Offsets ────────────────────────────────────────────────────

    /// G10 L2 Pn: write the flagged axes of coordinate system `p`.
    ///
    /// P0 is the active system.
    pub fn set_coord_offsets(
        &mut self,
        p: u8,
        values: AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_coord_offsets(p, &values, axes))
    }

    pub(crate) fn op_set_coord_offsets(
        &mut self,
        p: u8,
        values: &AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.require_modal("set coordinate offsets")?;
        let cs = match p {
            0 => self.store.committed.coord_system,
            n => CoordSystem::from_u8(n).ok_or(CanonError::InvalidCoordinateSystem(n))?,
        };
        if cs == CoordSystem::Absolute {
            return Err(CanonError::InvalidCoordinateSystem(p));
        }
        let units = self.store.committed.units_mode;
        for axis in axes.axes() {
            let value = values[axis];
            if !value.is_finite() {
                return Err(CanonError::AxisRangeError { axis, value });
            }
            let cfg = &self.config.axes[axis.index()];
            self.store.coord_offsets[cs.index()][axis] = to_canonical(units, cfg, value);
        }
        debug!(?cs, offset = ?self.store.coord_offsets[cs.index()], "coordinate offsets set");
        Ok(())
    }

    /// G92: make the current position read as `values` on the flagged axes.
    pub fn set_origin_offsets(
        &mut self,
        values: AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_origin_offsets(&values, axes))
    }

    pub(crate) fn op_set_origin_offsets(
        &mut self,
        values: &AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.require_modal("set origin offsets")?;
        let coord = self.store.active_coord_offset();
        let m = &mut self.store.committed;
        for axis in axes.axes() {
            let value = values[axis];
            if !value.is_finite() {
                return Err(CanonError::AxisRangeError { axis, value });
            }
            let input = to_canonical(m.units_mode, &self.config.axes[axis.index()], value);
            m.origin_offset[axis] = m.position[axis] - coord[axis] - input;
        }
        m.origin_offset_mode = true;
        debug!(offset = ?m.origin_offset, "origin offsets set");
        Ok(())
    }

    /// G92.1: zero and disable origin offsets.
    pub fn reset_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_reset_origin_offsets())
    }

    pub(crate) fn op_reset_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.require_modal("reset origin offsets")?;
        self.store.committed.origin_offset = AxisVector::ZERO;
        self.store.committed.origin_offset_mode = false;
        Ok(())
    }

    /// G92.2: stop applying origin offsets, keep the values.
    pub fn suspend_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_suspend_origin_offsets())
    }

    pub(crate) fn op_suspend_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.require_modal("suspend origin offsets")?;
        self.store.committed.origin_offset_mode = false;
        Ok(())
    }

    /// G92.3: apply the kept origin offsets again.
    pub fn resume_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_resume_origin_offsets())
    }

    pub(crate) fn op_resume_origin_offsets(&mut self) -> Result<(), CanonError> {
        self.require_modal("resume origin offsets")?;
        self.store.committed.origin_offset_mode = true;
        Ok(())
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// Resolve programmed values and apply soft limits.
    /// Resolve a motion target. Consumes a pending G53.
    fn resolve(&mut self, values: &AxisVector, axes: AxisFlags) -> Result<AxisVector, CanonError> {
        let ctx = ResolveContext {
            committed: &self.store.committed,
            coord_offset: self.store.active_coord_offset(),
            axes: &self.config.axes,
        };
        let target = resolve_target(values, axes, &ctx)?;
        self.store.committed.absolute_override = false;
        if self.config.config.machine.soft_limits && self.is_homed() {
            check_travel(&target, &self.config.axes)?;
        }
        debug!(?target, "target resolved");
        Ok(target)
    }

    /// Feed rate for a feed move, per the active feed rate mode.
    fn feed_for_move(&self) -> Result<f64, CanonError> {
        let m = &self.store.committed;
        let feed = match m.feed_rate_mode {
            FeedRateMode::InverseTime => m.inverse_feed_rate,
            FeedRateMode::UnitsPerMinute => m.feed_rate,
        };
        if feed > 0.0 {
            Ok(feed)
        } else {
            Err(CanonError::FeedRateNotSet)
        }
    }

    fn line_request(&self, kind: MoveKind, target: AxisVector, feed_rate: f64) -> LineRequest {
        let m = &self.store.committed;
        LineRequest {
            kind,
            target,
            feed_rate,
            feed_rate_mode: m.feed_rate_mode,
            path_control: m.path_control,
            inhibited: inhibited_axes(&self.config.axes),
            linenum: self.store.runtime.linenum,
        }
    }

    /// Inverse time feed rates apply to one move only.
    fn consume_inverse_feed(&mut self) {
        if self.store.committed.feed_rate_mode == FeedRateMode::InverseTime {
            self.store.committed.inverse_feed_rate = 0.0;
        }
    }

    /// G0.
    pub fn straight_traverse(
        &mut self,
        values: AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.transact(|m| m.op_straight_traverse(&values, axes))
    }

    pub(crate) fn op_straight_traverse(
        &mut self,
        values: &AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.require_motion("straight traverse")?;
        let target = self.resolve(values, axes)?;
        let request = self.line_request(MoveKind::Traverse, target, 0.0);
        self.emit(Outbound::Planner(PlannerRequest::Line(request)))?;
        self.store.committed.motion_mode = MotionMode::StraightTraverse;
        self.store.commit_target(target);
        Ok(())
    }

    /// G1.
    pub fn straight_feed(&mut self, values: AxisVector, axes: AxisFlags) -> Result<(), CanonError> {
        self.transact(|m| m.op_straight_feed(&values, axes))
    }

    pub(crate) fn op_straight_feed(
        &mut self,
        values: &AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.require_motion("straight feed")?;
        let target = self.resolve(values, axes)?;
        let feed_rate = self.feed_for_move()?;
        let request = self.line_request(MoveKind::Feed, target, feed_rate);
        self.emit(Outbound::Planner(PlannerRequest::Line(request)))?;
        self.store.committed.motion_mode = MotionMode::StraightFeed;
        self.store.commit_target(target);
        self.consume_inverse_feed();
        Ok(())
    }

    /// G2 / G3 in the selected plane, optionally helical.
    pub fn arc_feed(
        &mut self,
        values: AxisVector,
        axes: AxisFlags,
        center: ArcCenter,
        direction: Direction,
    ) -> Result<(), CanonError> {
        self.transact(|m| m.op_arc_feed(&values, axes, center, direction))
    }

    pub(crate) fn op_arc_feed(
        &mut self,
        values: &AxisVector,
        axes: AxisFlags,
        center: ArcCenter,
        direction: Direction,
    ) -> Result<(), CanonError> {
        self.require_motion("arc feed")?;
        let target = self.resolve(values, axes)?;
        let feed_rate = self.feed_for_move()?;

        let m = &self.store.committed;
        let plane = [m.plane_axis_0, m.plane_axis_1, m.plane_axis_2];
        let [a0, a1, _] = plane;
        let start = m.position;
        let (offset, radius_format) = match center {
            ArcCenter::Offset(ijk) => (
                [
                    m.units_mode.to_mm(ijk[a0.index()]),
                    m.units_mode.to_mm(ijk[a1.index()]),
                ],
                false,
            ),
            ArcCenter::Radius(r) => {
                let offset = radius_to_center_offset(
                    [start[a0], start[a1]],
                    [target[a0], target[a1]],
                    m.units_mode.to_mm(r),
                    direction,
                )?;
                (offset, true)
            }
        };
        let geometry = arc_geometry(&start, &target, plane, offset, direction, radius_format)?;
        debug!(
            center = ?geometry.center,
            radius = geometry.radius,
            sweep = geometry.angular_travel,
            "arc resolved"
        );

        let request = ArcRequest {
            target,
            plane: m.select_plane,
            direction,
            geometry,
            feed_rate,
            feed_rate_mode: m.feed_rate_mode,
            path_control: m.path_control,
            inhibited: inhibited_axes(&self.config.axes),
            linenum: self.store.runtime.linenum,
        };
        self.emit(Outbound::Planner(PlannerRequest::Arc(request)))?;
        self.store.committed.motion_mode = match direction {
            Direction::Cw => MotionMode::CwArc,
            Direction::Ccw => MotionMode::CcwArc,
        };
        self.store.commit_target(target);
        self.consume_inverse_feed();
        Ok(())
    }

    /// G4.
    pub fn dwell(&mut self, seconds: f64) -> Result<(), CanonError> {
        self.transact(|m| m.op_dwell(seconds))
    }

    pub(crate) fn op_dwell(&mut self, seconds: f64) -> Result<(), CanonError> {
        self.require_motion("dwell")?;
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(CanonError::InvalidWordValue {
                word: 'P',
                value: seconds,
            });
        }
        self.store.committed.dwell_time = seconds;
        self.emit(Outbound::Planner(PlannerRequest::Dwell { seconds }))
    }

    // ─── Cycles ─────────────────────────────────────────────────────

    /// G28: traverse through an optional intermediate point to machine zero.
    pub fn return_to_home(
        &mut self,
        values: AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.transact(|m| m.op_return_to_home(&values, axes))
    }

    pub(crate) fn op_return_to_home(
        &mut self,
        values: &AxisVector,
        axes: AxisFlags,
    ) -> Result<(), CanonError> {
        self.require_motion("return to home")?;
        let intermediate = if axes.is_empty() {
            None
        } else {
            Some(self.resolve(values, axes)?)
        };
        self.store.committed.absolute_override = false;
        self.emit(Outbound::Cycle(CycleRequest::ReturnToHome { intermediate }))
    }

    /// G28.1 / G30: homing cycle over the flagged axes (all when empty).
    pub fn homing_cycle(&mut self, axes: AxisFlags) -> Result<(), CanonError> {
        self.transact(|m| m.op_homing_cycle(axes))
    }

    pub(crate) fn op_homing_cycle(&mut self, axes: AxisFlags) -> Result<(), CanonError> {
        let state = self.machine_state();
        let startable = matches!(
            state,
            MachineState::Reset | MachineState::Run | MachineState::Stop
        );
        if !startable || self.cycle_active() || self.planner.is_busy() {
            return Err(CanonError::MachineNotReady {
                operation: "homing cycle",
                state,
            });
        }
        let homeable = self
            .config
            .homing_sequence
            .iter()
            .any(|a| axes.is_empty() || axes.has(*a));
        if !homeable {
            return Err(CanonError::MachineNotReady {
                operation: "homing cycle without homing-enabled axes",
                state,
            });
        }
        self.emit(Outbound::Cycle(CycleRequest::Homing { axes }))
    }

    // ─── Spindle / Tool ─────────────────────────────────────────────

    /// S word [RPM].
    pub fn set_spindle_speed(&mut self, rpm: f64) -> Result<(), CanonError> {
        self.transact(|m| m.op_set_spindle_speed(rpm))
    }

    pub(crate) fn op_set_spindle_speed(&mut self, rpm: f64) -> Result<(), CanonError> {
        self.require_modal("set spindle speed")?;
        if !(rpm.is_finite() && rpm >= 0.0) {
            return Err(CanonError::InvalidWordValue {
                word: 'S',
                value: rpm,
            });
        }
        self.store.committed.spindle_speed = rpm;
        self.emit(Outbound::Spindle(SpindleCommand::Speed(rpm)))
    }

    /// M3 / M4 / M5.
    pub fn spindle_control(&mut self, mode: SpindleMode) -> Result<(), CanonError> {
        self.transact(|m| m.op_spindle_control(mode))
    }

    pub(crate) fn op_spindle_control(&mut self, mode: SpindleMode) -> Result<(), CanonError> {
        self.require_modal("spindle control")?;
        self.store.committed.spindle_mode = mode;
        self.emit(Outbound::Spindle(SpindleCommand::Mode(mode)))
    }

    /// T word.
    pub fn select_tool(&mut self, tool: u8) -> Result<(), CanonError> {
        self.transact(|m| m.op_select_tool(tool))
    }

    pub(crate) fn op_select_tool(&mut self, tool: u8) -> Result<(), CanonError> {
        self.require_modal("select tool")?;
        if tool > self.config.config.machine.tool_max {
            return Err(CanonError::InvalidToolNumber(tool));
        }
        self.store.committed.tool = tool;
        self.emit(Outbound::Spindle(SpindleCommand::SelectTool(tool)))
    }

    /// M6 with the selected tool.
    pub fn change_tool(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_change_tool())
    }

    pub(crate) fn op_change_tool(&mut self) -> Result<(), CanonError> {
        self.require_modal("change tool")?;
        let tool = self.store.committed.tool;
        self.emit(Outbound::Spindle(SpindleCommand::ChangeTool(tool)))
    }

    // ─── Console ────────────────────────────────────────────────────

    /// Forward a comment verbatim.
    pub fn comment(&mut self, text: &str) -> Result<(), CanonError> {
        let text = console_text(text);
        self.transact(|m| m.op_comment(text))
    }

    pub(crate) fn op_comment(&mut self, text: ConsoleText) -> Result<(), CanonError> {
        self.emit(Outbound::Comment(text))
    }

    /// Forward an operator message verbatim.
    pub fn message(&mut self, text: &str) -> Result<(), CanonError> {
        let text = console_text(text);
        self.transact(|m| m.op_message(text))
    }

    pub(crate) fn op_message(&mut self, text: ConsoleText) -> Result<(), CanonError> {
        self.emit(Outbound::Message(text))
    }

    // ─── Program Flow ───────────────────────────────────────────────

    fn require_run(&self, operation: &'static str) -> Result<(), CanonError> {
        match self.machine_state() {
            MachineState::Run => Ok(()),
            state => Err(CanonError::MachineNotReady { operation, state }),
        }
    }

    /// M0.
    pub fn program_stop(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_program_stop())
    }

    /// M1; no optional stop switch exists, so it always stops.
    pub fn optional_program_stop(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_program_stop())
    }

    pub(crate) fn op_program_stop(&mut self) -> Result<(), CanonError> {
        self.require_run("program stop")?;
        self.store.committed.program_flow = ProgramFlow::Paused;
        self.emit(Outbound::Program(ProgramAction::Stop))
    }

    /// M2 / M30.
    pub fn program_end(&mut self) -> Result<(), CanonError> {
        self.transact(|m| m.op_program_end())
    }

    pub(crate) fn op_program_end(&mut self) -> Result<(), CanonError> {
        self.require_run("program end")?;
        self.store.reset_modal(&self.config.config.defaults);
        self.store.committed.program_flow = ProgramFlow::Completed;
        self.emit(Outbound::Program(ProgramAction::End))
    }

    // ─── Unimplemented ──────────────────────────────────────────────

    /// M7 / M8 / M9.
    pub fn coolant_control(&mut self) -> Result<(), CanonError> {
        Err(unimplemented("coolant"))
    }

    /// M48 / M49.
    pub fn override_enable(&mut self) -> Result<(), CanonError> {
        Err(unimplemented("feed and speed overrides"))
    }

    /// G40..G43, G49.
    pub fn cutter_compensation(&mut self) -> Result<(), CanonError> {
        Err(unimplemented("cutter compensation"))
    }
}

pub(crate) fn unimplemented(feature: &'static str) -> CanonError {
    warn!(feature, "unimplemented feature ignored");
    CanonError::UnimplementedFeature(feature)
}

// ─── Tests ──────────────────────────────────────────────────────────
