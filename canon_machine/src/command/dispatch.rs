//! Command Dispatcher core.
//!
//! [`CanonicalMachine`] is the single owner of the Modal State Store and the
//! runtime state machines. Every canonical function runs inside a
//! transaction:
//!
//! 1. snapshot the committed model and the working offset table
//! 2. run the function: validate, resolve, write the committed model and
//!    buffer outbound requests in a fixed-capacity outbox
//! 3. on error restore the snapshot and drop the outbox; on success release
//!    the outbox to the collaborators in order
//!
//! No collaborator sees anything from a failed function, and no reader sees
//! a partially committed model.
//!
//! Operator events (cycle start, feedhold, abort), planner callbacks
//! (`exec_stop`, `exec_end`, hardware faults) and the scheduler callbacks
//! (`hold_callback`, `homing_callback`, `return_to_home_callback`) live here
//! too. Canonical functions are in `canonical.rs`, block execution in
//! `block.rs`.

use canon_common::consts::{AXES, OUTBOX_CAPACITY};
use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::block::BlockBuilder;
use canon_common::machine::error::CanonError;
use canon_common::machine::model::GCodeModel;
use canon_common::machine::state::{
    CoordSystem, DistanceMode, FeedRateMode, FeedholdState, HomingState, MachineState,
    MotionMode, NextAction, PathControl, Plane, ProgramFlow, SpindleMode, UnitsMode,
};
use canon_common::machine::status::StatusReport;
use tracing::{debug, error, info, warn};

use crate::collab::{
    Console, CycleRequest, LineRequest, MoveKind, Outbound, Planner, PlannerRequest,
    PlannerSignal, ProgramAction, SpindleCommand, SpindleDriver,
};
use crate::command::homing::{HomingCycle, HomingStep};
use crate::command::return_home::{ReturnHomeCycle, ReturnHomeStep};
use crate::command::CycleStep;
use crate::config::LoadedConfig;
use crate::state::feedhold::FeedholdEvent;
use crate::state::homing::HomingEvent;
use crate::state::machine::MachineEvent;
use crate::state::TransitionResult;
use crate::store::{to_display_units, ModalStore};

/// Outbound requests buffered by one transaction.
pub type Outbox = heapless::Vec<Outbound, OUTBOX_CAPACITY>;

// ─── Canonical Machine ──────────────────────────────────────────────

/// The canonical machine: modal state, state machines and collaborators.
pub struct CanonicalMachine<P: Planner, S: SpindleDriver, C: Console> {
    pub(crate) store: ModalStore,
    pub(crate) config: LoadedConfig,
    pub(crate) outbox: Outbox,
    pub(crate) homing: HomingCycle,
    pub(crate) return_home: ReturnHomeCycle,
    /// A program stop marker is queued in the planner.
    pub(crate) stop_pending: bool,
    /// `stop_pending` as captured when the current hold was entered.
    pub(crate) hold_stop_pending: bool,
    /// Planner is still held after a hold that ended in STOP.
    pub(crate) resume_on_start: bool,
    pub(crate) planner: P,
    pub(crate) spindle: S,
    pub(crate) console: C,
}

impl<P: Planner, S: SpindleDriver, C: Console> CanonicalMachine<P, S, C> {
    /// Power-on: defaults applied, offsets seeded, machine in RESET.
    pub fn new(config: LoadedConfig, planner: P, spindle: S, console: C) -> Self {
        let store = ModalStore::new(
            &config.config.defaults,
            config.coord_offsets,
            config.config.homing.restore_homed,
        );
        info!(
            service = %config.config.shared.service_name,
            homed = config.config.homing.restore_homed,
            "canonical machine initialized"
        );
        Self {
            store,
            config,
            outbox: Outbox::new(),
            homing: HomingCycle::new(),
            return_home: ReturnHomeCycle::new(),
            stop_pending: false,
            hold_stop_pending: false,
            resume_on_start: false,
            planner,
            spindle,
            console,
        }
    }

    // ─── Collaborators ──────────────────────────────────────────────

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut P {
        &mut self.planner
    }

    pub fn spindle(&self) -> &S {
        &self.spindle
    }

    pub fn spindle_mut(&mut self) -> &mut S {
        &mut self.spindle
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    pub fn store(&self) -> &ModalStore {
        &self.store
    }

    /// Builder for the next block, seeded with the carried-forward model.
    pub fn block(&self) -> BlockBuilder {
        BlockBuilder::from_base(self.store.committed.carry_forward())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Committed model (normalized).
    pub fn committed(&self) -> &GCodeModel {
        &self.store.committed
    }

    pub fn next_action(&self) -> NextAction {
        self.store.committed.next_action
    }

    pub fn motion_mode(&self) -> MotionMode {
        self.store.committed.motion_mode
    }

    pub fn machine_state(&self) -> MachineState {
        self.store.runtime.machine_state()
    }

    pub fn hold_state(&self) -> FeedholdState {
        self.store.runtime.hold_state()
    }

    pub fn homing_state(&self) -> HomingState {
        self.store.runtime.homing_state()
    }

    pub fn is_homed(&self) -> bool {
        self.store.runtime.homing.is_homed()
    }

    pub fn selected_plane(&self) -> Plane {
        self.store.committed.select_plane
    }

    /// `[axis_0, axis_1, normal]` of the active plane.
    pub fn plane_axes(&self) -> [Axis; 3] {
        let m = &self.store.committed;
        [m.plane_axis_0, m.plane_axis_1, m.plane_axis_2]
    }

    pub fn path_control(&self) -> PathControl {
        self.store.committed.path_control
    }

    pub fn coord_system(&self) -> CoordSystem {
        self.store.committed.coord_system
    }

    pub fn units_mode(&self) -> UnitsMode {
        self.store.committed.units_mode
    }

    pub fn distance_mode(&self) -> DistanceMode {
        self.store.committed.distance_mode
    }

    pub fn feed_rate_mode(&self) -> FeedRateMode {
        self.store.committed.feed_rate_mode
    }

    /// Feed rate in current units per minute (minutes⁻¹ in inverse time).
    pub fn feed_rate(&self) -> f64 {
        let m = &self.store.committed;
        match m.feed_rate_mode {
            FeedRateMode::UnitsPerMinute => m.units_mode.from_mm(m.feed_rate),
            FeedRateMode::InverseTime => m.inverse_feed_rate,
        }
    }

    pub fn spindle_mode(&self) -> SpindleMode {
        self.store.committed.spindle_mode
    }

    pub fn spindle_speed(&self) -> f64 {
        self.store.committed.spindle_speed
    }

    pub fn tool(&self) -> u8 {
        self.store.committed.tool
    }

    pub fn program_flow(&self) -> ProgramFlow {
        self.store.committed.program_flow
    }

    pub fn linecount(&self) -> u32 {
        self.store.runtime.linecount
    }

    pub fn linenum(&self) -> u32 {
        self.store.runtime.linenum
    }

    /// Planner has motion queued or a cycle is running.
    pub fn is_busy(&self) -> bool {
        self.planner.is_busy() || self.cycle_active()
    }

    /// Homing or return-to-home cycle running.
    pub fn cycle_active(&self) -> bool {
        self.homing.is_pending() || self.return_home.is_active()
    }

    /// Model work position of one axis, current units.
    pub fn work_position(&self, axis: Axis) -> f64 {
        self.store.work_position(axis)
    }

    /// Model work position of all axes, current units.
    pub fn work_position_vector(&self) -> AxisVector {
        let mut out = AxisVector::ZERO;
        for axis in Axis::ALL {
            out[axis] = self.store.work_position(axis);
        }
        out
    }

    /// Committed position, machine coordinates [mm/deg].
    pub fn canonical_position(&self) -> AxisVector {
        self.store.committed.position
    }

    /// Committed target, machine coordinates [mm/deg].
    pub fn canonical_target(&self) -> AxisVector {
        self.store.committed.target
    }

    /// Live planner position, machine coordinates [mm/deg].
    pub fn runtime_machine_position(&self) -> AxisVector {
        self.planner.runtime_position()
    }

    /// Live planner position of one axis in work coordinates, current units.
    pub fn runtime_work_position(&self, axis: Axis) -> f64 {
        let value = self.planner.runtime_position()[axis] - self.store.total_offset(axis);
        to_display_units(self.store.committed.units_mode, axis, value)
    }

    /// Total offset (coordinate system plus active origin offset) of one axis [mm/deg].
    pub fn coord_offset(&self, axis: Axis) -> f64 {
        self.store.total_offset(axis)
    }

    /// Working offset table entry for `cs` [mm/deg].
    pub fn coord_offsets(&self, cs: CoordSystem) -> AxisVector {
        self.store.coord_offsets[cs.index()]
    }

    /// G92 origin offset values, applied or not [mm/deg].
    pub fn origin_offset(&self) -> AxisVector {
        self.store.committed.origin_offset
    }

    pub fn origin_offset_enabled(&self) -> bool {
        self.store.committed.origin_offset_mode
    }

    // ─── Transactions ───────────────────────────────────────────────

    /// Run `op` atomically: commit and release its outbox, or roll back.
    pub(crate) fn transact<F>(&mut self, op: F) -> Result<(), CanonError>
    where
        F: FnOnce(&mut Self) -> Result<(), CanonError>,
    {
        let snapshot = self.store.snapshot();
        self.outbox.clear();
        match op(self).and_then(|()| self.check_planner_capacity()) {
            Ok(()) => self.flush(),
            Err(e) => {
                self.store.restore(snapshot);
                self.outbox.clear();
                Err(e)
            }
        }
    }

    /// Buffer one outbound item.
    pub(crate) fn emit(&mut self, item: Outbound) -> Result<(), CanonError> {
        self.outbox
            .push(item)
            .map_err(|_| CanonError::OutboxOverflow)
    }

    fn check_planner_capacity(&self) -> Result<(), CanonError> {
        let moves = self
            .outbox
            .iter()
            .filter(|o| matches!(o, Outbound::Planner(_)))
            .count();
        // a program action only takes a slot when it is queued as a marker
        let markers = if moves > 0 || self.planner.is_busy() {
            self.outbox
                .iter()
                .filter(|o| matches!(o, Outbound::Program(_)))
                .count()
        } else {
            0
        };
        let needed = moves + markers;
        let available = self.planner.available();
        if needed > available {
            return Err(CanonError::PlannerRejected(format!(
                "planner queue full: {needed} requests, {available} free"
            )));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CanonError> {
        let items = std::mem::take(&mut self.outbox);
        for item in items {
            match item {
                Outbound::Planner(request) => self.submit(request)?,
                Outbound::Spindle(command) => self.spindle.execute(command),
                Outbound::Comment(text) => self.console.comment(&text),
                Outbound::Message(text) => self.console.message(&text),
                Outbound::Cycle(request) => self.start_cycle(request),
                Outbound::Program(action) => self.program_action(action)?,
            }
        }
        Ok(())
    }

    /// Submit after commit. A refusal here means the planner lied about
    /// capacity; the machine is reset as for a hardware fault.
    fn submit(&mut self, request: PlannerRequest) -> Result<(), CanonError> {
        if let Err(e) = self.planner.submit(request) {
            self.hardware_fault(&e.0);
            return Err(e.into());
        }
        Ok(())
    }

    fn program_action(&mut self, action: ProgramAction) -> Result<(), CanonError> {
        if self.planner.is_busy() {
            let marker = match action {
                ProgramAction::Stop => {
                    self.stop_pending = true;
                    PlannerRequest::ProgramStop
                }
                ProgramAction::End => PlannerRequest::ProgramEnd,
            };
            debug!(?action, "program flow queued behind motion");
            return self.submit(marker);
        }
        match action {
            ProgramAction::Stop => {
                self.take_stop();
            }
            ProgramAction::End => self.exec_end(),
        }
        Ok(())
    }

    fn start_cycle(&mut self, request: CycleRequest) {
        match request {
            CycleRequest::ReturnToHome { intermediate } => {
                info!(?intermediate, "return to home started");
                self.return_home.start(intermediate);
            }
            CycleRequest::Homing { axes } => {
                let sequence: heapless::Vec<Axis, AXES> = self
                    .config
                    .homing_sequence
                    .iter()
                    .copied()
                    .filter(|a| axes.is_empty() || axes.has(*a))
                    .collect();
                if self
                    .transition(MachineEvent::HomingStart, "homing cycle")
                    .is_err()
                {
                    return;
                }
                self.store.runtime.homing.handle_event(HomingEvent::Start);
                info!(axes = sequence.len(), "homing cycle started");
                self.homing.start(sequence);
                self.report();
            }
        }
    }

    // ─── Gating ─────────────────────────────────────────────────────

    /// Motion needs RUN and no running cycle.
    pub(crate) fn require_motion(&self, operation: &'static str) -> Result<(), CanonError> {
        let state = self.machine_state();
        if !self.store.runtime.machine.allows_motion() || self.cycle_active() {
            return Err(CanonError::MachineNotReady { operation, state });
        }
        Ok(())
    }

    /// Modal setters are refused only while homing.
    pub(crate) fn require_modal(&self, operation: &'static str) -> Result<(), CanonError> {
        if !self.store.runtime.machine.allows_modal_changes() {
            return Err(CanonError::MachineNotReady {
                operation,
                state: self.machine_state(),
            });
        }
        Ok(())
    }

    // ─── Machine Events ─────────────────────────────────────────────

    /// Apply a machine event; report on change.
    fn transition(
        &mut self,
        event: MachineEvent,
        operation: &'static str,
    ) -> Result<MachineState, CanonError> {
        let from = self.machine_state();
        match self.store.runtime.machine.handle_event(event) {
            TransitionResult::Ok(to) => {
                if to != from {
                    info!(?from, ?to, ?event, "machine state changed");
                    self.report();
                }
                Ok(to)
            }
            TransitionResult::Rejected(reason) => {
                warn!(?from, ?event, reason, "machine event rejected");
                Err(CanonError::MachineNotReady {
                    operation,
                    state: from,
                })
            }
        }
    }

    /// Operator cycle start.
    pub fn cycle_start(&mut self) -> Result<(), CanonError> {
        let from = self.machine_state();
        self.transition(MachineEvent::CycleStart, "cycle start")?;
        self.store.committed.program_flow = ProgramFlow::Running;
        if matches!(from, MachineState::Reset | MachineState::Stop) && self.resume_on_start {
            self.resume_on_start = false;
            self.planner.signal(PlannerSignal::Resume);
        }
        Ok(())
    }

    /// Operator feedhold: controlled stop, resumable with cycle start.
    pub fn feedhold(&mut self) -> Result<(), CanonError> {
        let from = self.machine_state();
        self.transition(MachineEvent::Feedhold, "feedhold")?;
        if from == MachineState::Run {
            self.hold_stop_pending = self.stop_pending;
            self.store.runtime.hold.handle_event(FeedholdEvent::Request);
            debug!(stop_pending = self.hold_stop_pending, "feedhold requested");
        }
        Ok(())
    }

    /// Unconditional abort: planner queue discarded, machine RESET.
    pub fn abort(&mut self) {
        warn!(state = ?self.machine_state(), "abort");
        self.reset_all(MachineEvent::Abort);
    }

    /// Fault reported by the planner; handled like abort.
    pub fn hardware_fault(&mut self, reason: &str) {
        error!(reason, state = ?self.machine_state(), "hardware fault");
        self.reset_all(MachineEvent::HardwareFault);
    }

    fn reset_all(&mut self, event: MachineEvent) {
        self.planner.signal(PlannerSignal::Abort);
        self.store.runtime.machine.handle_event(event);
        self.store.runtime.hold.handle_event(FeedholdEvent::Abort);
        self.store.runtime.homing.handle_event(HomingEvent::Abort);
        self.homing.abort();
        self.return_home.abort();
        self.outbox.clear();
        self.stop_pending = false;
        self.hold_stop_pending = false;
        self.resume_on_start = false;

        // committed model follows the machine to where it actually stopped
        let position = self.planner.runtime_position();
        self.store.set_machine_coords(position);
        self.store.committed.spindle_mode = SpindleMode::Off;
        self.store.clear_incoming();
        self.spindle.execute(SpindleCommand::Mode(SpindleMode::Off));
        self.report();
    }

    /// Planner reached a queued program stop marker and paused there.
    pub fn exec_stop(&mut self) {
        if !self.stop_pending {
            debug!("program stop already taken");
            self.planner.signal(PlannerSignal::Resume);
            return;
        }
        if self.take_stop() {
            // the planner stays paused at the marker until cycle start
            self.resume_on_start = true;
        } else {
            self.planner.signal(PlannerSignal::Resume);
        }
    }

    /// Enter STOP for a program stop. Returns whether the stop was taken.
    fn take_stop(&mut self) -> bool {
        self.stop_pending = false;
        match self.transition(MachineEvent::ProgramStop, "program stop") {
            Ok(_) => {
                self.store.committed.program_flow = ProgramFlow::Paused;
                true
            }
            Err(e) => {
                warn!(error = %e, "program stop not taken");
                false
            }
        }
    }

    /// Planner reached a queued program end marker.
    pub fn exec_end(&mut self) {
        if let Err(e) = self.transition(MachineEvent::ProgramEnd, "program end") {
            warn!(error = %e, "program end not taken");
            return;
        }
        self.store.committed.program_flow = ProgramFlow::Completed;
        self.spindle.execute(SpindleCommand::Mode(SpindleMode::Off));
    }

    /// Redefine the machine position without motion.
    pub fn set_machine_coords(&mut self, position: AxisVector) {
        self.store.set_machine_coords(position);
        self.planner.set_position(position);
        debug!(?position, "machine coordinates set");
    }

    // ─── Scheduler Callbacks ────────────────────────────────────────

    /// Advance feedhold sequencing. Call every tick.
    pub fn hold_callback(&mut self) -> CycleStep {
        match self.machine_state() {
            MachineState::Hold => self.hold_step(),
            MachineState::EndHold => {
                let stop = self.hold_stop_pending;
                self.hold_stop_pending = false;
                if stop {
                    // the pending stop is taken here; the planner stays held
                    self.stop_pending = false;
                    self.resume_on_start = true;
                } else {
                    self.planner.signal(PlannerSignal::Resume);
                }
                self.store.runtime.hold.handle_event(FeedholdEvent::Exit);
                match self.transition(MachineEvent::HoldExit { stop_pending: stop }, "end hold") {
                    Ok(_) => CycleStep::Complete,
                    Err(e) => CycleStep::Failed(e),
                }
            }
            _ => CycleStep::Idle,
        }
    }

    fn hold_step(&mut self) -> CycleStep {
        let hold = &mut self.store.runtime.hold;
        match hold.state() {
            FeedholdState::Sync => {
                if self.planner.at_segment_boundary() {
                    self.planner.signal(PlannerSignal::PlanFeedhold);
                    hold.handle_event(FeedholdEvent::SegmentBoundary);
                }
                CycleStep::InProgress
            }
            FeedholdState::Plan => {
                hold.handle_event(FeedholdEvent::Planned);
                CycleStep::InProgress
            }
            FeedholdState::Decel => {
                if self.planner.runtime_velocity() <= self.config.config.machine.hold_velocity_epsilon
                {
                    hold.handle_event(FeedholdEvent::Stopped);
                    info!("feedhold reached");
                    self.report();
                    CycleStep::Complete
                } else {
                    CycleStep::InProgress
                }
            }
            FeedholdState::Hold | FeedholdState::Off => CycleStep::Idle,
        }
    }

    /// Advance the homing cycle. Call every tick.
    pub fn homing_callback(&mut self) -> CycleStep {
        if !self.homing.is_pending() || self.machine_state() != MachineState::Homing {
            return CycleStep::Idle;
        }
        if self.planner.is_busy() {
            return CycleStep::InProgress;
        }

        // where the switch actually stopped the last move
        let position = self.planner.runtime_position();
        self.store.set_machine_coords(position);

        match self.homing.step(&position, &self.config.axes) {
            HomingStep::Move {
                axis,
                target,
                feed_rate,
            } => {
                debug!(%axis, phase = ?self.homing.phase(), ?target, "homing move");
                let request = PlannerRequest::Line(LineRequest {
                    kind: MoveKind::Homing,
                    target,
                    feed_rate,
                    feed_rate_mode: FeedRateMode::UnitsPerMinute,
                    path_control: PathControl::ExactStop,
                    inhibited: Default::default(),
                    linenum: self.store.runtime.linenum,
                });
                match self.planner.submit(request) {
                    Ok(()) => {
                        self.store.commit_target(target);
                        CycleStep::InProgress
                    }
                    Err(e) => {
                        let err = CanonError::from(e);
                        self.finish_homing(Some(&err));
                        CycleStep::Failed(err)
                    }
                }
            }
            HomingStep::SetPosition { axis, position } => {
                let p = self.store.committed.position.with(axis, position);
                self.set_machine_coords(p);
                info!(%axis, position, "axis homed");
                CycleStep::InProgress
            }
            HomingStep::Complete => {
                self.finish_homing(None);
                CycleStep::Complete
            }
            HomingStep::Idle => CycleStep::Idle,
        }
    }

    fn finish_homing(&mut self, failure: Option<&CanonError>) {
        match failure {
            None => {
                self.store.runtime.homing.handle_event(HomingEvent::Succeeded);
                info!("homing cycle complete");
                if let Err(e) = self.transition(MachineEvent::HomingComplete, "homing cycle") {
                    error!(error = %e, "homing completion not applied");
                }
            }
            Some(e) => {
                self.homing.fail();
                self.store.runtime.homing.handle_event(HomingEvent::Failed);
                error!(error = %e, "homing cycle failed");
                if let Err(e) = self.transition(MachineEvent::HomingFailed, "homing cycle") {
                    error!(error = %e, "homing failure not applied");
                }
            }
        }
    }

    /// Advance the return-to-home cycle. Call every tick.
    pub fn return_to_home_callback(&mut self) -> CycleStep {
        if !self.return_home.is_active() {
            return CycleStep::Idle;
        }
        // held or stopped: wait for cycle start
        if self.machine_state() != MachineState::Run || self.planner.is_busy() {
            return CycleStep::InProgress;
        }
        let position = self.store.committed.position;
        match self.return_home.step(&position, &self.config.axes) {
            ReturnHomeStep::Move { target } => {
                let m = &self.store.committed;
                let request = PlannerRequest::Line(LineRequest {
                    kind: MoveKind::Traverse,
                    target,
                    feed_rate: 0.0,
                    feed_rate_mode: FeedRateMode::UnitsPerMinute,
                    path_control: m.path_control,
                    inhibited: crate::resolve::inhibited_axes(&self.config.axes),
                    linenum: self.store.runtime.linenum,
                });
                match self.planner.submit(request) {
                    Ok(()) => {
                        self.store.commit_target(target);
                        CycleStep::InProgress
                    }
                    Err(e) => {
                        let err = CanonError::from(e);
                        error!(error = %err, "return to home aborted");
                        self.return_home.abort();
                        CycleStep::Failed(err)
                    }
                }
            }
            ReturnHomeStep::Complete => {
                info!("return to home complete");
                self.report();
                CycleStep::Complete
            }
            ReturnHomeStep::Idle => CycleStep::Idle,
        }
    }

    /// Run every callback once. Returns true while anything is in progress.
    pub fn tick(&mut self) -> bool {
        let hold = self.hold_callback();
        let homing = self.homing_callback();
        let home = self.return_to_home_callback();
        hold.is_in_progress() || homing.is_in_progress() || home.is_in_progress()
    }

    // ─── Status ─────────────────────────────────────────────────────

    /// Current status without advancing the report counter.
    pub fn status_report(&self) -> StatusReport {
        let m = &self.store.committed;
        let rt = &self.store.runtime;
        StatusReport {
            counter: rt.status_report_counter,
            linenum: rt.linenum,
            linecount: rt.linecount,
            machine_state: rt.machine_state(),
            hold_state: rt.hold_state(),
            homing_state: rt.homing_state(),
            units_mode: m.units_mode,
            coord_system: m.coord_system,
            distance_mode: m.distance_mode,
            motion_mode: m.motion_mode,
            feed_rate: self.feed_rate(),
            velocity: self.planner.runtime_velocity(),
            work_position: *self.work_position_vector().as_array(),
            machine_position: *self.planner.runtime_position().as_array(),
        }
    }

    /// Emit a status report for a reportable event.
    pub(crate) fn report(&mut self) {
        self.store.runtime.next_report();
        let report = self.status_report();
        self.console.status_report(&report);
    }
}
