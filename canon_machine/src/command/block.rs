//! Block executor.
//!
//! Runs one parsed block through the canonical functions in RS274/NGC order,
//! all inside a single transaction:
//!
//! ```text
//! validate → comment/MSG → G93/G94 → F → S → T → M6 → M3/M4/M5
//!   → coolant/override/compensation (warn) → G4 → G17-G19 → G20/G21
//!   → G54-G59 → G61/G61.1/G64 → G90/G91 → G53 → G0-G3/G80
//!   → G10 / G28 / G28.1 / G92.x → motion → M0/M1/M2/M30
//! ```
//!
//! Axis words feed the non-modal command of the block if there is one,
//! otherwise the motion mode (programmed in this block or carried forward).
//! A motion mode programmed next to a non-modal command still becomes modal.

use canon_common::consts::OUTBOX_CAPACITY;
use canon_common::machine::block::GCodeBlock;
use canon_common::machine::codes::{BlockCodes, ModalGroup};
use canon_common::machine::error::CanonError;
use canon_common::machine::model::WordFlags;
use canon_common::machine::state::{Direction, MachineState, MotionMode, NextAction};
use static_assertions::const_assert;
use tracing::{debug, error, warn};

use crate::collab::{Console, Planner, SpindleDriver};
use crate::command::canonical::{unimplemented, ArcCenter};
use crate::command::dispatch::CanonicalMachine;
use crate::validate::validate_block;

// comment, MSG, S, T, M6, M3-5, G4, motion or cycle, program flow
const_assert!(OUTBOX_CAPACITY >= 9);

impl<P: Planner, S: SpindleDriver, C: Console> CanonicalMachine<P, S, C> {
    /// Execute one parsed block.
    ///
    /// On success `linecount` advances and a status report goes out. On
    /// failure nothing is committed, nothing is sent, and the console gets
    /// the error with the block's line number.
    pub fn execute_block(&mut self, block: &GCodeBlock) -> Result<(), CanonError> {
        self.store.stage(block);
        let linenum = self.store.runtime.linenum;
        let result = self.transact(|m| m.run_block(block));
        self.store.clear_incoming();

        match &result {
            Ok(()) => {
                let rt = &mut self.store.runtime;
                rt.linecount = rt.linecount.wrapping_add(1);
                debug!(linenum, linecount = rt.linecount, "block committed");
                self.report();
            }
            Err(e) => {
                error!(linenum, code = e.code(), error = %e, "block rejected");
                self.console.block_rejected(linenum, e);
            }
        }
        result
    }

    fn run_block(&mut self, block: &GCodeBlock) -> Result<(), CanonError> {
        let v = &block.values;
        let flags = &block.flags;

        let state = self.machine_state();
        if state == MachineState::Homing {
            return Err(CanonError::MachineNotReady {
                operation: "block execution",
                state,
            });
        }
        validate_block(v, flags)?;

        if let Some(text) = &block.comment {
            self.op_comment(text.clone())?;
        }
        if let Some(text) = &block.message {
            self.op_message(text.clone())?;
        }

        if flags.has_code(ModalGroup::FeedRateMode.members()) {
            self.op_set_feed_rate_mode(v.feed_rate_mode)?;
        }
        if flags.has_word(WordFlags::F) {
            self.op_set_feed_rate(v.feed_rate, v.units_mode)?;
        }
        if flags.has_word(WordFlags::S) {
            self.op_set_spindle_speed(v.spindle_speed)?;
        }
        if flags.has_word(WordFlags::T) {
            self.op_select_tool(v.tool)?;
        }
        if flags.has_code(BlockCodes::M6) {
            self.op_change_tool()?;
        }
        if flags.has_code(ModalGroup::SpindleTurning.members()) {
            self.op_spindle_control(v.spindle_mode)?;
        }

        let unsupported = [
            (BlockCodes::COOLANT, "coolant"),
            (BlockCodes::OVERRIDES, "feed and speed overrides"),
            (BlockCodes::COMPENSATION, "cutter compensation"),
        ];
        for (codes, feature) in unsupported {
            if flags.has_code(codes) {
                let _ = unimplemented(feature);
            }
        }

        if v.next_action == NextAction::Dwell {
            if !flags.has_word(WordFlags::P) {
                return Err(CanonError::InvalidWordValue {
                    word: 'P',
                    value: 0.0,
                });
            }
            self.op_dwell(v.dwell_time)?;
        }

        if flags.has_code(ModalGroup::PlaneSelection.members()) {
            self.op_select_plane(v.select_plane)?;
        }
        if flags.has_code(ModalGroup::Units.members()) {
            self.op_set_units_mode(v.units_mode)?;
        }
        if flags.has_code(ModalGroup::CoordinateSystem.members()) {
            self.op_set_coord_system(v.coord_system)?;
        }
        if flags.has_code(ModalGroup::PathControl.members()) {
            self.op_set_path_control(v.path_control)?;
        }
        if flags.has_code(ModalGroup::DistanceMode.members()) {
            self.op_set_distance_mode(v.distance_mode)?;
        }
        if flags.has_code(BlockCodes::G53) {
            self.store.committed.absolute_override = true;
        }
        let motion_supported = self.set_block_motion_mode(block)?;

        match v.next_action {
            NextAction::SetCoordOffset => {
                self.op_set_coord_offsets(v.set_coord_offset, &v.target, flags.axes)?
            }
            NextAction::ReturnToHome => self.op_return_to_home(&v.target, flags.axes)?,
            NextAction::HomingCycle => self.op_homing_cycle(flags.axes)?,
            NextAction::SetOriginOffset => {
                if flags.has_code(BlockCodes::G92) {
                    self.op_set_origin_offsets(&v.target, flags.axes)?;
                } else if flags.has_code(BlockCodes::G92_1) {
                    self.op_reset_origin_offsets()?;
                } else if flags.has_code(BlockCodes::G92_2) {
                    self.op_suspend_origin_offsets()?;
                } else {
                    self.op_resume_origin_offsets()?;
                }
            }
            NextAction::None | NextAction::Motion if motion_supported => self.run_motion(block)?,
            NextAction::None | NextAction::Motion => {}
            NextAction::Dwell => {}
        }

        if flags.has_code(BlockCodes::M0 | BlockCodes::M1) {
            self.op_program_stop()?;
        }
        if flags.has_code(BlockCodes::M2 | BlockCodes::M30) {
            self.op_program_end()?;
        }

        self.store.committed.absolute_override = false;
        self.store.committed.next_action = v.next_action;
        Ok(())
    }

    /// Apply the block's motion group code. Returns false for motion codes
    /// that are only warned about.
    fn set_block_motion_mode(&mut self, block: &GCodeBlock) -> Result<bool, CanonError> {
        let flags = &block.flags;
        if flags.has_code(BlockCodes::UNIMPLEMENTED_MOTION) {
            let _ = unimplemented("canned cycles and probing");
            return Ok(false);
        }
        if flags.has_code(ModalGroup::Motion.members()) {
            self.require_modal("set motion mode")?;
            self.store.committed.motion_mode = block.values.motion_mode;
        }
        Ok(true)
    }

    fn run_motion(&mut self, block: &GCodeBlock) -> Result<(), CanonError> {
        let v = &block.values;
        let flags = &block.flags;

        if !flags.has_axis_words() {
            return Ok(());
        }

        match self.store.committed.motion_mode {
            MotionMode::StraightTraverse => self.op_straight_traverse(&v.target, flags.axes),
            MotionMode::StraightFeed => self.op_straight_feed(&v.target, flags.axes),
            MotionMode::CwArc => {
                self.op_arc_feed(&v.target, flags.axes, arc_center(block)?, Direction::Cw)
            }
            MotionMode::CcwArc => {
                self.op_arc_feed(&v.target, flags.axes, arc_center(block)?, Direction::Ccw)
            }
            MotionMode::CancelMotionMode => {
                warn!(axes = ?flags.axes, "axis words with motion cancelled, no move");
                Ok(())
            }
        }
    }
}

fn arc_center(block: &GCodeBlock) -> Result<ArcCenter, CanonError> {
    let flags = &block.flags;
    let radius = flags.has_word(WordFlags::R);
    let offsets = flags.has_word(WordFlags::IJK);
    match (radius, offsets) {
        (true, true) => Err(CanonError::ArcGeometryError {
            reason: "both radius and center offsets given",
        }),
        (true, false) => Ok(ArcCenter::Radius(block.values.arc_radius)),
        (false, true) => Ok(ArcCenter::Offset(block.values.arc_offset)),
        (false, false) => Err(CanonError::ArcGeometryError {
            reason: "arc without radius or center offsets",
        }),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
