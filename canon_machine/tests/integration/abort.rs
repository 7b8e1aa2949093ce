//! Integration test: abort and hardware faults.
//!
//! Abort is accepted from every state. It discards queued motion, drops any
//! running cycle and leaves the model where the planner actually stopped.

use canon_common::machine::axis::AxisVector;
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{HomingState, MachineState, SpindleMode};
use canon_machine::collab::{PlannerSignal, SpindleCommand};

use super::{machine_from_toml, machine_with, running};

const MILL: &str = include_str!("../../config/machine.toml");

#[test]
fn abort_from_every_state() {
    // RESET
    let mut m = machine_with(Default::default());
    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);

    // RUN with queued motion
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.execute_block(&m.block().x(20.0).build()).unwrap();
    assert_eq!(m.planner().queued(), 2);
    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.planner().queued(), 0);
    assert_eq!(m.planner().signals().last(), Some(&PlannerSignal::Abort));

    // STOP
    let mut m = running();
    m.program_stop().unwrap();
    assert_eq!(m.machine_state(), MachineState::Stop);
    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);

    // HOLD
    let mut m = running();
    m.feedhold().unwrap();
    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);
}

#[test]
fn model_follows_planner_position() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.execute_block(&m.block().x(20.0).y(5.0).build()).unwrap();
    assert_eq!(m.canonical_position(), AxisVector::xyz(20.0, 5.0, 0.0));

    // first move done, second discarded
    m.planner_mut().complete_next();
    m.abort();
    assert_eq!(m.canonical_position(), AxisVector::xyz(10.0, 0.0, 0.0));
    assert_eq!(m.runtime_machine_position(), AxisVector::xyz(10.0, 0.0, 0.0));

    // the next program starts from there
    m.cycle_start().unwrap();
    m.execute_block(&m.block().code(BlockCodes::G91).y(1.0).build())
        .unwrap();
    assert_eq!(m.canonical_position(), AxisVector::xyz(10.0, 1.0, 0.0));
}

#[test]
fn abort_stops_spindle_and_keeps_modal_state() {
    let mut m = running();
    m.execute_block(
        &m.block()
            .code(BlockCodes::G20)
            .code(BlockCodes::M3)
            .s(8000.0)
            .build(),
    )
    .unwrap();
    m.abort();
    assert_eq!(m.spindle_mode(), SpindleMode::Off);
    assert_eq!(
        m.spindle().commands.last(),
        Some(&SpindleCommand::Mode(SpindleMode::Off))
    );
    assert_eq!(
        m.units_mode(),
        canon_common::machine::state::UnitsMode::Inches,
        "abort is not a program end"
    );
}

#[test]
fn abort_during_homing() {
    let mut m = machine_from_toml(MILL);
    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();
    m.homing_callback();
    assert_eq!(m.machine_state(), MachineState::Homing);
    assert_eq!(m.planner().queued(), 1);

    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.homing_state(), HomingState::NotHomed);
    assert!(!m.cycle_active());
    assert_eq!(m.planner().queued(), 0);
}

#[test]
fn homed_flag_survives_abort() {
    let mut m = machine_from_toml(MILL);
    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();
    canon_machine::script::settle(&mut m);
    assert!(m.is_homed());
    m.abort();
    assert!(m.is_homed());
}

#[test]
fn planner_refusal_after_commit_is_a_fault() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.planner_mut().complete_all();

    m.planner_mut().reject_next("segment buffer corrupted");
    let err = m
        .execute_block(&m.block().x(30.0).build())
        .unwrap_err();
    assert_eq!(
        err,
        CanonError::PlannerRejected("segment buffer corrupted".to_string())
    );
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.canonical_position().x(), 10.0);
    assert_eq!(m.planner().signals().last(), Some(&PlannerSignal::Abort));
}

#[test]
fn hardware_fault_resets() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build())
        .unwrap();
    m.hardware_fault("following error on X");
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.planner().queued(), 0);
    assert_eq!(m.canonical_position(), AxisVector::ZERO);
    assert!(m.console().last_report().is_some());
}
