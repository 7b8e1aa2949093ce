//! Integration test: feedhold sequencing.
//!
//! RUN → HOLD (SYNC → PLAN → DECEL → HOLD) → cycle start → END_HOLD → RUN,
//! and the variant where a program stop was already queued.

use canon_common::machine::codes::BlockCodes;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{FeedholdState, MachineState};
use canon_machine::collab::{PlannerRequest, PlannerSignal};
use canon_machine::command::CycleStep;

use super::{running, Machine};

/// Running machine with a feed move in flight.
fn moving() -> Machine {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G1).x(100.0).f(600.0).build())
        .unwrap();
    m.planner_mut().set_velocity(600.0);
    m.planner_mut().set_at_boundary(false);
    m
}

/// Drive the hold sub-states to HOLD.
fn decelerate(m: &mut Machine) {
    m.planner_mut().set_at_boundary(true);
    assert_eq!(m.hold_callback(), CycleStep::InProgress);
    assert_eq!(m.hold_state(), FeedholdState::Plan);
    assert_eq!(m.hold_callback(), CycleStep::InProgress);
    assert_eq!(m.hold_state(), FeedholdState::Decel);
    m.planner_mut().set_velocity(0.0);
    assert_eq!(m.hold_callback(), CycleStep::Complete);
    assert_eq!(m.hold_state(), FeedholdState::Hold);
}

#[test]
fn hold_and_resume() {
    let mut m = moving();
    m.feedhold().unwrap();
    assert_eq!(m.machine_state(), MachineState::Hold);
    assert_eq!(m.hold_state(), FeedholdState::Sync);

    // waits for the segment boundary
    assert_eq!(m.hold_callback(), CycleStep::InProgress);
    assert_eq!(m.hold_state(), FeedholdState::Sync);
    assert!(m.planner().signals().is_empty());

    m.planner_mut().set_at_boundary(true);
    m.hold_callback();
    assert_eq!(m.planner().signals(), &[PlannerSignal::PlanFeedhold]);
    m.hold_callback();
    assert_eq!(m.hold_state(), FeedholdState::Decel);

    // still moving
    assert_eq!(m.hold_callback(), CycleStep::InProgress);
    m.planner_mut().set_velocity(0.0);
    assert_eq!(m.hold_callback(), CycleStep::Complete);
    assert_eq!(m.hold_state(), FeedholdState::Hold);
    assert_eq!(
        m.console().last_report().map(|r| r.hold_state),
        Some(FeedholdState::Hold)
    );

    // repeated feedhold is a no-op; motion is refused while held
    m.feedhold().unwrap();
    assert_eq!(m.machine_state(), MachineState::Hold);
    assert!(matches!(
        m.execute_block(&m.block().x(10.0).build()),
        Err(CanonError::MachineNotReady {
            state: MachineState::Hold,
            ..
        })
    ));

    m.cycle_start().unwrap();
    assert_eq!(m.machine_state(), MachineState::EndHold);
    assert_eq!(m.hold_callback(), CycleStep::Complete);
    assert_eq!(m.machine_state(), MachineState::Run);
    assert_eq!(m.hold_state(), FeedholdState::Off);
    assert_eq!(m.planner().signals().last(), Some(&PlannerSignal::Resume));

    m.planner_mut().complete_all();
    assert_eq!(m.runtime_machine_position().x(), 100.0);
}

#[test]
fn hold_with_pending_stop_ends_in_stop() {
    let mut m = moving();
    m.execute_block(&m.block().code(BlockCodes::M0).build()).unwrap();
    assert_eq!(m.planner().history().last(), Some(&PlannerRequest::ProgramStop));
    assert_eq!(m.machine_state(), MachineState::Run);

    m.feedhold().unwrap();
    decelerate(&mut m);
    m.cycle_start().unwrap();
    m.hold_callback();
    assert_eq!(m.machine_state(), MachineState::Stop);
    assert!(m.planner().is_held(), "planner stays held until the next start");

    m.cycle_start().unwrap();
    assert_eq!(m.machine_state(), MachineState::Run);
    assert!(!m.planner().is_held());

    // the queued stop marker was taken at the hold; reaching it is a no-op
    for marker in m.planner_mut().complete_all() {
        assert_eq!(marker, PlannerRequest::ProgramStop);
        m.exec_stop();
    }
    assert_eq!(m.machine_state(), MachineState::Run);
}

#[test]
fn queued_stop_without_hold() {
    let mut m = moving();
    m.execute_block(&m.block().code(BlockCodes::M1).build()).unwrap();
    for marker in m.planner_mut().complete_all() {
        assert_eq!(marker, PlannerRequest::ProgramStop);
        m.exec_stop();
    }
    assert_eq!(m.machine_state(), MachineState::Stop);
    m.cycle_start().unwrap();
    assert_eq!(m.machine_state(), MachineState::Run);
}

#[test]
fn feedhold_outside_run_refused() {
    let mut m = super::machine_with(Default::default());
    assert!(matches!(
        m.feedhold(),
        Err(CanonError::MachineNotReady {
            state: MachineState::Reset,
            ..
        })
    ));
    assert_eq!(m.hold_callback(), CycleStep::Idle);
}

#[test]
fn abort_during_hold() {
    let mut m = moving();
    m.feedhold().unwrap();
    decelerate(&mut m);
    m.abort();
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.hold_state(), FeedholdState::Off);
    assert_eq!(m.planner().queued(), 0);
}
