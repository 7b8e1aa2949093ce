//! Integration test: G28 return to home.

use canon_common::machine::axis::AxisVector;
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::MachineState;
use canon_machine::collab::{MoveKind, PlannerRequest};
use canon_machine::command::CycleStep;
use canon_machine::script::settle;

use super::{running, Machine};

fn traverses(m: &Machine) -> Vec<AxisVector> {
    m.planner()
        .history()
        .iter()
        .filter_map(|r| match r {
            PlannerRequest::Line(l) if l.kind == MoveKind::Traverse => Some(l.target),
            _ => None,
        })
        .collect()
}

fn at(x: f64, y: f64, z: f64) -> Machine {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(x).y(y).z(z).build())
        .unwrap();
    settle(&mut m);
    m
}

#[test]
fn via_intermediate_point() {
    let mut m = at(50.0, 40.0, -10.0);
    m.execute_block(&m.block().code(BlockCodes::G28).z(20.0).build())
        .unwrap();
    assert!(m.cycle_active());

    // nothing moves until the scheduler runs the cycle
    assert_eq!(traverses(&m).len(), 1);
    settle(&mut m);

    let moves = traverses(&m);
    assert_eq!(
        &moves[1..],
        &[AxisVector::xyz(50.0, 40.0, 20.0), AxisVector::ZERO]
    );
    assert!(!m.cycle_active());
    assert_eq!(m.canonical_position(), AxisVector::ZERO);
    assert_eq!(m.runtime_machine_position(), AxisVector::ZERO);
    assert_eq!(m.machine_state(), MachineState::Run);
}

#[test]
fn direct_without_axis_words() {
    let mut m = at(5.0, 6.0, 7.0);
    m.execute_block(&m.block().code(BlockCodes::G28).build())
        .unwrap();
    settle(&mut m);
    assert_eq!(traverses(&m).last(), Some(&AxisVector::ZERO));
    assert_eq!(traverses(&m).len(), 2);
}

#[test]
fn intermediate_point_uses_work_offsets() {
    let mut m = at(0.0, 0.0, 0.0);
    m.execute_block(
        &m.block()
            .code(BlockCodes::G10)
            .l()
            .p(1.0)
            .x(100.0)
            .build(),
    )
    .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G28).x(10.0).build())
        .unwrap();
    settle(&mut m);
    let moves = traverses(&m);
    assert_eq!(moves[1].x(), 110.0);
    assert_eq!(moves[2], AxisVector::ZERO);
}

#[test]
fn motion_refused_while_returning() {
    let mut m = at(5.0, 0.0, 0.0);
    m.execute_block(&m.block().code(BlockCodes::G28).build())
        .unwrap();
    assert_eq!(m.return_to_home_callback(), CycleStep::InProgress);
    assert!(matches!(
        m.execute_block(&m.block().code(BlockCodes::G1).x(1.0).f(100.0).build()),
        Err(CanonError::MachineNotReady {
            state: MachineState::Run,
            ..
        })
    ));
    // waits for the planner between moves
    assert_eq!(m.return_to_home_callback(), CycleStep::InProgress);
    assert_eq!(traverses(&m).len(), 2);
}

#[test]
fn held_cycle_waits_for_cycle_start() {
    let mut m = at(5.0, 5.0, 0.0);
    m.execute_block(&m.block().code(BlockCodes::G28).y(10.0).build())
        .unwrap();
    m.return_to_home_callback();
    m.feedhold().unwrap();
    settle(&mut m);
    assert_eq!(m.machine_state(), MachineState::Hold);
    assert!(m.cycle_active());

    m.cycle_start().unwrap();
    settle(&mut m);
    assert_eq!(m.machine_state(), MachineState::Run);
    assert!(!m.cycle_active());
    assert_eq!(m.canonical_position(), AxisVector::ZERO);
}

#[test]
fn planner_refusal_ends_the_cycle() {
    let mut m = at(5.0, 0.0, 0.0);
    m.execute_block(&m.block().code(BlockCodes::G28).build())
        .unwrap();
    m.planner_mut().reject_next("queue full");
    assert!(matches!(
        m.return_to_home_callback(),
        CycleStep::Failed(CanonError::PlannerRejected(_))
    ));
    assert!(!m.cycle_active());
    assert_eq!(m.canonical_position().x(), 5.0);
}
