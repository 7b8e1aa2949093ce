//! Integration test: homing cycle.
//!
//! G28.1 runs the configured sequence through the planner, marks the
//! machine HOMED and enables soft limits. A planner refusal mid-cycle leaves
//! the machine stopped and not homed.

use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{HomingState, MachineState};
use canon_machine::collab::{MoveKind, PlannerRequest};
use canon_machine::command::CycleStep;
use canon_machine::script::settle;

use super::{machine_from_toml, Machine};

const MILL: &str = include_str!("../../config/machine.toml");

fn homing_moves(m: &Machine) -> Vec<(Axis, AxisVector)> {
    let mut last = AxisVector::ZERO;
    let mut moves: Vec<(Axis, AxisVector)> = Vec::new();
    for request in m.planner().history() {
        let PlannerRequest::Line(line) = request else {
            continue;
        };
        if line.kind == MoveKind::Homing {
            let axis = Axis::ALL
                .into_iter()
                .find(|a| line.target[*a] != last[*a])
                .unwrap_or(Axis::X);
            moves.push((axis, line.target));
            last = line.target;
            // four moves per axis, then the axis is set to its home position (0)
            if moves.len() % 4 == 0 {
                last[axis] = 0.0;
            }
        } else {
            last = line.target;
        }
    }
    moves
}

#[test]
fn homing_from_reset() {
    let mut m = machine_from_toml(MILL);
    assert_eq!(m.homing_state(), HomingState::NotHomed);

    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();
    assert_eq!(m.machine_state(), MachineState::Homing);
    assert_eq!(m.homing_state(), HomingState::InCycle);
    assert!(m.cycle_active());

    // motion and modal changes wait for the cycle
    assert!(matches!(
        m.execute_block(&m.block().code(BlockCodes::G0).x(10.0).build()),
        Err(CanonError::MachineNotReady {
            state: MachineState::Homing,
            ..
        })
    ));
    assert!(m.execute_block(&m.block().code(BlockCodes::G20).build()).is_err());

    settle(&mut m);
    assert_eq!(m.machine_state(), MachineState::Run);
    assert_eq!(m.homing_state(), HomingState::Homed);
    assert!(m.is_homed());
    assert!(!m.cycle_active());

    let moves = homing_moves(&m);
    assert_eq!(moves.len(), 12, "four moves per axis");
    let order: Vec<_> = moves.iter().step_by(4).map(|(a, _)| *a).collect();
    assert_eq!(order, vec![Axis::Z, Axis::X, Axis::Y]);
    assert_eq!(moves[0].1.z(), 120.0, "Z searches positive");
    assert_eq!(moves[4].1.x(), -400.0, "X searches negative");

    assert_eq!(m.canonical_position(), AxisVector::ZERO);
    assert_eq!(m.runtime_machine_position(), AxisVector::ZERO);
}

#[test]
fn soft_limits_after_homing() {
    let mut m = machine_from_toml(MILL);
    m.cycle_start().unwrap();

    // not homed: travel is not enforced
    m.execute_block(&m.block().code(BlockCodes::G0).x(-10.0).build())
        .unwrap();
    settle(&mut m);

    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();
    settle(&mut m);
    assert!(m.is_homed());

    m.execute_block(&m.block().code(BlockCodes::G0).x(250.0).y(50.0).build())
        .unwrap();
    assert_eq!(
        m.execute_block(&m.block().x(450.0).build()),
        Err(CanonError::AxisRangeError {
            axis: Axis::X,
            value: 450.0
        })
    );
    assert_eq!(m.canonical_position().x(), 250.0);
}

#[test]
fn homing_selected_axes_only() {
    let mut m = machine_from_toml(MILL);
    m.cycle_start().unwrap();
    m.execute_block(&m.block().code(BlockCodes::G28_1).x(0.0).build())
        .unwrap();
    settle(&mut m);
    let moves = homing_moves(&m);
    assert_eq!(moves.len(), 4);
    assert!(moves.iter().all(|(a, _)| *a == Axis::X));
    assert_eq!(m.machine_state(), MachineState::Run);
}

#[test]
fn homing_requires_idle_planner() {
    let mut m = machine_from_toml(MILL);
    m.cycle_start().unwrap();
    m.execute_block(&m.block().code(BlockCodes::G0).x(5.0).build())
        .unwrap();
    assert!(matches!(
        m.execute_block(&m.block().code(BlockCodes::G28_1).build()),
        Err(CanonError::MachineNotReady { .. })
    ));
    assert_eq!(m.machine_state(), MachineState::Run);
}

#[test]
fn homing_failure_stops_machine() {
    let mut m = machine_from_toml(MILL);
    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();

    // first Z move completes, the backoff is refused
    assert_eq!(m.homing_callback(), CycleStep::InProgress);
    m.planner_mut().complete_all();
    m.planner_mut().reject_next("limit switch still active");
    assert!(matches!(
        m.homing_callback(),
        CycleStep::Failed(CanonError::PlannerRejected(_))
    ));

    assert_eq!(m.machine_state(), MachineState::Stop);
    assert_eq!(m.homing_state(), HomingState::NotHomed);
    assert!(!m.cycle_active());
    assert_eq!(m.homing_callback(), CycleStep::Idle);

    // a new cycle can be started from STOP
    m.execute_block(&m.block().code(BlockCodes::G28_1).build())
        .unwrap();
    settle(&mut m);
    assert!(m.is_homed());
}

#[test]
fn homing_without_enabled_axes_refused() {
    let mut m = machine_from_toml(
        r#"
        [[axes]]
        axis = "X"
        "#,
    );
    assert!(matches!(
        m.execute_block(&m.block().code(BlockCodes::G28_1).build()),
        Err(CanonError::MachineNotReady {
            operation: "homing cycle without homing-enabled axes",
            ..
        })
    ));
    assert_eq!(m.machine_state(), MachineState::Reset);
}
