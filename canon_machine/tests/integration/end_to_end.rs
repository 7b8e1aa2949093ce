//! Integration test: block streams end to end.
//!
//! Modal carry-forward across blocks, coordinate systems, rejected blocks in
//! the middle of a stream, and status reporting.

use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::error::CanonError;
use canon_common::machine::state::{
    CoordSystem, DistanceMode, MachineState, ProgramFlow, SpindleMode, UnitsMode,
};
use canon_machine::collab::{PlannerRequest, PlannerSignal, SpindleCommand};
use canon_machine::script::settle;

use super::running;

#[test]
fn incremental_move_after_absolute_move() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G21).build()).unwrap();
    m.execute_block(&m.block().code(BlockCodes::G90).build()).unwrap();
    m.execute_block(
        &m.block()
            .code(BlockCodes::G1)
            .x(10.0)
            .y(0.0)
            .f(100.0)
            .build(),
    )
    .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G91).build()).unwrap();
    m.execute_block(&m.block().x(5.0).build()).unwrap();

    let target = m.planner().history().last().and_then(PlannerRequest::target);
    assert_eq!(target, Some(AxisVector::xyz(15.0, 0.0, 0.0)));
    assert_eq!(m.canonical_position(), AxisVector::xyz(15.0, 0.0, 0.0));
}

#[test]
fn unset_axes_keep_position_in_incremental_mode() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G0).x(1.0).y(2.0).z(3.0).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::G91).y(10.0).build())
        .unwrap();
    assert_eq!(m.canonical_position(), AxisVector::xyz(1.0, 12.0, 3.0));
}

#[test]
fn inch_program_in_second_work_system() {
    let mut m = running();
    m.execute_block(
        &m.block()
            .code(BlockCodes::G10)
            .l()
            .p(2.0)
            .x(100.0)
            .y(50.0)
            .build(),
    )
    .unwrap();
    assert_eq!(
        m.coord_offsets(CoordSystem::G55),
        AxisVector::xyz(100.0, 50.0, 0.0)
    );

    m.execute_block(
        &m.block()
            .code(BlockCodes::G20)
            .code(BlockCodes::G55)
            .code(BlockCodes::G0)
            .x(1.0)
            .y(2.0)
            .build(),
    )
    .unwrap();
    assert_eq!(m.coord_system(), CoordSystem::G55);
    assert_eq!(m.units_mode(), UnitsMode::Inches);
    let p = m.canonical_position();
    assert!((p.x() - 125.4).abs() < 1e-9);
    assert!((p.y() - 100.8).abs() < 1e-9);
    assert!((m.work_position(Axis::X) - 1.0).abs() < 1e-9);
    assert!((m.coord_offset(Axis::Y) - 50.0).abs() < 1e-9);
}

#[test]
fn stream_continues_after_rejected_block() {
    let mut m = running();
    let blocks = [
        m.block().n(10).code(BlockCodes::G91).build(),
        m.block().n(20).code(BlockCodes::G1).x(5.0).build(),
        m.block().n(30).code(BlockCodes::G1).x(5.0).f(200.0).build(),
    ];
    let results: Vec<_> = blocks.iter().map(|b| m.execute_block(b)).collect();

    assert!(results[0].is_ok());
    assert_eq!(results[1], Err(CanonError::FeedRateNotSet));
    assert!(results[2].is_ok());
    assert_eq!(m.linecount(), 2);
    assert_eq!(m.canonical_position().x(), 5.0);
    assert_eq!(m.distance_mode(), DistanceMode::Incremental);
    assert_eq!(
        m.console().rejections,
        vec![(20, CanonError::FeedRateNotSet)]
    );
}

#[test]
fn rejected_block_restores_offset_table() {
    let mut m = running();
    // G10 runs before M2 fails (M2 outside RUN after the stop)
    m.program_stop().unwrap();
    assert_eq!(m.machine_state(), MachineState::Stop);
    let block = m
        .block()
        .code(BlockCodes::G10)
        .l()
        .p(1.0)
        .x(7.0)
        .code(BlockCodes::M2)
        .build();
    assert!(matches!(
        m.execute_block(&block),
        Err(CanonError::MachineNotReady { .. })
    ));
    assert_eq!(m.coord_offsets(CoordSystem::G54), AxisVector::ZERO);
}

#[test]
fn planner_capacity_checked_before_commit() {
    let mut m = super::machine_with(Default::default());
    *m.planner_mut() = canon_machine::sim::SimPlanner::with_capacity(1);
    m.cycle_start().unwrap();

    m.execute_block(&m.block().code(BlockCodes::G0).x(1.0).build())
        .unwrap();
    let err = m
        .execute_block(&m.block().x(2.0).build())
        .unwrap_err();
    assert!(matches!(err, CanonError::PlannerRejected(_)));
    assert_eq!(m.machine_state(), MachineState::Run, "not a fault");
    assert_eq!(m.canonical_position().x(), 1.0);

    settle(&mut m);
    m.execute_block(&m.block().x(2.0).build()).unwrap();
}

#[test]
fn program_stop_needs_no_slot_on_idle_planner() {
    let mut m = super::machine_with(Default::default());
    *m.planner_mut() = canon_machine::sim::SimPlanner::with_capacity(1);
    m.cycle_start().unwrap();

    m.execute_block(&m.block().code(BlockCodes::G0).x(1.0).build())
        .unwrap();
    settle(&mut m);
    assert_eq!(m.planner().queued(), 0);

    // taken at once, nothing is queued
    m.execute_block(&m.block().code(BlockCodes::M0).build()).unwrap();
    assert_eq!(m.machine_state(), MachineState::Stop);
    assert_eq!(m.planner().queued(), 0);
    m.cycle_start().unwrap();

    // a move plus its stop marker need two slots
    let err = m
        .execute_block(&m.block().x(2.0).code(BlockCodes::M0).build())
        .unwrap_err();
    assert!(matches!(err, CanonError::PlannerRejected(_)));
    assert_eq!(m.machine_state(), MachineState::Run);
    assert_eq!(m.canonical_position().x(), 1.0);
    assert_eq!(m.planner().queued(), 0);
}

#[test]
fn stop_then_end_in_one_stream() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::G1).x(10.0).f(100.0).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::M3).s(1000.0).build())
        .unwrap();
    m.execute_block(&m.block().code(BlockCodes::M0).build()).unwrap();
    m.execute_block(&m.block().x(20.0).build()).unwrap();
    m.execute_block(&m.block().code(BlockCodes::M2).build()).unwrap();
    assert_eq!(m.machine_state(), MachineState::Run);

    // the planner pauses at the stop marker
    let markers = m.planner_mut().complete_all();
    assert_eq!(markers, vec![PlannerRequest::ProgramStop]);
    m.exec_stop();
    assert_eq!(m.machine_state(), MachineState::Stop);
    assert_eq!(m.program_flow(), ProgramFlow::Paused);
    assert_eq!(m.runtime_machine_position().x(), 10.0);
    assert_eq!(m.planner().queued(), 2);

    m.cycle_start().unwrap();
    assert_eq!(m.machine_state(), MachineState::Run);
    assert_eq!(m.planner().signals().last(), Some(&PlannerSignal::Resume));

    let markers = m.planner_mut().complete_all();
    assert_eq!(markers, vec![PlannerRequest::ProgramEnd]);
    m.exec_end();
    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.program_flow(), ProgramFlow::Completed);
    assert_eq!(m.runtime_machine_position().x(), 20.0);
    assert_eq!(
        m.spindle().commands.last(),
        Some(&SpindleCommand::Mode(SpindleMode::Off))
    );
}

#[test]
fn program_end_outside_run_is_not_applied() {
    let mut m = running();
    m.execute_block(&m.block().code(BlockCodes::M0).build()).unwrap();
    assert_eq!(m.machine_state(), MachineState::Stop);
    let commands = m.spindle().commands.len();

    m.exec_end();
    assert_eq!(m.machine_state(), MachineState::Stop);
    assert_eq!(m.program_flow(), ProgramFlow::Paused);
    assert_eq!(m.spindle().commands.len(), commands);
}

#[test]
fn status_reports_follow_blocks() {
    let mut m = running();
    let before = m.console().reports.len();
    m.execute_block(&m.block().n(7).code(BlockCodes::G0).x(3.0).build())
        .unwrap();
    let report = m.console().last_report().cloned().unwrap();
    assert_eq!(m.console().reports.len(), before + 1);
    assert_eq!(report.linenum, 7);
    assert_eq!(report.linecount, 1);
    assert_eq!(report.machine_state, MachineState::Run);
    assert_eq!(report.work_position[0], 3.0);
    // live position lags the model until the planner runs
    assert_eq!(report.machine_position[0], 0.0);
    assert!(report.counter > 0);

    settle(&mut m);
    assert_eq!(m.runtime_machine_position().x(), 3.0);
    assert_eq!(m.runtime_work_position(Axis::X), 3.0);
}
