//! Integration test: replay of the shipped block script.
//!
//! Loads `config/machine.toml` and `config/blocks.toml` the way the binary
//! does and checks the end state of the program.

use std::path::Path;

use canon_common::config::ConfigLoader;
use canon_common::machine::axis::AxisVector;
use canon_common::machine::state::{HomingState, MachineState, SpindleMode, UnitsMode};
use canon_machine::collab::SpindleCommand;
use canon_machine::config::load_config;
use canon_machine::script::{run_script, BlockScript, ScriptError};

use super::{machine_with, running};

const CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/machine.toml");
const BLOCKS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/blocks.toml");

#[test]
fn shipped_script_runs_clean() {
    let loaded = load_config(Path::new(CONFIG)).unwrap();
    let script = BlockScript::load(Path::new(BLOCKS)).unwrap();
    let mut m = machine_with(loaded);

    let summary = run_script(&mut m, &script).unwrap();
    assert_eq!(summary.rejected, 0, "rejections: {:?}", m.console().rejections);
    assert_eq!(summary.executed, 13);
    assert_eq!(summary.actions, 1);

    assert_eq!(m.machine_state(), MachineState::Reset);
    assert_eq!(m.homing_state(), HomingState::Homed);
    assert_eq!(m.tool(), 3);
    assert_eq!(m.spindle_mode(), SpindleMode::Off);
    assert_eq!(m.units_mode(), UnitsMode::Millimeters);
    assert_eq!(m.runtime_machine_position(), AxisVector::xyz(60.0, 90.0, 0.0));
    assert_eq!(m.origin_offset(), AxisVector::ZERO);

    assert_eq!(m.console().comments, vec!["pocket 40x40".to_string()]);
    assert_eq!(m.console().messages, vec!["offsets cleared".to_string()]);
    assert!(m
        .spindle()
        .commands
        .contains(&SpindleCommand::Speed(12000.0)));
    assert_eq!(
        m.spindle().commands.last(),
        Some(&SpindleCommand::Mode(SpindleMode::Off))
    );
    assert_eq!(m.console().last_report().map(|r| r.linenum), Some(130));
}

#[test]
fn manual_completion_keeps_motion_queued() {
    let script = BlockScript::from_toml_str(
        r#"
        auto_complete = false

        [[step]]
        codes = ["G0"]
        x = 5.0

        [[step]]
        x = 8.0

        [[step]]
        action = "complete"
        "#,
    )
    .unwrap();
    let mut m = running();
    let summary = run_script(&mut m, &script).unwrap();
    assert_eq!(summary.executed, 2);
    assert_eq!(m.planner().history().len(), 2);
    assert_eq!(m.runtime_machine_position().x(), 8.0);
}

#[test]
fn rejected_blocks_are_counted() {
    let script = BlockScript::from_toml_str(
        r#"
        [[step]]
        action = "cycle_start"

        [[step]]
        n = 5
        codes = ["G1"]
        x = 5.0

        [[step]]
        n = 6
        codes = ["G0", "G1"]

        [[step]]
        codes = ["M8"]
        "#,
    )
    .unwrap();
    let mut m = machine_with(Default::default());
    let summary = run_script(&mut m, &script).unwrap();
    assert_eq!(summary.rejected, 2);
    // unimplemented codes warn but do not reject
    assert_eq!(summary.executed, 1);
    assert_eq!(
        m.console().rejections.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
        vec![5, 6]
    );
}

#[test]
fn script_errors_stop_replay() {
    let script = BlockScript::from_toml_str(
        r#"
        [[step]]
        action = "feedhold"
        x = 1.0
        "#,
    )
    .unwrap();
    let mut m = running();
    assert_eq!(
        run_script(&mut m, &script),
        Err(ScriptError::MixedStep { step: 0 })
    );
}
