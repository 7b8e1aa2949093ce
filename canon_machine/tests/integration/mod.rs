//! Shared fixtures for the integration tests.

mod abort;
mod end_to_end;
mod feedhold;
mod homing;
mod origin_offsets;
mod return_home;
mod script_replay;

use canon_machine::config::{load_config_from_str, LoadedConfig};
use canon_machine::sim::{RecordingConsole, RecordingDriver, SimPlanner};
use canon_machine::CanonicalMachine;

pub type Machine = CanonicalMachine<SimPlanner, RecordingDriver, RecordingConsole>;

/// Machine on `config`, still in RESET.
pub fn machine_with(config: LoadedConfig) -> Machine {
    CanonicalMachine::new(
        config,
        SimPlanner::new(),
        RecordingDriver::default(),
        RecordingConsole::default(),
    )
}

/// Default configuration, cycle started.
pub fn running() -> Machine {
    let mut m = machine_with(LoadedConfig::default());
    m.cycle_start().expect("cycle start from RESET");
    m
}

/// Machine on a TOML configuration, still in RESET.
pub fn machine_from_toml(toml: &str) -> Machine {
    machine_with(load_config_from_str(toml).expect("valid test config"))
}

