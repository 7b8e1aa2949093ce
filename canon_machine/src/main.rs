//! # Canonical Machine Replay
//!
//! Loads a machine configuration and replays a TOML block script against the
//! canonical machine with simulated planner, spindle and console. Status
//! reports go to stdout as JSON lines, logs go to stderr.

use canon_common::config::{ConfigLoader, LogLevel};
use canon_common::consts::DEFAULT_CONFIG_PATH;
use canon_machine::config::{load_config, LoadedConfig};
use canon_machine::script::{run_script, BlockScript};
use canon_machine::sim::{RecordingDriver, SimPlanner, TracingConsole};
use canon_machine::CanonicalMachine;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Canonical machine layer: replay a block script
#[derive(Parser, Debug)]
#[command(name = "canon_machine")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Replay gcode blocks through the canonical machine layer")]
struct Args {
    /// Machine configuration TOML.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Block script TOML.
    #[arg(long, value_name = "FILE")]
    blocks: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // the configured log level applies unless --verbose overrides it
    let loaded = load_config(&args.config);
    let level = loaded
        .as_ref()
        .map(|l| l.config.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("canon_machine v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|loaded| run(&args, loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: {} from {}, {} homing axes",
        loaded.config.shared.service_name,
        args.config.display(),
        loaded.homing_sequence.len()
    );
    let script = BlockScript::load(&args.blocks)?;
    info!(
        "Script OK: {} steps from {}",
        script.steps.len(),
        args.blocks.display()
    );

    let mut machine = CanonicalMachine::new(
        loaded,
        SimPlanner::new(),
        RecordingDriver::default(),
        TracingConsole,
    );
    let summary = run_script(&mut machine, &script)?;

    info!(
        "Replay done: {} executed, {} rejected, final state {:?}",
        summary.executed,
        summary.rejected,
        machine.machine_state()
    );
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        Level::DEBUG.as_str()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
