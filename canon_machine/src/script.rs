//! Block script replay.
//!
//! A block script is a TOML list of steps standing in for the parser and the
//! operator. Each step is either a block (codes and words) or an operator
//! action:
//!
//! ```toml
//! auto_complete = true
//!
//! [[step]]
//! n = 10
//! codes = ["G21", "G90"]
//!
//! [[step]]
//! codes = ["G1"]
//! x = 10.0
//! f = 100.0
//!
//! [[step]]
//! action = "feedhold"
//! ```
//!
//! With `auto_complete` the simulated planner finishes queued motion after
//! every block; otherwise motion stays queued until a `complete` step.

use canon_common::machine::axis::Axis;
use canon_common::machine::block::{BlockBuilder, GCodeBlock};
use canon_common::machine::codes::BlockCodes;
use canon_common::machine::state::{FeedholdState, MachineState};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collab::{Console, Planner, PlannerRequest, SpindleDriver};
use crate::command::dispatch::CanonicalMachine;
use crate::sim::SimPlanner;

/// Upper bound on scheduler ticks spent settling after one step.
pub const MAX_SETTLE_TICKS: usize = 1000;

// ─── Script Types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct BlockScript {
    #[serde(default = "default_auto_complete")]
    pub auto_complete: bool,
    #[serde(default, rename = "step")]
    pub steps: Vec<ScriptStep>,
}

fn default_auto_complete() -> bool {
    true
}

/// Operator or scheduler action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptAction {
    CycleStart,
    Feedhold,
    Abort,
    /// One scheduler tick.
    Tick,
    /// Let the planner finish everything queued.
    Complete,
}

/// One script step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    pub action: Option<ScriptAction>,
    pub n: Option<u32>,
    #[serde(default)]
    pub codes: Vec<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub f: Option<f64>,
    pub s: Option<f64>,
    pub t: Option<u8>,
    pub p: Option<f64>,
    pub l: Option<u8>,
    pub r: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub k: Option<f64>,
    pub comment: Option<String>,
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("step {step}: unknown code {code:?}")]
    UnknownCode { step: usize, code: String },

    #[error("step {step}: only L2 is supported, got L{value}")]
    UnsupportedL { step: usize, value: u8 },

    #[error("step {step}: action steps take no codes or words")]
    MixedStep { step: usize },
}

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub rejected: usize,
    pub actions: usize,
}

// ─── Parsing ────────────────────────────────────────────────────────

/// Parse a code word such as `"G1"`, `"g01"` or `"G92.1"`.
pub fn parse_code(text: &str) -> Option<BlockCodes> {
    let text = text.trim().to_ascii_uppercase();
    let (letter, number) = text.split_at_checked(1)?;
    let (major, minor) = match number.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (number, None),
    };
    let major: u32 = major.parse().ok()?;
    let name = match minor {
        Some(minor) => format!("{letter}{major}_{minor}"),
        None => format!("{letter}{major}"),
    };
    BlockCodes::from_name(&name)
}

impl ScriptStep {
    fn is_block(&self) -> bool {
        !self.codes.is_empty()
            || self.n.is_some()
            || self.comment.is_some()
            || self.msg.is_some()
            || self.axis_words().any(|(_, v)| v.is_some())
            || [self.f, self.s, self.p, self.r, self.i, self.j, self.k]
                .iter()
                .any(Option::is_some)
            || self.t.is_some()
            || self.l.is_some()
    }

    fn axis_words(&self) -> impl Iterator<Item = (Axis, Option<f64>)> {
        Axis::ALL
            .into_iter()
            .zip([self.x, self.y, self.z, self.a, self.b, self.c])
    }

    /// Build the block on top of `base` (the carried-forward model).
    pub fn to_block(&self, index: usize, base: BlockBuilder) -> Result<GCodeBlock, ScriptError> {
        let mut b = base;
        if let Some(n) = self.n {
            b = b.n(n);
        }
        for text in &self.codes {
            let code = parse_code(text).ok_or_else(|| ScriptError::UnknownCode {
                step: index,
                code: text.clone(),
            })?;
            b = b.code(code);
        }
        for (axis, value) in self.axis_words() {
            if let Some(value) = value {
                b = b.axis(axis, value);
            }
        }
        if let Some(f) = self.f {
            b = b.f(f);
        }
        if let Some(s) = self.s {
            b = b.s(s);
        }
        if let Some(t) = self.t {
            b = b.t(t);
        }
        if let Some(p) = self.p {
            b = b.p(p);
        }
        match self.l {
            Some(2) => b = b.l(),
            Some(value) => return Err(ScriptError::UnsupportedL { step: index, value }),
            None => {}
        }
        if let Some(r) = self.r {
            b = b.r(r);
        }
        if let Some(i) = self.i {
            b = b.i(i);
        }
        if let Some(j) = self.j {
            b = b.j(j);
        }
        if let Some(k) = self.k {
            b = b.k(k);
        }
        if let Some(text) = &self.comment {
            b = b.comment(text);
        }
        if let Some(text) = &self.msg {
            b = b.message(text);
        }
        Ok(b.build())
    }
}

// ─── Replay ─────────────────────────────────────────────────────────

/// Replay `script` against a machine driving the simulated planner.
///
/// Rejected blocks are counted and reported to the console; replay
/// continues. Script errors (unknown codes) stop it.
pub fn run_script<S: SpindleDriver, C: Console>(
    machine: &mut CanonicalMachine<SimPlanner, S, C>,
    script: &BlockScript,
) -> Result<ScriptSummary, ScriptError> {
    let mut summary = ScriptSummary::default();
    for (index, step) in script.steps.iter().enumerate() {
        match step.action {
            Some(_) if step.is_block() => return Err(ScriptError::MixedStep { step: index }),
            Some(action) => {
                summary.actions += 1;
                run_action(machine, action);
            }
            None => {
                let block = step.to_block(index, machine.block())?;
                match machine.execute_block(&block) {
                    Ok(()) => summary.executed += 1,
                    Err(e) if e.is_warning() => summary.executed += 1,
                    Err(_) => summary.rejected += 1,
                }
                if script.auto_complete {
                    settle(machine);
                }
            }
        }
    }
    settle(machine);
    info!(
        executed = summary.executed,
        rejected = summary.rejected,
        actions = summary.actions,
        "script finished"
    );
    Ok(summary)
}

fn run_action<S: SpindleDriver, C: Console>(
    machine: &mut CanonicalMachine<SimPlanner, S, C>,
    action: ScriptAction,
) {
    debug!(?action, "script action");
    let result = match action {
        ScriptAction::CycleStart => machine.cycle_start(),
        ScriptAction::Feedhold => machine.feedhold(),
        ScriptAction::Abort => {
            machine.abort();
            Ok(())
        }
        ScriptAction::Tick => {
            machine.tick();
            Ok(())
        }
        ScriptAction::Complete => {
            settle(machine);
            Ok(())
        }
    };
    if let Err(e) = result {
        warn!(?action, error = %e, "action refused");
    }
}

/// Let the planner run and tick the callbacks until nothing is in progress
/// or the machine waits for the operator (held, stopped or reset).
pub fn settle<S: SpindleDriver, C: Console>(machine: &mut CanonicalMachine<SimPlanner, S, C>) {
    for _ in 0..MAX_SETTLE_TICKS {
        for marker in machine.planner_mut().complete_all() {
            match marker {
                PlannerRequest::ProgramStop => machine.exec_stop(),
                PlannerRequest::ProgramEnd => machine.exec_end(),
                _ => {}
            }
        }
        let active = machine.tick();
        let waiting = match machine.machine_state() {
            MachineState::Hold => machine.hold_state() == FeedholdState::Hold,
            MachineState::Stop | MachineState::Reset => true,
            _ => false,
        };
        if waiting || (!active && !machine.planner().is_busy()) {
            return;
        }
    }
    warn!(ticks = MAX_SETTLE_TICKS, "machine did not settle");
}
