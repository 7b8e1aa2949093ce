//! Homing cycle supervision.
//!
//! The layer sequences homing, it does not find switches. Each phase is one
//! homing-internal planner move; the limit-switch driver stops the move on
//! contact and the planner reports where the axis ended up.
//!
//! ## Per-axis phases
//!
//! | Phase        | Move                                    | Velocity         |
//! |--------------|-----------------------------------------|------------------|
//! | Search       | full travel toward the switch           | search_velocity  |
//! | Backoff      | `latch_backoff` away from the switch    | search_velocity  |
//! | Latch        | `2 × latch_backoff` toward the switch   | latch_velocity   |
//! | ZeroBackoff  | `zero_backoff` away from the switch     | search_velocity  |
//! | SetZero      | none, position := `home_position`       | n/a              |
//!
//! ## Lifecycle
//!
//! 1. Block requests G28.1 / G30 → dispatcher calls [`HomingCycle::start`]
//! 2. Each tick with the planner idle: [`HomingCycle::step`] → next action
//! 3. After the last axis: `Complete`, dispatcher marks HOMED and returns to RUN
//! 4. Planner rejection: dispatcher calls [`HomingCycle::fail`], NOT_HOMED, STOP

use canon_common::consts::AXES;
use canon_common::machine::axis::{Axis, AxisVector};
use canon_common::machine::config::AxisConfig;

// ─── Homing Phases ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Idle,
    Search,
    Backoff,
    Latch,
    ZeroBackoff,
    SetZero,
    Complete,
    Failed,
}

// ─── Homing Step ────────────────────────────────────────────────────

/// Action the dispatcher must take for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingStep {
    /// No cycle running.
    Idle,
    /// Submit a homing move.
    Move {
        axis: Axis,
        target: AxisVector,
        /// [mm/min]
        feed_rate: f64,
    },
    /// Axis is referenced; set its machine position.
    SetPosition { axis: Axis, position: f64 },
    /// All axes referenced.
    Complete,
}

// ─── Homing Cycle ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HomingCycle {
    axes: heapless::Vec<Axis, AXES>,
    index: usize,
    phase: HomingPhase,
}

impl HomingCycle {
    pub const fn new() -> Self {
        Self {
            axes: heapless::Vec::new(),
            index: 0,
            phase: HomingPhase::Idle,
        }
    }

    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Whether a cycle is running.
    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(
            self.phase,
            HomingPhase::Idle | HomingPhase::Complete | HomingPhase::Failed
        )
    }

    /// Whether a cycle is running or has a completion still to deliver.
    #[inline]
    pub fn is_pending(&self) -> bool {
        !matches!(self.phase, HomingPhase::Idle | HomingPhase::Failed)
    }

    /// Axis currently being homed.
    pub fn current_axis(&self) -> Option<Axis> {
        if self.is_active() {
            self.axes.get(self.index).copied()
        } else {
            None
        }
    }

    /// Begin a cycle over `axes` in order.
    pub fn start(&mut self, axes: heapless::Vec<Axis, AXES>) {
        self.phase = if axes.is_empty() {
            HomingPhase::Complete
        } else {
            HomingPhase::Search
        };
        self.axes = axes;
        self.index = 0;
    }

    pub fn fail(&mut self) {
        self.phase = HomingPhase::Failed;
    }

    pub fn abort(&mut self) {
        self.phase = HomingPhase::Idle;
        self.axes.clear();
        self.index = 0;
    }

    /// Advance one step. Call only while the planner is idle, with the
    /// machine position the planner reports.
    pub fn step(&mut self, position: &AxisVector, axes: &[AxisConfig; AXES]) -> HomingStep {
        if !self.is_active() {
            return match self.phase {
                HomingPhase::Complete => {
                    self.phase = HomingPhase::Idle;
                    HomingStep::Complete
                }
                _ => HomingStep::Idle,
            };
        }
        let Some(&axis) = self.axes.get(self.index) else {
            self.phase = HomingPhase::Idle;
            return HomingStep::Complete;
        };

        let cfg = &axes[axis.index()];
        let homing = &cfg.homing;
        let sign = homing.direction.sign();
        let here = position[axis];
        let relative = |distance: f64, feed_rate: f64| HomingStep::Move {
            axis,
            target: position.with(axis, here + distance),
            feed_rate,
        };

        match self.phase {
            HomingPhase::Search => {
                self.phase = HomingPhase::Backoff;
                relative(
                    sign * (cfg.travel_max - cfg.travel_min),
                    homing.search_velocity,
                )
            }
            HomingPhase::Backoff => {
                self.phase = HomingPhase::Latch;
                relative(-sign * homing.latch_backoff, homing.search_velocity)
            }
            HomingPhase::Latch => {
                self.phase = HomingPhase::ZeroBackoff;
                relative(sign * 2.0 * homing.latch_backoff, homing.latch_velocity)
            }
            HomingPhase::ZeroBackoff => {
                self.phase = HomingPhase::SetZero;
                relative(-sign * homing.zero_backoff, homing.search_velocity)
            }
            HomingPhase::SetZero => {
                self.index += 1;
                self.phase = if self.index < self.axes.len() {
                    HomingPhase::Search
                } else {
                    HomingPhase::Complete
                };
                HomingStep::SetPosition {
                    axis,
                    position: homing.home_position,
                }
            }
            HomingPhase::Idle | HomingPhase::Complete | HomingPhase::Failed => HomingStep::Idle,
        }
    }
}

impl Default for HomingCycle {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
