//! Simulation collaborators.
//!
//! In-process stand-ins for the planner, the spindle driver and the console.
//! The replay binary and the tests drive the canonical machine through them.
//! [`SimPlanner`] executes nothing on its own: queued motion finishes only
//! when [`SimPlanner::complete_all`] or [`SimPlanner::complete_next`] is
//! called, which lets tests observe the busy window.

use std::collections::VecDeque;

use canon_common::machine::axis::AxisVector;
use canon_common::machine::error::CanonError;
use canon_common::machine::status::StatusReport;
use tracing::{error, info, warn};

use crate::collab::{
    Console, Planner, PlannerError, PlannerRequest, PlannerSignal, SpindleCommand, SpindleDriver,
};

/// Planner queue depth.
pub const SIM_PLANNER_CAPACITY: usize = 28;

// ─── Planner ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimPlanner {
    queue: VecDeque<PlannerRequest>,
    history: Vec<PlannerRequest>,
    signals: Vec<PlannerSignal>,
    capacity: usize,
    position: AxisVector,
    velocity: f64,
    at_boundary: bool,
    held: bool,
    reject_next: Option<String>,
}

impl SimPlanner {
    pub fn new() -> Self {
        Self::with_capacity(SIM_PLANNER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            history: Vec::new(),
            signals: Vec::new(),
            capacity,
            position: AxisVector::ZERO,
            velocity: 0.0,
            at_boundary: true,
            held: false,
            reject_next: None,
        }
    }

    /// Every accepted request, in submission order.
    pub fn history(&self) -> &[PlannerRequest] {
        &self.history
    }

    /// Every signal received, in order.
    pub fn signals(&self) -> &[PlannerSignal] {
        &self.signals
    }

    /// Requests not yet executed.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Queue halted by a feedhold.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    pub fn set_at_boundary(&mut self, at_boundary: bool) {
        self.at_boundary = at_boundary;
    }

    /// Refuse the next submission with `reason`.
    pub fn reject_next(&mut self, reason: &str) {
        self.reject_next = Some(reason.to_string());
    }

    /// Execute the oldest queued request. Returns it, or `None` if the queue
    /// is empty or held. Reaching a program stop marker holds the queue
    /// until `Resume`.
    pub fn complete_next(&mut self) -> Option<PlannerRequest> {
        if self.held {
            return None;
        }
        let request = self.queue.pop_front()?;
        if let Some(target) = request.target() {
            self.position = target;
        }
        if request == PlannerRequest::ProgramStop {
            self.held = true;
        }
        if self.queue.is_empty() {
            self.velocity = 0.0;
        }
        Some(request)
    }

    /// Execute everything queued. Returns the program markers reached, in order.
    pub fn complete_all(&mut self) -> Vec<PlannerRequest> {
        let mut markers = Vec::new();
        while let Some(request) = self.complete_next() {
            if matches!(
                request,
                PlannerRequest::ProgramStop | PlannerRequest::ProgramEnd
            ) {
                markers.push(request);
            }
        }
        markers
    }
}

impl Default for SimPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner for SimPlanner {
    fn submit(&mut self, request: PlannerRequest) -> Result<(), PlannerError> {
        if let Some(reason) = self.reject_next.take() {
            return Err(PlannerError(reason));
        }
        if self.queue.len() >= self.capacity {
            return Err(PlannerError("queue full".to_string()));
        }
        self.queue.push_back(request);
        self.history.push(request);
        Ok(())
    }

    fn signal(&mut self, signal: PlannerSignal) {
        match signal {
            PlannerSignal::PlanFeedhold => self.held = true,
            PlannerSignal::Resume => self.held = false,
            PlannerSignal::Abort => {
                self.queue.clear();
                self.held = false;
                self.velocity = 0.0;
            }
        }
        self.signals.push(signal);
    }

    fn available(&self) -> usize {
        self.capacity.saturating_sub(self.queue.len())
    }

    fn is_busy(&self) -> bool {
        !self.queue.is_empty()
    }

    fn runtime_position(&self) -> AxisVector {
        self.position
    }

    fn set_position(&mut self, position: AxisVector) {
        self.position = position;
    }

    fn runtime_velocity(&self) -> f64 {
        self.velocity
    }

    fn at_segment_boundary(&self) -> bool {
        self.at_boundary
    }
}

// ─── Spindle ────────────────────────────────────────────────────────

/// Spindle driver that records every command.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub commands: Vec<SpindleCommand>,
}

impl SpindleDriver for RecordingDriver {
    fn execute(&mut self, command: SpindleCommand) {
        self.commands.push(command);
    }
}

// ─── Console ────────────────────────────────────────────────────────

/// Console that records everything it is sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingConsole {
    pub comments: Vec<String>,
    pub messages: Vec<String>,
    pub reports: Vec<StatusReport>,
    pub rejections: Vec<(u32, CanonError)>,
}

impl RecordingConsole {
    pub fn last_report(&self) -> Option<&StatusReport> {
        self.reports.last()
    }
}

impl Console for RecordingConsole {
    fn comment(&mut self, text: &str) {
        self.comments.push(text.to_string());
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn status_report(&mut self, report: &StatusReport) {
        self.reports.push(report.clone());
    }

    fn block_rejected(&mut self, linenum: u32, error: &CanonError) {
        self.rejections.push((linenum, error.clone()));
    }
}

/// Console for the replay binary: text goes to the log, status reports to
/// stdout as one JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn comment(&mut self, text: &str) {
        info!(target: "console", comment = text);
    }

    fn message(&mut self, text: &str) {
        info!(target: "console", text, "MSG");
    }

    fn status_report(&mut self, report: &StatusReport) {
        match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "status report not serializable"),
        }
    }

    fn block_rejected(&mut self, linenum: u32, error: &CanonError) {
        error!(target: "console", linenum, code = error.code(), %error, "block rejected");
    }
}
