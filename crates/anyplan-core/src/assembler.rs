//! Plan assembly state machine.
//!
//! The assembler turns classified lines into completed plans. It holds at
//! most one plan in progress: a new plan announcement discards whatever was
//! collected since the previous one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrailingPlan;
use crate::scanner::LineKind;

/// A plan block closed by the assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedPlan {
    /// Emission order, starting at 1.
    pub sequence: u64,

    /// Search time announced in the plan header, if any.
    pub time: Option<f64>,

    /// Raw plan-body lines in output order.
    pub lines: Vec<String>,
}

impl CompletedPlan {
    /// Body lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblerState {
    Idle,
    Accumulating,
}

/// Accumulates plan-body lines between start and end markers.
#[derive(Debug)]
pub struct PlanAssembler {
    state: AssemblerState,
    buffer: Vec<String>,
    header_time: Option<f64>,
    next_sequence: u64,
    superseded: u64,
}

impl Default for PlanAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Idle,
            buffer: Vec::new(),
            header_time: None,
            next_sequence: 1,
            superseded: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Lines collected for the plan in progress.
    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }

    /// Number of non-empty partial plans dropped by a new announcement.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Advance on one classified line. Returns a plan when the line closes one.
    pub fn feed(&mut self, kind: LineKind, line: &str) -> Option<CompletedPlan> {
        match (self.state, kind) {
            (state, LineKind::PlanStart { time }) => {
                if state == AssemblerState::Accumulating && !self.buffer.is_empty() {
                    self.superseded += 1;
                    debug!(
                        dropped_lines = self.buffer.len(),
                        "plan re-announced before completion, discarding partial plan"
                    );
                }
                self.buffer.clear();
                self.header_time = time;
                self.state = AssemblerState::Accumulating;
                None
            }
            (AssemblerState::Accumulating, LineKind::PlanEnd) => {
                self.state = AssemblerState::Idle;
                Some(self.flush())
            }
            (AssemblerState::Accumulating, LineKind::Body) => {
                self.buffer.push(line.to_string());
                None
            }
            _ => None,
        }
    }

    /// Close the input. An open block is kept or dropped per `policy`.
    pub fn finish(&mut self, policy: TrailingPlan) -> Option<CompletedPlan> {
        if self.state != AssemblerState::Accumulating {
            return None;
        }
        self.state = AssemblerState::Idle;
        match policy {
            TrailingPlan::Keep => Some(self.flush()),
            TrailingPlan::Discard => {
                if !self.buffer.is_empty() {
                    debug!(
                        dropped_lines = self.buffer.len(),
                        "output ended inside a plan block, discarding it"
                    );
                }
                self.buffer.clear();
                self.header_time = None;
                None
            }
        }
    }

    fn flush(&mut self) -> CompletedPlan {
        let plan = CompletedPlan {
            sequence: self.next_sequence,
            time: self.header_time.take(),
            lines: std::mem::take(&mut self.buffer),
        };
        self.next_sequence += 1;
        plan
    }
}
