//! Typed results of a planner run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal classification of a planner run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// A plan was produced.
    Solved,
    /// The planner proved that no plan exists.
    UnsolvableProven,
    /// The planner exited cleanly without a plan or a proof.
    UnsolvableIncomplete,
    /// The planner failed.
    InternalError,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Solved => "SOLVED",
            SolveStatus::UnsolvableProven => "UNSOLVABLE_PROVEN",
            SolveStatus::UnsolvableIncomplete => "UNSOLVABLE_INCOMPLETE",
            SolveStatus::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status carried by a [`PlanResult`]: intermediate, or one terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Intermediate,
    Solved,
    UnsolvableProven,
    UnsolvableIncomplete,
    InternalError,
}

impl PlanStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, PlanStatus::Intermediate)
    }

    pub fn solve_status(&self) -> Option<SolveStatus> {
        match self {
            PlanStatus::Intermediate => None,
            PlanStatus::Solved => Some(SolveStatus::Solved),
            PlanStatus::UnsolvableProven => Some(SolveStatus::UnsolvableProven),
            PlanStatus::UnsolvableIncomplete => Some(SolveStatus::UnsolvableIncomplete),
            PlanStatus::InternalError => Some(SolveStatus::InternalError),
        }
    }
}

impl From<SolveStatus> for PlanStatus {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Solved => PlanStatus::Solved,
            SolveStatus::UnsolvableProven => PlanStatus::UnsolvableProven,
            SolveStatus::UnsolvableIncomplete => PlanStatus::UnsolvableIncomplete,
            SolveStatus::InternalError => PlanStatus::InternalError,
        }
    }
}

/// Process stream a log record was captured from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Severity attached to captured output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<OutputStream> for LogLevel {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => LogLevel::Info,
            OutputStream::Stderr => LogLevel::Error,
        }
    }
}

/// Captured output of one stream, kept as an opaque multi-line blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub stream: OutputStream,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    /// A record at the stream's default level.
    pub fn new(stream: OutputStream, message: impl Into<String>) -> Self {
        Self {
            stream,
            level: stream.into(),
            message: message.into(),
        }
    }

    pub fn stdout(message: impl Into<String>) -> Self {
        Self::new(OutputStream::Stdout, message)
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self::new(OutputStream::Stderr, message)
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

/// A plan result, intermediate or final.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanResult<P> {
    pub status: PlanStatus,

    /// The plan, when the result carries one.
    pub plan: Option<P>,

    /// Engine that produced the result.
    pub engine_name: String,

    /// Assembler sequence number of the plan, if any.
    pub sequence: Option<u64>,

    /// Search time reported by the planner, in seconds.
    pub computation_time: Option<f64>,

    /// Captured output. Empty on intermediate results.
    #[serde(default)]
    pub logs: Vec<LogRecord>,
}

impl<P> PlanResult<P> {
    /// An intermediate result for a freshly completed plan.
    pub fn intermediate(
        engine_name: impl Into<String>,
        plan: P,
        sequence: u64,
        computation_time: Option<f64>,
    ) -> Self {
        Self {
            status: PlanStatus::Intermediate,
            plan: Some(plan),
            engine_name: engine_name.into(),
            sequence: Some(sequence),
            computation_time,
            logs: Vec::new(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}

/// How the planner process ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Exited,
    TimedOut,
    Cancelled,
}

/// Final record of one planner run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerOutcome<P> {
    pub run_id: Uuid,
    pub engine_name: String,

    /// Command line that was executed.
    pub command: String,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,

    /// Process exit code; -1 when the process was killed or signalled.
    pub exit_code: i32,
    pub termination: Termination,

    pub status: SolveStatus,
    pub result: PlanResult<P>,

    /// Intermediate results delivered to the sink (anytime runs only).
    pub intermediate_results: u64,

    /// Plans completed while streaming that could not be translated.
    #[serde(default)]
    pub translation_failures: Vec<String>,
}

impl<P> PlannerOutcome<P> {
    pub fn solved(&self) -> bool {
        self.status == SolveStatus::Solved
    }

    pub fn plan(&self) -> Option<&P> {
        self.result.plan.as_ref()
    }
}
