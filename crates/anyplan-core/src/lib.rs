//! anyplan - typed results from command-line automated planners
//!
//! Wraps an external planner process and interprets its textual output:
//! - Classifies output lines against per-dialect sentinels
//! - Assembles plan blocks, keeping only the latest announcement
//! - Streams intermediate plans from anytime runs into a result sink
//! - Classifies the terminal solve status and scrapes search time

pub mod assembler;
pub mod batch;
pub mod command;
pub mod config;
pub mod error;
pub mod metadata;
pub mod result;
pub mod runner;
pub mod scanner;
pub mod status;
pub mod stream;
pub mod telemetry;
pub mod translate;

// Re-export key types
pub use assembler::{AssemblerState, CompletedPlan, PlanAssembler};
pub use batch::{extract_plan, extract_plan_text};
pub use command::PlannerCommand;
pub use config::{Epsilon, OutputMarkers, PlannerConfig, TrailingPlan};
pub use error::{ConfigError, PlannerError, Result, TranslateError};
pub use metadata::{computation_time, engine_epsilon};
pub use result::{
    LogLevel, LogRecord, OutputStream, PlanResult, PlanStatus, PlannerOutcome, SolveStatus,
    Termination,
};
pub use runner::{Planner, PlannerRunner};
pub use scanner::{LineKind, OutputScanner, ScanMode};
pub use status::{classify_status, has_plan, proves_unsolvable};
pub use stream::{ResultSink, StreamExtractor, StreamOutcome};
pub use telemetry::{init_tracing, LogFormat};
pub use translate::{
    PlanTranslator, RawPlan, RawPlanTranslator, TimedAction, TimedPlan, TimedPlanTranslator,
};
