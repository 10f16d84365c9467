//! Terminal solve-status classification.

use crate::config::OutputMarkers;
use crate::result::{LogRecord, SolveStatus};
use crate::scanner::{OutputScanner, ScanMode};

/// Decide the terminal status of a run.
///
/// First match wins:
/// 1. any captured line proves unsolvability: `UnsolvableProven`
/// 2. the rendered plan has more than one line: `Solved`
/// 3. exit code 0: `UnsolvableIncomplete`
/// 4. otherwise: `InternalError`
///
/// Total over its inputs; never fails.
pub fn classify_status(
    plan: Option<&str>,
    exit_code: i32,
    logs: &[LogRecord],
    markers: &OutputMarkers,
) -> SolveStatus {
    if proves_unsolvable(logs, markers) {
        return SolveStatus::UnsolvableProven;
    }
    if has_plan(plan) {
        return SolveStatus::Solved;
    }
    if exit_code == 0 {
        SolveStatus::UnsolvableIncomplete
    } else {
        SolveStatus::InternalError
    }
}

/// A single-line value is a buffering artifact, not a plan.
pub fn has_plan(plan: Option<&str>) -> bool {
    plan.map(|text| text.trim().split('\n').count() > 1)
        .unwrap_or(false)
}

/// Whether any line of any record carries the unsolvability marker.
pub fn proves_unsolvable(logs: &[LogRecord], markers: &OutputMarkers) -> bool {
    let scanner = OutputScanner::new(markers, ScanMode::Batch);
    logs.iter()
        .flat_map(|record| record.message.lines())
        .any(|line| scanner.is_unsolvable(line))
}
