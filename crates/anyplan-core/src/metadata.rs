//! Solve metadata scraped from captured planner output.

use crate::config::{Epsilon, OutputMarkers, PlannerConfig};
use crate::result::LogRecord;
use crate::scanner::parse_timing;

/// Search time reported by the planner, in seconds.
///
/// Records are visited in order and each one is read bottom-up, so the last
/// timing line of the first record that has one wins. `None` means unknown.
pub fn computation_time(logs: &[LogRecord], markers: &OutputMarkers) -> Option<f64> {
    logs.iter().find_map(|record| {
        record
            .message
            .lines()
            .rev()
            .find_map(|line| parse_timing(line, &markers.time_prefix))
    })
}

/// Numeric tolerance of the backend. Static configuration, never parsed.
pub fn engine_epsilon(config: &PlannerConfig) -> Option<Epsilon> {
    config.epsilon
}
