//! Line classification for planner output.

use crate::config::OutputMarkers;

/// Which extraction path a line is being classified for.
///
/// The two paths close plan blocks differently: the streaming path on any
/// empty line, the batch path on an exact match of the configured end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Batch,
    Streaming,
}

/// Classification of a single output line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind {
    /// A plan announcement. Carries the search time when the header has one.
    PlanStart { time: Option<f64> },
    /// Closes the plan block in progress.
    PlanEnd,
    /// Proof that the problem has no solution.
    Unsolvable,
    /// A timing line that does not open a plan.
    Timing(f64),
    /// Candidate plan-body text.
    Body,
    /// Nothing of interest.
    Other,
}

/// Stateless classifier over a fixed set of markers.
#[derive(Debug, Clone, Copy)]
pub struct OutputScanner<'a> {
    markers: &'a OutputMarkers,
    mode: ScanMode,
}

impl<'a> OutputScanner<'a> {
    pub fn new(markers: &'a OutputMarkers, mode: ScanMode) -> Self {
        Self { markers, mode }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn markers(&self) -> &'a OutputMarkers {
        self.markers
    }

    /// Classify one line. First match wins: start, unsolvable, end, timing,
    /// body, other.
    pub fn classify(&self, line: &str) -> LineKind {
        if line.contains(self.markers.plan_start.as_str()) {
            return LineKind::PlanStart {
                time: self.timing(line),
            };
        }
        if self.is_unsolvable(line) {
            return LineKind::Unsolvable;
        }
        if self.is_plan_end(line) {
            return LineKind::PlanEnd;
        }
        if let Some(time) = self.timing(line) {
            return LineKind::Timing(time);
        }
        // Whitespace-only lines are never plan content in either mode.
        if line.trim().is_empty() {
            LineKind::Other
        } else {
            LineKind::Body
        }
    }

    /// Whether the line proves unsolvability.
    pub fn is_unsolvable(&self, line: &str) -> bool {
        !self.markers.unsolvable.is_empty()
            && line.trim().starts_with(self.markers.unsolvable.as_str())
    }

    fn is_plan_end(&self, line: &str) -> bool {
        match self.mode {
            ScanMode::Streaming => line.is_empty(),
            ScanMode::Batch => line == self.markers.plan_end,
        }
    }

    /// Search time carried by a timing line, if any.
    pub fn timing(&self, line: &str) -> Option<f64> {
        parse_timing(line, &self.markers.time_prefix)
    }
}

/// Third whitespace token of a line starting with `prefix`, as seconds.
pub(crate) fn parse_timing(line: &str, prefix: &str) -> Option<f64> {
    if prefix.is_empty() || !line.starts_with(prefix) {
        return None;
    }
    line.split_whitespace().nth(2)?.parse::<f64>().ok()
}
