//! Batch extraction over the captured output of a finished planner.

use crate::assembler::{CompletedPlan, PlanAssembler};
use crate::config::{OutputMarkers, TrailingPlan};
use crate::scanner::{OutputScanner, ScanMode};

/// Run the assembler once over complete output and return the final plan.
///
/// The last observed plan wins: a closed plan is replaced by any later
/// announcement, and with [`TrailingPlan::Keep`] a block still open at the
/// end of the output is the result even without an end marker.
pub fn extract_plan<'a, I>(
    lines: I,
    markers: &OutputMarkers,
    trailing: TrailingPlan,
) -> Option<CompletedPlan>
where
    I: IntoIterator<Item = &'a str>,
{
    let scanner = OutputScanner::new(markers, ScanMode::Batch);
    let mut assembler = PlanAssembler::new();
    let mut latest = None;

    for line in lines {
        if let Some(plan) = assembler.feed(scanner.classify(line), line) {
            latest = Some(plan);
        }
    }

    assembler.finish(trailing).or(latest)
}

/// Plan text extracted from a whole output blob; empty when there is none.
pub fn extract_plan_text(output: &str, markers: &OutputMarkers, trailing: TrailingPlan) -> String {
    extract_plan(output.lines(), markers, trailing)
        .map(|plan| plan.text())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn popf() -> OutputMarkers {
        OutputMarkers::default()
    }

    #[test]
    fn test_single_plan_with_end_marker() {
        let lines = ["; Time 0.5", "(move a b)", "(move b c)", ""];
        let plan = extract_plan(lines, &popf(), TrailingPlan::Keep).expect("plan");
        assert_eq!(plan.text(), "(move a b)\n(move b c)");
        assert_eq!(plan.time, Some(0.5));
    }

    #[test]
    fn test_no_start_marker_gives_empty_text() {
        let output = "Initial heuristic = 4\nb (3.000 | 1.000)\n";
        assert_eq!(extract_plan_text(output, &popf(), TrailingPlan::Keep), "");
        assert!(extract_plan(output.lines(), &popf(), TrailingPlan::Keep).is_none());
    }

    #[test]
    fn test_trailing_block_kept_without_end_marker() {
        let output = "; Time 0.2\n(a)\n(b)";
        assert_eq!(
            extract_plan_text(output, &popf(), TrailingPlan::Keep),
            "(a)\n(b)"
        );
    }

    #[test]
    fn test_trailing_block_discarded_keeps_last_closed_plan() {
        let output = "; Time 0.1\n(a)\n\n; Time 0.2\n(a)\n(b)";
        assert_eq!(
            extract_plan_text(output, &popf(), TrailingPlan::Discard),
            "(a)"
        );
        assert_eq!(
            extract_plan_text(output, &popf(), TrailingPlan::Keep),
            "(a)\n(b)"
        );
    }

    #[test]
    fn test_later_closed_plan_replaces_earlier() {
        let output = "; Time 0.1\n(a)\n\n; Time 0.2\n(c)\n(d)\n\n;;;; Solution Found\n";
        let plan = extract_plan(output.lines(), &popf(), TrailingPlan::Keep).expect("plan");
        assert_eq!(plan.text(), "(c)\n(d)");
        assert_eq!(plan.sequence, 2);
    }

    #[test]
    fn test_double_start_keeps_second_block() {
        let output = "; Time 0.1\n(x)\n(y)\n; Time 0.4\n(z)\n\n";
        assert_eq!(extract_plan_text(output, &popf(), TrailingPlan::Keep), "(z)");
    }

    #[test]
    fn test_crlf_output() {
        let output = "; Time 0.5\r\n(a)\r\n(b)\r\n\r\n";
        assert_eq!(
            extract_plan_text(output, &popf(), TrailingPlan::Keep),
            "(a)\n(b)"
        );
    }

    #[test]
    fn test_custom_end_marker() {
        let markers = OutputMarkers {
            plan_start: "Found Plan:".to_string(),
            plan_end: ";; end of plan".to_string(),
            ..OutputMarkers::default()
        };
        let output = "Found Plan:\n(a)\n\n(b)\n;; end of plan\nStatistics follow\n";
        assert_eq!(
            extract_plan_text(output, &markers, TrailingPlan::Keep),
            "(a)\n(b)"
        );
    }
}
