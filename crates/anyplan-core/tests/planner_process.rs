//! Planner runs against scripted fake planners.

use std::path::PathBuf;
use std::time::Duration;

use anyplan_core::{
    PlanResult, PlanStatus, Planner, PlannerConfig, PlannerError, PlannerRunner, RawPlan,
    RawPlanTranslator, SolveStatus, Termination, TimedPlan, TimedPlanTranslator,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

const TWO_PLANS: &str = r#"cat <<'EOF'
Initial heuristic = 3.000
;;;; Solution Found
; Time 0.01
0.000: (move r1 a b)  [1.000]
1.001: (move r1 b c)  [1.000]
2.002: (move r1 c d)  [1.000]

;;;; Solution Found
; Time 0.03
0.000: (jump r1 a d)  [2.000]
2.001: (rest r1)  [0.500]

EOF
"#;

const ONE_PLAN_THEN_HANG: &str = r#"cat <<'EOF'
; Time 0.01
0.000: (move r1 a b)  [1.000]
1.001: (move r1 b c)  [1.000]

EOF
exec sleep 30
"#;

/// The plan is printed by the wrapper shell; the sleeping child keeps both
/// pipes open after the shell itself is killed.
const ONE_PLAN_THEN_CHILD_HANGS: &str = r#"printf '; Time 0.1\n(a)\n(b)\n\n'
sleep 30
echo done
"#;

struct Workspace {
    dir: TempDir,
    domain: PathBuf,
    problem: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let domain = dir.path().join("domain.pddl");
        let problem = dir.path().join("problem.pddl");
        std::fs::write(&domain, "(define (domain robots))").expect("write domain");
        std::fs::write(&problem, "(define (problem p1) (:domain robots))").expect("write problem");
        Self {
            dir,
            domain,
            problem,
        }
    }

    /// A POPF-dialect config that runs `script` through `sh`.
    fn planner(&self, script: &str) -> PlannerConfig {
        let path = self.dir.path().join("planner.sh");
        std::fs::write(&path, script).expect("write script");
        PlannerConfig {
            name: "fake-popf".to_string(),
            binary: "sh".to_string(),
            args: vec![path.display().to_string()],
            timeout_secs: 20,
            ..PlannerConfig::popf()
        }
    }
}

// -------------------------------------------------------------------------
// One-shot runs
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_solve_returns_last_plan() {
    let ws = Workspace::new();
    let runner = PlannerRunner::new(ws.planner(TWO_PLANS), TimedPlanTranslator::permissive());

    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert_eq!(outcome.status, SolveStatus::Solved);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.termination, Termination::Exited);
    assert_eq!(outcome.engine_name, "fake-popf");
    assert_eq!(outcome.result.status, PlanStatus::Solved);
    assert_eq!(outcome.result.computation_time, Some(0.03));
    assert_eq!(outcome.intermediate_results, 0);

    let plan = outcome.plan().expect("plan");
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.actions[0].name, "jump");
}

#[tokio::test]
async fn test_solve_drops_anytime_flag() {
    let ws = Workspace::new();
    let script = r#"for arg in "$@"; do
  if [ "$arg" = "-n" ]; then
    echo "anytime flag passed to one-shot run" >&2
    exit 3
  fi
done
printf '; Time 0.2\n(a)\n(b)\n\n'
"#;
    let runner = PlannerRunner::new(ws.planner(script), RawPlanTranslator);
    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert!(!outcome.command.contains(" -n "));
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, SolveStatus::Solved);
}

#[tokio::test]
async fn test_solve_unsolvable_proven() {
    let ws = Workspace::new();
    let script = "echo 'Initial heuristic = 9.000'\necho ';; Problem unsolvable!'\n";
    let runner = PlannerRunner::new(ws.planner(script), RawPlanTranslator);
    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert_eq!(outcome.status, SolveStatus::UnsolvableProven);
    assert!(outcome.plan().is_none());
    assert!(outcome.result.computation_time.is_none());
}

#[tokio::test]
async fn test_solve_clean_exit_without_plan() {
    let ws = Workspace::new();
    let script = "echo 'Initial heuristic = 9.000'\necho 'Search exhausted'\n";
    let runner = PlannerRunner::new(ws.planner(script), RawPlanTranslator);
    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert_eq!(outcome.status, SolveStatus::UnsolvableIncomplete);
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test]
async fn test_solve_crash_is_internal_error() {
    let ws = Workspace::new();
    let script = "echo 'parse error in domain' >&2\nexit 1\n";
    let runner = PlannerRunner::new(ws.planner(script), RawPlanTranslator);
    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert_eq!(outcome.status, SolveStatus::InternalError);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome
        .result
        .logs
        .iter()
        .any(|log| log.message.contains("parse error")));
}

#[tokio::test]
async fn test_solve_single_action_raw_plan_is_solved() {
    let ws = Workspace::new();
    let script = "printf '; Time 0.1\\n0.000: (move a b)  [1.000]\\n\\n'\n";
    let runner = PlannerRunner::new(ws.planner(script), RawPlanTranslator);
    let outcome = runner.solve(&ws.domain, &ws.problem).await.expect("solve");

    assert_eq!(outcome.status, SolveStatus::Solved);
    let plan = outcome.plan().expect("plan");
    assert_eq!(plan.lines, vec!["0.000: (move a b)  [1.000]".to_string()]);
}

#[tokio::test]
async fn test_solve_timeout_stops_wrapper_children() {
    let ws = Workspace::new();
    let config = PlannerConfig {
        timeout_secs: 1,
        ..ws.planner(ONE_PLAN_THEN_CHILD_HANGS)
    };
    let runner = PlannerRunner::new(config, RawPlanTranslator);

    let started = std::time::Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        runner.solve(&ws.domain, &ws.problem),
    )
    .await
    .expect("solve must return soon after its timeout")
    .expect("solve");

    assert!(started.elapsed() < Duration::from_secs(8));
    assert_eq!(outcome.termination, Termination::TimedOut);
    assert_eq!(outcome.exit_code, -1);
    assert_eq!(outcome.status, SolveStatus::Solved);
    assert_eq!(outcome.plan().map(|p| p.len()), Some(2));
}

#[tokio::test]
async fn test_solve_untranslatable_plan_is_an_error() {
    let ws = Workspace::new();
    let script = "printf '; Time 0.2\\n(teleport r1 mars)\\n(rest r1)\\n\\n'\n";
    let translator = TimedPlanTranslator::new(|s: &str| (s != "mars").then(|| s.to_string()));
    let runner = PlannerRunner::new(ws.planner(script), translator);

    let err = runner.solve(&ws.domain, &ws.problem).await.unwrap_err();
    assert!(matches!(err, PlannerError::Translate(_)));
    assert!(err.to_string().contains("mars"));
}

#[tokio::test]
async fn test_missing_binary_is_spawn_error() {
    let ws = Workspace::new();
    let config = PlannerConfig {
        binary: ws.dir.path().join("no-such-planner").display().to_string(),
        ..PlannerConfig::popf()
    };
    let runner = PlannerRunner::new(config, RawPlanTranslator);
    let err = runner.solve(&ws.domain, &ws.problem).await.unwrap_err();
    assert!(matches!(err, PlannerError::Spawn { .. }));
}

// -------------------------------------------------------------------------
// Anytime runs
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_anytime_streams_intermediate_then_final() {
    let ws = Workspace::new();
    let runner = PlannerRunner::new(ws.planner(TWO_PLANS), TimedPlanTranslator::permissive());
    let (tx, mut rx) = mpsc::unbounded_channel::<PlanResult<TimedPlan>>();

    let outcome = runner
        .solve_anytime(&ws.domain, &ws.problem, tx)
        .await
        .expect("solve_anytime");

    let mut received = Vec::new();
    while let Some(result) = rx.recv().await {
        received.push(result);
    }

    let statuses: Vec<_> = received.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            PlanStatus::Intermediate,
            PlanStatus::Intermediate,
            PlanStatus::Solved
        ]
    );
    let sizes: Vec<_> = received
        .iter()
        .map(|r| r.plan.as_ref().map(|p| p.len()))
        .collect();
    assert_eq!(sizes, vec![Some(3), Some(2), Some(2)]);
    assert_eq!(received[0].sequence, Some(1));
    assert_eq!(received[1].sequence, Some(2));

    assert_eq!(outcome.intermediate_results, 2);
    assert!(outcome.command.contains(" -n "));
    assert_eq!(outcome.status, SolveStatus::Solved);
    assert!(outcome.translation_failures.is_empty());
}

#[tokio::test]
async fn test_anytime_timeout_keeps_last_plan() {
    let ws = Workspace::new();
    let config = PlannerConfig {
        timeout_secs: 1,
        ..ws.planner(ONE_PLAN_THEN_HANG)
    };
    let runner = PlannerRunner::new(config, RawPlanTranslator);
    let (tx, mut rx) = mpsc::unbounded_channel::<PlanResult<RawPlan>>();

    let outcome = tokio::time::timeout(
        Duration::from_secs(15),
        runner.solve_anytime(&ws.domain, &ws.problem, tx),
    )
    .await
    .expect("runner must stop the planner")
    .expect("solve_anytime");

    let mut received = Vec::new();
    while let Some(result) = rx.recv().await {
        received.push(result);
    }

    assert_eq!(outcome.termination, Termination::TimedOut);
    assert_eq!(outcome.exit_code, -1);
    assert_eq!(outcome.intermediate_results, 1);
    assert_eq!(outcome.status, SolveStatus::Solved);
    assert_eq!(received.len(), 2);
    assert!(received[1].is_final());
}

#[tokio::test]
async fn test_anytime_cancel_after_first_plan() {
    let ws = Workspace::new();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let runner = PlannerRunner::new(ws.planner(ONE_PLAN_THEN_HANG), RawPlanTranslator)
        .with_cancel(cancel_rx);
    let (tx, mut rx) = mpsc::unbounded_channel::<PlanResult<RawPlan>>();

    let run = runner.solve_anytime(&ws.domain, &ws.problem, tx);
    let watcher = async {
        let first = rx.recv().await;
        cancel_tx.send(true).expect("cancel");
        first
    };

    let (outcome, first) = tokio::time::timeout(Duration::from_secs(15), async {
        tokio::join!(run, watcher)
    })
    .await
    .expect("cancellation must not deadlock");

    let outcome = outcome.expect("solve_anytime");
    let first = first.expect("first intermediate");
    assert_eq!(first.status, PlanStatus::Intermediate);
    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.status, SolveStatus::Solved);

    let last = rx.recv().await.expect("final result");
    assert!(last.is_final());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_anytime_cancel_stops_wrapper_children() {
    let ws = Workspace::new();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let runner = PlannerRunner::new(ws.planner(ONE_PLAN_THEN_CHILD_HANGS), RawPlanTranslator)
        .with_cancel(cancel_rx);
    let (tx, mut rx) = mpsc::unbounded_channel::<PlanResult<RawPlan>>();

    let run = runner.solve_anytime(&ws.domain, &ws.problem, tx);
    let watcher = async {
        let first = rx.recv().await;
        cancel_tx.send(true).expect("cancel");
        first
    };

    let (outcome, first) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(run, watcher)
    })
    .await
    .expect("cancelled run must not wait for the sleeping child");

    let outcome = outcome.expect("solve_anytime");
    assert!(first.is_some());
    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.status, SolveStatus::Solved);
    assert_eq!(outcome.intermediate_results, 1);
}
