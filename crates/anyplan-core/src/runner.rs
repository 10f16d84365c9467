//! Planner process execution.
//!
//! [`PlannerRunner`] launches the external planner, drains both output pipes
//! concurrently, enforces the wall-clock limit and turns whatever the process
//! printed into a [`PlannerOutcome`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch::extract_plan;
use crate::command::PlannerCommand;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::metadata::computation_time;
use crate::result::{LogRecord, PlanResult, PlannerOutcome, SolveStatus, Termination};
use crate::status::classify_status;
use crate::stream::{read_lines, ResultSink, StreamExtractor};
use crate::translate::PlanTranslator;

/// How long output pipes may stay open once the planner itself is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A planner backend.
#[async_trait]
pub trait Planner: Send + Sync {
    type Plan: Clone + Send + Sync + 'static;

    /// Run once and return the final result.
    async fn solve(&self, domain: &Path, problem: &Path) -> Result<PlannerOutcome<Self::Plan>>;

    /// Run in anytime mode, delivering each improved plan to `sink` while the
    /// process runs. The final result is appended to the sink as well.
    async fn solve_anytime<S>(
        &self,
        domain: &Path,
        problem: &Path,
        sink: S,
    ) -> Result<PlannerOutcome<Self::Plan>>
    where
        S: ResultSink<Self::Plan> + 'static;
}

/// Process-backed planner.
pub struct PlannerRunner<T> {
    config: Arc<PlannerConfig>,
    translator: Arc<T>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<T: PlanTranslator + 'static> PlannerRunner<T> {
    pub fn new(config: PlannerConfig, translator: T) -> Self {
        Self {
            config: Arc::new(config),
            translator: Arc::new(translator),
            cancel: None,
        }
    }

    /// Kill the planner as soon as `cancel` turns `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn spawn(&self, command: &PlannerCommand) -> Result<Child> {
        command
            .to_command(&self.config.name)?
            .spawn()
            .map_err(|source| PlannerError::Spawn {
                engine: self.config.name.clone(),
                source,
            })
    }

    fn pipe_unavailable(&self, stream: &'static str) -> PlannerError {
        PlannerError::PipeUnavailable {
            engine: self.config.name.clone(),
            stream,
        }
    }

    /// Wait for the child, killing its process group on timeout or cancellation.
    async fn wait(&self, child: &mut Child) -> Result<(i32, Termination)> {
        let limit = self.config.timeout_secs;
        let mut cancel = self.cancel.clone();

        let waited = tokio::select! {
            status = child.wait() => Ok(status?),
            _ = sleep_or_forever(limit) => Err(Termination::TimedOut),
            _ = cancelled(cancel.as_mut()) => Err(Termination::Cancelled),
        };

        match waited {
            Ok(status) => Ok((status.code().unwrap_or(-1), Termination::Exited)),
            Err(termination) => {
                warn!(
                    engine = %self.config.name,
                    ?termination,
                    timeout_secs = limit,
                    "stopping planner"
                );
                kill_process_group(child);
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "planner already exited");
                }
                Ok((-1, termination))
            }
        }
    }

    /// Classify the captured output of a finished process.
    ///
    /// Also usable offline on output captured elsewhere.
    pub fn interpret(
        &self,
        stdout: Vec<String>,
        stderr: Vec<String>,
        exit_code: i32,
    ) -> Result<(SolveStatus, PlanResult<T::Plan>)> {
        let markers = &self.config.markers;
        let completed = extract_plan(
            stdout.iter().map(String::as_str),
            markers,
            self.config.batch_trailing,
        );
        let translated = completed
            .as_ref()
            .map(|plan| self.translator.translate(&plan.text()))
            .transpose()?;

        let logs = vec![
            LogRecord::stdout(stdout.join("\n")),
            LogRecord::stderr(stderr.join("\n")),
        ];
        let rendered = translated.as_ref().map(ToString::to_string);
        let status = classify_status(rendered.as_deref(), exit_code, &logs, markers);

        let result = PlanResult {
            status: status.into(),
            plan: translated.filter(|_| status == SolveStatus::Solved),
            engine_name: self.config.name.clone(),
            sequence: completed.map(|plan| plan.sequence),
            computation_time: computation_time(&logs, markers),
            logs,
        };
        Ok((status, result))
    }
}

#[async_trait]
impl<T: PlanTranslator + 'static> Planner for PlannerRunner<T> {
    type Plan = T::Plan;

    async fn solve(&self, domain: &Path, problem: &Path) -> Result<PlannerOutcome<Self::Plan>> {
        let command = PlannerCommand::one_shot(&self.config, domain, problem, None);
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(engine = %self.config.name, %run_id, command = %command, "starting planner");
        let mut child = self.spawn(&command)?;
        let stdout = child.stdout.take().ok_or_else(|| self.pipe_unavailable("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| self.pipe_unavailable("stderr"))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let stdout_task = tokio::spawn(read_lines(stdout, Some(stop_rx.clone())));
        let stderr_task = tokio::spawn(read_lines(stderr, Some(stop_rx)));

        let (exit_code, termination) = self.wait(&mut child).await?;
        let grace = close_after(stop_tx, DRAIN_GRACE);
        let stdout_lines = stdout_task.await??;
        let stderr_lines = stderr_task.await??;
        grace.abort();

        let (status, result) = self.interpret(stdout_lines, stderr_lines, exit_code)?;
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(engine = %self.config.name, %run_id, %status, exit_code, duration_ms, "planner finished");

        Ok(PlannerOutcome {
            run_id,
            engine_name: self.config.name.clone(),
            command: command.to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            exit_code,
            termination,
            status,
            result,
            intermediate_results: 0,
            translation_failures: Vec::new(),
        })
    }

    async fn solve_anytime<S>(
        &self,
        domain: &Path,
        problem: &Path,
        sink: S,
    ) -> Result<PlannerOutcome<Self::Plan>>
    where
        S: ResultSink<Self::Plan> + 'static,
    {
        let command = PlannerCommand::anytime(&self.config, domain, problem, None);
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(engine = %self.config.name, %run_id, command = %command, "starting anytime planner");
        let mut child = self.spawn(&command)?;
        let stdout = child.stdout.take().ok_or_else(|| self.pipe_unavailable("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| self.pipe_unavailable("stderr"))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let extractor = StreamExtractor::new(self.config.clone(), self.translator.clone(), sink)
            .with_stop(stop_rx.clone());
        let stdout_task = extractor.spawn(stdout);
        let stderr_task = tokio::spawn(read_lines(stderr, Some(stop_rx)));

        let (exit_code, termination) = self.wait(&mut child).await?;
        let grace = close_after(stop_tx, DRAIN_GRACE);
        let streamed = stdout_task.await??;
        let stderr_lines = stderr_task.await??;
        grace.abort();

        let mut sink = streamed.sink;
        let (status, result) = self.interpret(streamed.lines, stderr_lines, exit_code)?;
        sink.submit(result.clone());

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            engine = %self.config.name,
            %run_id,
            %status,
            exit_code,
            intermediate = streamed.emitted,
            duration_ms,
            "anytime planner finished"
        );

        Ok(PlannerOutcome {
            run_id,
            engine_name: self.config.name.clone(),
            command: command.to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            exit_code,
            termination,
            status,
            result,
            intermediate_results: streamed.emitted,
            translation_failures: streamed.failures.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Flip `stop` once `grace` has passed.
fn close_after(stop: watch::Sender<bool>, grace: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        stop.send(true).ok();
    })
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "planner process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

async fn sleep_or_forever(secs: u64) {
    if secs == 0 {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Resolves once the flag is `true`. A dropped sender never cancels.
async fn cancelled(cancel: Option<&mut watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            if rx.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
