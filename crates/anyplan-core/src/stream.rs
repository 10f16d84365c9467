//! Streaming extraction over live planner output.
//!
//! A [`StreamExtractor`] owns the assembler for one run and is moved onto the
//! task draining the planner's stdout. Every plan closed by an empty line is
//! translated and handed to a [`ResultSink`] as an intermediate result, in
//! completion order, while the process keeps running.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assembler::{CompletedPlan, PlanAssembler};
use crate::config::PlannerConfig;
use crate::error::TranslateError;
use crate::result::PlanResult;
use crate::scanner::{OutputScanner, ScanMode};
use crate::translate::PlanTranslator;

/// Append-only consumer of plan results.
pub trait ResultSink<P>: Send {
    fn submit(&mut self, result: PlanResult<P>);
}

impl<P: Send> ResultSink<P> for Vec<PlanResult<P>> {
    fn submit(&mut self, result: PlanResult<P>) {
        self.push(result);
    }
}

/// Never blocks, so a slow consumer cannot stall the drain.
impl<P: Send> ResultSink<P> for mpsc::UnboundedSender<PlanResult<P>> {
    fn submit(&mut self, result: PlanResult<P>) {
        if self.send(result).is_err() {
            debug!("result receiver dropped, discarding plan result");
        }
    }
}

/// What the drain produced once the output closed.
#[derive(Debug)]
pub struct StreamOutcome<S> {
    /// Every stdout line, in arrival order.
    pub lines: Vec<String>,

    /// Intermediate results handed to the sink.
    pub emitted: u64,

    /// Completed plans the translator rejected.
    pub failures: Vec<TranslateError>,

    /// The sink, returned so the caller can append the final result.
    pub sink: S,
}

/// Incremental plan extraction for one run.
pub struct StreamExtractor<T: PlanTranslator, S> {
    config: Arc<PlannerConfig>,
    translator: Arc<T>,
    sink: S,
    assembler: PlanAssembler,
    lines: Vec<String>,
    emitted: u64,
    failures: Vec<TranslateError>,
    stop: Option<watch::Receiver<bool>>,
}

impl<T, S> StreamExtractor<T, S>
where
    T: PlanTranslator + 'static,
    S: ResultSink<T::Plan> + 'static,
{
    pub fn new(config: Arc<PlannerConfig>, translator: Arc<T>, sink: S) -> Self {
        Self {
            config,
            translator,
            sink,
            assembler: PlanAssembler::new(),
            lines: Vec::new(),
            emitted: 0,
            failures: Vec::new(),
            stop: None,
        }
    }

    /// Stop draining once `stop` turns `true` or its sender is dropped, even
    /// if the output is still open.
    pub fn with_stop(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Feed one line of output.
    pub fn push_line(&mut self, line: String) {
        let kind = OutputScanner::new(&self.config.markers, ScanMode::Streaming).classify(&line);
        if let Some(plan) = self.assembler.feed(kind, &line) {
            self.emit(plan);
        }
        self.lines.push(line);
    }

    /// Close the stream, applying the streaming trailing-block policy.
    pub fn finish(mut self) -> StreamOutcome<S> {
        if let Some(plan) = self.assembler.finish(self.config.stream_trailing) {
            self.emit(plan);
        }
        StreamOutcome {
            lines: self.lines,
            emitted: self.emitted,
            failures: self.failures,
            sink: self.sink,
        }
    }

    /// Read `reader` to EOF or until stopped, then finish.
    pub async fn drain<R>(mut self, reader: R) -> std::io::Result<StreamOutcome<S>>
    where
        R: AsyncRead + Unpin,
    {
        let mut stop = self.stop.take();
        let mut segments = BufReader::new(reader).split(b'\n');
        loop {
            tokio::select! {
                biased;
                segment = segments.next_segment() => match segment? {
                    Some(segment) => self.push_line(decode_line(&segment)),
                    None => break,
                },
                _ = stop_requested(stop.as_mut()) => {
                    warn!(
                        engine = %self.config.name,
                        "stdout still open after planner stopped, closing stream"
                    );
                    break;
                }
            }
        }
        Ok(self.finish())
    }

    /// Drain `reader` on a dedicated task.
    pub fn spawn<R>(self, reader: R) -> JoinHandle<std::io::Result<StreamOutcome<S>>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        T::Plan: Send,
    {
        tokio::spawn(self.drain(reader))
    }

    fn emit(&mut self, plan: CompletedPlan) {
        match self.translator.translate(&plan.text()) {
            Ok(translated) => {
                info!(
                    engine = %self.config.name,
                    sequence = plan.sequence,
                    lines = plan.len(),
                    "intermediate plan"
                );
                self.sink.submit(PlanResult::intermediate(
                    self.config.name.clone(),
                    translated,
                    plan.sequence,
                    plan.time,
                ));
                self.emitted += 1;
            }
            Err(err) => {
                warn!(
                    engine = %self.config.name,
                    sequence = plan.sequence,
                    error = %err,
                    "failed to translate intermediate plan"
                );
                self.failures.push(err);
            }
        }
    }
}

/// Read `reader` as lines, without interpreting them, until EOF or `stop`.
pub(crate) async fn read_lines<R>(
    reader: R,
    mut stop: Option<watch::Receiver<bool>>,
) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut lines = Vec::new();
    loop {
        tokio::select! {
            biased;
            segment = segments.next_segment() => match segment? {
                Some(segment) => lines.push(decode_line(&segment)),
                None => break,
            },
            _ = stop_requested(stop.as_mut()) => {
                debug!(lines = lines.len(), "output still open after planner stopped");
                break;
            }
        }
    }
    Ok(lines)
}

/// Resolves once the flag is `true` or the sender is gone.
async fn stop_requested(stop: Option<&mut watch::Receiver<bool>>) {
    match stop {
        Some(rx) => {
            rx.wait_for(|stop| *stop).await.ok();
        }
        None => std::future::pending::<()>().await,
    }
}

fn decode_line(segment: &[u8]) -> String {
    let segment = segment.strip_suffix(b"\r").unwrap_or(segment);
    String::from_utf8_lossy(segment).into_owned()
}
