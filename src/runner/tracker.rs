//! Live run tracking
//!
//! Consumes one run's execution stream and keeps:
//! - per-line run status, keyed by the step lines mapped at run start
//! - an append-only log feed, reset at run start
//!
//! Once a run has ended (terminal record, cancellation or transport failure) step events
//! no longer touch line statuses.

use super::events::{EventEmitter, ExecutionEvent, StepState, TrackerEvent};
use super::stream::records;
use crate::error::Result;
use crate::script::map_step_lines;
use chrono::Local;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, watch};

/// Status painted on a step line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Pass,
    Fail,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// One entry of the log feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub text: String,
    /// Wall-clock `HH:MM:SS`
    pub time: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            time: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    /// Stream ended; `exit_code` is absent when no terminal record arrived
    Finished { exit_code: Option<i32> },
    Abandoned,
}

/// How a consumed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { exit_code: i32 },
    /// The stream closed without a terminal record
    Incomplete,
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { exit_code: 0 })
    }
}

pub struct ExecutionStreamTracker {
    step_lines: Vec<usize>,
    statuses: BTreeMap<usize, RunStatus>,
    log: Vec<LogEntry>,
    phase: RunPhase,
    emitter: EventEmitter,
}

impl Default for ExecutionStreamTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStreamTracker {
    pub fn new() -> Self {
        Self {
            step_lines: Vec::new(),
            statuses: BTreeMap::new(),
            log: Vec::new(),
            phase: RunPhase::Idle,
            emitter: EventEmitter::default(),
        }
    }

    /// Receive run-state changes as they happen
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.emitter.subscribe()
    }

    /// Begin a run of `script`. Clears the log and line statuses and snapshots the
    /// step-line table; later edits to the script do not remap this run.
    pub fn start_run(&mut self, script: &str, name: &str) {
        self.log.clear();
        self.clear_statuses();
        self.step_lines = map_step_lines(script);
        self.phase = RunPhase::Running;

        log::debug!("Run '{}' mapped {} step lines", name, self.step_lines.len());
        self.emitter.emit(TrackerEvent::RunStarted {
            name: name.to_string(),
        });
        self.push_log(LogLevel::Info, format!("Running {}...", name));
    }

    pub fn apply(&mut self, event: ExecutionEvent) {
        match self.phase {
            RunPhase::Running => self.apply_running(event),
            RunPhase::Finished { .. } => match event {
                ExecutionEvent::Log { message } => self.push_log(LogLevel::Info, message),
                ExecutionEvent::Error { message } => self.push_log(LogLevel::Error, message),
                other => log::debug!("Ignoring event after run end: {}", other),
            },
            RunPhase::Idle | RunPhase::Abandoned => {
                log::debug!("Ignoring event outside an active run: {}", event)
            }
        }
    }

    fn apply_running(&mut self, event: ExecutionEvent) {
        match &event {
            ExecutionEvent::StepProgress { ordinal, state, .. } => {
                if !event.is_placeholder() {
                    let level = match state {
                        StepState::Failed => LogLevel::Error,
                        _ => LogLevel::Info,
                    };
                    self.push_log(level, event.to_string());
                }

                let line = ordinal
                    .checked_sub(1)
                    .and_then(|i| self.step_lines.get(i))
                    .copied();
                match line {
                    Some(line) => self.set_status(line, state.run_status()),
                    None => log::debug!("Step {} has no mapped line", ordinal),
                }
            }
            ExecutionEvent::Done { exit_code } => {
                if *exit_code == 0 {
                    self.push_log(LogLevel::Success, "Run completed successfully");
                } else {
                    self.push_log(
                        LogLevel::Error,
                        format!("Run failed (exit code: {})", exit_code),
                    );
                }
                self.end(Some(*exit_code));
            }
            ExecutionEvent::Error { message } => self.push_log(LogLevel::Error, message.clone()),
            ExecutionEvent::Log { message } => self.push_log(LogLevel::Info, message.clone()),
        }
    }

    /// Caller-initiated cancellation. Line statuses are left as they are.
    pub fn abandon(&mut self) {
        if self.phase != RunPhase::Running {
            return;
        }
        self.phase = RunPhase::Abandoned;
        self.push_log(LogLevel::Info, "Run stopped by user");
        self.emitter.emit(TrackerEvent::RunEnded {
            exit_code: None,
            cancelled: true,
        });
    }

    /// The transport closed. A run still waiting for its terminal record ends without
    /// an exit code.
    pub fn end_of_stream(&mut self) {
        if self.phase == RunPhase::Running {
            log::warn!("Execution stream closed without an exit code");
            self.end(None);
        }
    }

    /// The operator changed the script; painted statuses no longer line up
    pub fn on_script_edited(&mut self) {
        if !self.statuses.is_empty() {
            self.clear_statuses();
        }
    }

    /// Drive the tracker from a chunk stream until it closes, fails or `cancel` flips to
    /// true. Cancellation drops the stream (aborting the transport) and is not an error.
    /// A run that already reported its exit code keeps that outcome when cancelled.
    pub async fn consume<S>(
        &mut self,
        stream: S,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome>
    where
        S: Stream<Item = Result<Vec<u8>>>,
    {
        let mut payloads = Box::pin(records(stream));
        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => {
                    if let RunPhase::Finished { .. } = self.phase {
                        log::debug!("Cancelled after the run finished");
                        return Ok(self.outcome());
                    }
                    self.abandon();
                    return Ok(RunOutcome::Cancelled);
                }
                next = payloads.next() => match next {
                    Some(Ok(payload)) => self.apply(ExecutionEvent::decode(&payload)),
                    Some(Err(e)) => {
                        self.push_log(LogLevel::Error, format!("Error: {}", e));
                        if self.phase == RunPhase::Running {
                            self.end(None);
                        }
                        return Err(e);
                    }
                    None => {
                        self.end_of_stream();
                        return Ok(self.outcome());
                    }
                },
            }
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        match self.phase {
            RunPhase::Finished {
                exit_code: Some(code),
            } => RunOutcome::Completed { exit_code: code },
            RunPhase::Abandoned => RunOutcome::Cancelled,
            _ => RunOutcome::Incomplete,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn statuses(&self) -> &BTreeMap<usize, RunStatus> {
        &self.statuses
    }

    pub fn status_of(&self, line: usize) -> Option<RunStatus> {
        self.statuses.get(&line).copied()
    }

    pub fn step_lines(&self) -> &[usize] {
        &self.step_lines
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    fn end(&mut self, exit_code: Option<i32>) {
        self.phase = RunPhase::Finished { exit_code };
        self.emitter.emit(TrackerEvent::RunEnded {
            exit_code,
            cancelled: false,
        });
    }

    fn set_status(&mut self, line: usize, status: RunStatus) {
        self.statuses.insert(line, status);
        self.emitter.emit(TrackerEvent::LineStatus { line, status });
    }

    fn clear_statuses(&mut self) {
        self.statuses.clear();
        self.emitter.emit(TrackerEvent::LineStatusesCleared);
    }

    fn push_log(&mut self, level: LogLevel, text: impl Into<String>) {
        let entry = LogEntry::new(level, text);
        self.emitter.emit(TrackerEvent::Log(entry.clone()));
        self.log.push(entry);
    }
}

/// Resolves once the flag is true; never resolves if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
