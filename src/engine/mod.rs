//! Program execution engine.
//!
//! The engine interprets a compiled [`Program`] against the car endpoint:
//! one leaf actuation in flight at a time, forced safety stops at both ends
//! of a run, cooperative cancellation sampled before every leaf (including
//! inside nested repeats), and a status event after every state or log
//! change. No actuation attempt or outcome is hidden from the sink.
//!
//! State machine: `Idle -> Running -> Completed`. Reverting `Completed` back
//! to `Idle` (e.g. after a display delay) is caller policy, not the engine's.

pub mod status;

pub use status::{ChannelSink, MemorySink, StatusBus, StatusEvent, StatusSink, StdOutSink};

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::actuator::{
    ActuationClient, ActuationError, CommandTransport, Direction, SAFETY_STOP_RETRIES,
};
use crate::arbitration::{EndpointBusy, EndpointOwner};
use crate::program::{Command, Program};

/// Lifecycle of one program run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Running,
    Completed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Idle => write!(f, "idle"),
            ExecutionState::Running => write!(f, "running"),
            ExecutionState::Completed => write!(f, "completed"),
        }
    }
}

/// Failures that prevent a run from starting.
///
/// Once a run has started, nothing aborts it: actuation failures are logged
/// and execution proceeds to the next command.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// The program has no commands; compile a graph with a Start anchor
    /// first.
    #[error("program is empty, nothing to run")]
    #[diagnostic(
        code(blockdrive::engine::empty_program),
        help("compile() returned an empty program; check for a Start block.")
    )]
    EmptyProgram,

    /// Another sender (the manual control path) currently owns the endpoint.
    #[error(transparent)]
    #[diagnostic(transparent)]
    EndpointBusy(#[from] EndpointBusy),
}

/// Summary of a finished run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Whether cancellation cut the walk short.
    pub cancelled: bool,
    /// Leaf actuations attempted (including fast-failed disconnected ones).
    pub leaf_attempts: usize,
    /// The run's append-only trace log.
    pub log: Vec<String>,
}

enum Flow {
    Continue,
    Cancelled,
}

/// Sequential interpreter for compiled programs.
///
/// Generic over the transport so tests can substitute recording doubles;
/// production uses [`crate::actuator::HttpTransport`].
pub struct Engine<T> {
    client: ActuationClient<T>,
    owner: EndpointOwner,
    status: flume::Sender<StatusEvent>,
}

impl<T: CommandTransport> Engine<T> {
    pub fn new(
        client: ActuationClient<T>,
        owner: EndpointOwner,
        status: flume::Sender<StatusEvent>,
    ) -> Self {
        Self {
            client,
            owner,
            status,
        }
    }

    /// The actuation client this engine drives.
    #[must_use]
    pub fn client(&self) -> &ActuationClient<T> {
        &self.client
    }

    /// Run a program to completion or cancellation.
    ///
    /// Resolves when `Completed` is reached. Cancellation is sampled before
    /// every leaf command, including inside nested repeats, so a program is
    /// stoppable within one leaf's worth of latency regardless of nesting
    /// depth. It cannot preempt an in-flight request or an active hold
    /// sleep.
    pub async fn run(
        &self,
        program: &Program,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        if program.is_empty() {
            return Err(EngineError::EmptyProgram);
        }
        let _permit = self.owner.try_acquire("program")?;

        let mut trace = RunTrace::new(&self.status);
        trace.transition(ExecutionState::Running, None);

        // Force a known safe state before moving. Non-fatal if it fails.
        if self.client.link().is_reachable() {
            if let Err(error) = self.client.request(Direction::Stop, SAFETY_STOP_RETRIES).await {
                tracing::debug!(%error, "leading safety stop failed");
            }
        }

        let mut cancelled = false;
        for (index, command) in program.iter().enumerate() {
            if cancel.is_cancelled() {
                trace.line("Program stopped by user");
                cancelled = true;
                break;
            }
            trace.transition(ExecutionState::Running, Some(index));
            if let Flow::Cancelled = self.exec_command(command, &cancel, &mut trace).await {
                trace.line("Program stopped by user");
                cancelled = true;
                break;
            }
        }

        if self.client.link().is_reachable() {
            if let Err(error) = self.client.request(Direction::Stop, SAFETY_STOP_RETRIES).await {
                tracing::debug!(%error, "trailing safety stop failed");
            }
            trace.line("Car stopped - program complete");
        }
        // Final transition is atomic with the trailing stop above: the sink
        // never observes Completed with the car still commanded to move.
        trace.transition(ExecutionState::Completed, None);

        Ok(RunReport {
            cancelled,
            leaf_attempts: trace.leaf_attempts,
            log: trace.log,
        })
    }

    async fn exec_command(
        &self,
        command: &Command,
        cancel: &CancellationToken,
        trace: &mut RunTrace<'_>,
    ) -> Flow {
        match command {
            Command::Repeat { count, body } => {
                trace.line(command.to_string());
                for iteration in 0..*count {
                    trace.line(format!("Loop iteration {}/{count}", iteration + 1));
                    for sub in body {
                        if cancel.is_cancelled() {
                            return Flow::Cancelled;
                        }
                        if let Flow::Cancelled =
                            Box::pin(self.exec_command(sub, cancel, trace)).await
                        {
                            return Flow::Cancelled;
                        }
                    }
                }
                Flow::Continue
            }
            leaf => {
                if cancel.is_cancelled() {
                    return Flow::Cancelled;
                }
                trace.line(leaf.to_string());
                trace.leaf_attempts += 1;
                // `leaf` is a non-container variant here, so direction() is
                // always Some.
                let action = leaf.direction().map(|d| d.as_token()).unwrap_or("?");
                match self.client.perform(leaf).await {
                    Ok(()) => {}
                    Err(ActuationError::Disconnected) => {
                        trace.line(format!("Car not connected - cannot execute: {action}"));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "leaf actuation failed");
                        trace.line(format!("Failed to execute: {action}"));
                    }
                }
                Flow::Continue
            }
        }
    }
}

/// Per-run mutable trace: current state, cursor, append-only log, and the
/// sender events go out on. Emission is best-effort.
struct RunTrace<'a> {
    state: ExecutionState,
    cursor: Option<usize>,
    log: Vec<String>,
    leaf_attempts: usize,
    status: &'a flume::Sender<StatusEvent>,
}

impl<'a> RunTrace<'a> {
    fn new(status: &'a flume::Sender<StatusEvent>) -> Self {
        Self {
            state: ExecutionState::Idle,
            cursor: None,
            log: Vec::new(),
            leaf_attempts: 0,
            status,
        }
    }

    fn transition(&mut self, state: ExecutionState, cursor: Option<usize>) {
        self.state = state;
        self.cursor = cursor;
        self.send(StatusEvent::transition(state, cursor));
    }

    fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.log.push(line.clone());
        self.send(StatusEvent::line(self.state, self.cursor, line));
    }

    fn send(&self, event: StatusEvent) {
        if self.status.send(event).is_err() {
            tracing::trace!("status receiver dropped; event discarded");
        }
    }
}
