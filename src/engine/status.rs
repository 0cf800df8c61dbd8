//! Status reporting for program runs.
//!
//! The engine emits one [`StatusEvent`] after every state or log change; a
//! [`StatusBus`] fans them out to any number of [`StatusSink`]s from a
//! background listener task. Emission is best-effort: a dropped receiver
//! never aborts a run.

use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::{sync::oneshot, task};

use super::ExecutionState;

/// One observable change in a run: the execution state, the top-level command
/// cursor, and the log line that triggered the event (if any).
///
/// `cursor` indexes the currently executing top-level command; it is `None`
/// when idle or finished and is not meaningful inside nested repeats beyond
/// the enclosing top-level index. Pure state transitions carry no line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub state: ExecutionState,
    pub cursor: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Event for a new log line under the given state and cursor.
    pub fn line(
        state: ExecutionState,
        cursor: Option<usize>,
        line: impl Into<String>,
    ) -> Self {
        Self {
            state,
            cursor,
            line: Some(line.into()),
            timestamp: Utc::now(),
        }
    }

    /// Event for a state or cursor transition with no log line.
    pub fn transition(state: ExecutionState, cursor: Option<usize>) -> Self {
        Self {
            state,
            cursor,
            line: None,
            timestamp: Utc::now(),
        }
    }
}

/// Abstraction over an output target that consumes status events.
pub trait StatusSink: Send + Sync {
    fn handle(&mut self, event: &StatusEvent) -> IoResult<()>;
}

/// Stdout sink rendering one line per event.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl StatusSink for StdOutSink {
    fn handle(&mut self, event: &StatusEvent) -> IoResult<()> {
        let cursor = event
            .cursor
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &event.line {
            Some(line) => writeln!(self.handle, "[{} #{cursor}] {line}", event.state)?,
            None => writeln!(self.handle, "[{} #{cursor}]", event.state)?,
        }
        self.handle.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<StatusEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StatusEvent> {
        self.entries.lock().unwrap().clone()
    }

    /// Just the log lines, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.line.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl StatusSink for MemorySink {
    fn handle(&mut self, event: &StatusEvent) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Channel sink forwarding events to an async consumer (progress bars, SSE).
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelSink {
    fn handle(&mut self, event: &StatusEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "status receiver dropped"))
    }
}

/// Receives status events from the engine and broadcasts them to sinks.
pub struct StatusBus {
    sinks: Arc<Mutex<Vec<Box<dyn StatusSink>>>>,
    channel: (flume::Sender<StatusEvent>, flume::Receiver<StatusEvent>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl StatusBus {
    /// Bus with a single sink.
    pub fn with_sink<S>(sink: S) -> Self
    where
        S: StatusSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Bus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn StatusSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink (e.g. a per-request stream).
    pub fn add_sink<S: StatusSink + 'static>(&self, sink: S) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side for the engine to emit into.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<StatusEvent> {
        self.channel.0.clone()
    }

    /// Spawn the background broadcast task. Idempotent.
    pub fn listen(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Drain whatever was queued before the shutdown so
                        // stop() never loses already-sent events.
                        while let Ok(event) = receiver.try_recv() {
                            broadcast(&sinks, &event);
                        }
                        break;
                    }
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => broadcast(&sinks, &event),
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the broadcast task, draining nothing further.
    pub async fn stop(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for StatusBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

fn broadcast(sinks: &Arc<Mutex<Vec<Box<dyn StatusSink>>>>, event: &StatusEvent) {
    let mut sinks = sinks.lock().unwrap();
    for sink in sinks.iter_mut() {
        if let Err(error) = sink.handle(event) {
            tracing::warn!(%error, "status sink failed");
        }
    }
}
