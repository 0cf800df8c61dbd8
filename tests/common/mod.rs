#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use blockdrive::actuator::{ActuationClient, CommandTransport, Direction, TransportError};
use blockdrive::blocks::{BlockGraph, BlockKind, BlockNode};
use blockdrive::link::LinkState;

/// Transport double that records every direction it is asked to send.
///
/// Optionally fails every attempt, and can cancel a token once a given number
/// of sends has been observed (to signal cancellation mid-run).
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<Direction>>>,
    fail_all: Arc<AtomicBool>,
    cancel_at: Arc<Mutex<Option<CancelAt>>>,
}

struct CancelAt {
    direction: Direction,
    remaining: usize,
    token: CancellationToken,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every attempt fail at the transport level.
    pub fn failing() -> Self {
        let t = Self::default();
        t.fail_all.store(true, Ordering::Relaxed);
        t
    }

    /// Cancel `token` when the n-th send of `direction` is observed.
    pub fn cancel_on_nth(&self, direction: Direction, n: usize, token: CancellationToken) {
        *self.cancel_at.lock().unwrap() = Some(CancelAt {
            direction,
            remaining: n,
            token,
        });
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<Direction> {
        self.sent.lock().unwrap().clone()
    }

    /// How many times the given direction was sent.
    pub fn count_of(&self, direction: Direction) -> usize {
        self.sent().iter().filter(|d| **d == direction).count()
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn send(&self, direction: Direction) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(direction);

        let mut guard = self.cancel_at.lock().unwrap();
        if let Some(cancel) = guard.as_mut() {
            if cancel.direction == direction {
                cancel.remaining -= 1;
                if cancel.remaining == 0 {
                    cancel.token.cancel();
                    *guard = None;
                }
            }
        }
        drop(guard);

        if self.fail_all.load(Ordering::Relaxed) {
            return Err(TransportError::other("injected failure"));
        }
        Ok(())
    }
}

/// Client over a recording transport with the given reachability.
pub fn recording_client(
    transport: RecordingTransport,
    reachable: bool,
) -> ActuationClient<RecordingTransport> {
    ActuationClient::new(transport, LinkState::with_reachable(reachable))
}

/// Graph with a single Start anchor chaining the given pre-inserted first id.
pub fn anchored(graph: &mut BlockGraph, first: &str) {
    graph.insert("start", BlockNode::new(BlockKind::Start).with_next(first));
    graph.push_top("start");
}
