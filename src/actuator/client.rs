//! Retrying actuation client.
//!
//! One [`ActuationClient`] wraps a [`CommandTransport`] and owns every piece
//! of per-command discipline: the reachability fast-fail, the pre-motion
//! settle stop, the bounded retry loop with per-attempt timeouts, the hold
//! sleep that emulates the motion's physical duration, and the guaranteed
//! cleanup stop that keeps the car from driving off on a failed request.
//!
//! Timeouts and retries are parameters of the client ([`RequestPolicy`]),
//! never ad hoc per call site.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::time::{sleep, timeout};

use super::transport::{CommandTransport, TransportError};
use super::Direction;
use crate::link::LinkState;
use crate::program::Command;

/// Retry budget for a leaf `Stop` command. Stops are the safety-relevant
/// request, so they get one extra attempt.
pub const STOP_LEAF_RETRIES: u32 = 2;

/// Retry budget for the best-effort safety stops the client and engine issue
/// around motions.
pub const SAFETY_STOP_RETRIES: u32 = 1;

/// Timing and retry parameters for requests to the car.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Extra attempts after the first for directional requests.
    pub retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Deceleration buffer between the pre-motion stop and the directional
    /// request, so motor states never overlap.
    pub settle_delay: Duration,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(4000),
            retries: 1,
            retry_delay: Duration::from_millis(150),
            settle_delay: Duration::from_millis(100),
        }
    }
}

/// Failure of one logical actuation.
///
/// These are recovered locally by callers: logged, cleanup still attempted,
/// execution proceeds. They never abort a program.
#[derive(Debug, Error, Diagnostic)]
pub enum ActuationError {
    /// The reachability flag is down; no network call was made.
    #[error("car not connected")]
    #[diagnostic(
        code(blockdrive::actuation::disconnected),
        help("The connectivity poller reports the car as unreachable. Check the Wi-Fi link.")
    )]
    Disconnected,

    /// Every attempt hit its per-attempt deadline.
    #[error("request '{direction}' timed out after {attempts} attempts")]
    #[diagnostic(code(blockdrive::actuation::timeout))]
    Timeout { direction: Direction, attempts: u32 },

    /// Every attempt failed at the transport level.
    #[error("request '{direction}' failed after {attempts} attempts: {source}")]
    #[diagnostic(code(blockdrive::actuation::unreachable))]
    Unreachable {
        direction: Direction,
        attempts: u32,
        source: TransportError,
    },
}

/// Client driving one motion at a time against the car endpoint.
///
/// The client reads the shared [`LinkState`] but never writes it; when the
/// link is down a command short-circuits instantly instead of padding the
/// run with dead waits.
#[derive(Clone, Debug)]
pub struct ActuationClient<T> {
    transport: T,
    policy: RequestPolicy,
    link: LinkState,
}

impl<T: CommandTransport> ActuationClient<T> {
    /// New client with the default [`RequestPolicy`].
    #[must_use]
    pub fn new(transport: T, link: LinkState) -> Self {
        Self {
            transport,
            policy: RequestPolicy::default(),
            link,
        }
    }

    /// Override the request policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The shared reachability handle this client observes.
    #[must_use]
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    #[must_use]
    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    /// Issue one direction request with a bounded retry loop.
    ///
    /// Up to `retries + 1` attempts, each under an independent per-attempt
    /// timeout, with the policy's fixed delay between attempts. Returns the
    /// last failure when the budget is exhausted.
    pub async fn request(
        &self,
        direction: Direction,
        retries: u32,
    ) -> Result<(), ActuationError> {
        let attempts = retries + 1;
        let mut last: Option<ActuationError> = None;

        for attempt in 0..attempts {
            match timeout(self.policy.timeout, self.transport.send(direction)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(source)) => {
                    tracing::debug!(dir = %direction, attempt, %source, "attempt failed");
                    last = Some(ActuationError::Unreachable {
                        direction,
                        attempts,
                        source,
                    });
                }
                Err(_) => {
                    tracing::debug!(dir = %direction, attempt, "attempt timed out");
                    last = Some(ActuationError::Timeout {
                        direction,
                        attempts,
                    });
                }
            }
            if attempt + 1 < attempts {
                sleep(self.policy.retry_delay).await;
            }
        }

        // attempts >= 1, so `last` is always set on this path.
        Err(last.unwrap_or(ActuationError::Timeout {
            direction,
            attempts,
        }))
    }

    /// Execute one leaf command end to end.
    ///
    /// Sequence for a motion leaf: pre-stop (best effort), settle delay,
    /// primary request with the policy's retry budget, hold sleep, cleanup
    /// stop. Leaf `Stop`s skip the pre-stop/cleanup and use the larger
    /// [`STOP_LEAF_RETRIES`] budget. The hold sleep runs whether or not the
    /// primary request succeeded; it is the single suspension point callers
    /// may rely on.
    ///
    /// Containers are not accepted here; passing a `Repeat` is a caller bug
    /// and performs nothing.
    pub async fn perform(&self, command: &Command) -> Result<(), ActuationError> {
        let Some(direction) = command.direction() else {
            debug_assert!(false, "perform() called with a container command");
            return Ok(());
        };

        if !self.link.is_reachable() {
            // Deliberate fast-fail: no request, no hold, so offline runs
            // complete instantly.
            return Err(ActuationError::Disconnected);
        }

        if direction.is_motion() {
            if let Err(error) = self.request(Direction::Stop, SAFETY_STOP_RETRIES).await {
                tracing::debug!(%error, "pre-motion stop failed");
            }
            sleep(self.policy.settle_delay).await;
        }

        let retries = if direction.is_motion() {
            self.policy.retries
        } else {
            STOP_LEAF_RETRIES
        };
        let primary = self.request(direction, retries).await;
        if let Err(error) = &primary {
            tracing::warn!(dir = %direction, %error, "primary request failed");
        }

        if let Some(hold) = command.hold_duration() {
            sleep(hold).await;
        }

        if direction.is_motion() {
            // Guaranteed cleanup: never leave the car moving because a
            // request failed partway.
            if let Err(error) = self.request(Direction::Stop, SAFETY_STOP_RETRIES).await {
                tracing::debug!(%error, "cleanup stop failed");
            }
        }

        primary
    }
}
