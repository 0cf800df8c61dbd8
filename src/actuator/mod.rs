//! Actuation path: wire directions, the transport seam, and the retrying
//! client that drives one motion at a time.
//!
//! The module is split the way the concerns split: [`Direction`] is the fixed
//! wire vocabulary, [`CommandTransport`] is a single best-effort request
//! attempt, and [`ActuationClient`] layers timeout/retry/settle/hold
//! discipline on top.

pub mod client;
pub mod transport;

pub use client::{
    ActuationClient, ActuationError, RequestPolicy, SAFETY_STOP_RETRIES, STOP_LEAF_RETRIES,
};
pub use transport::{CommandTransport, HttpTransport, TransportError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire-level direction token accepted by the car firmware.
///
/// The firmware speaks French: requests go to
/// `{base}/direction?dir={token}` with token one of `avant`, `arriere`,
/// `gauche`, `droite`, `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Direction {
    /// The query token the firmware expects.
    #[must_use]
    pub fn as_token(&self) -> &'static str {
        match self {
            Direction::Forward => "avant",
            Direction::Backward => "arriere",
            Direction::Left => "gauche",
            Direction::Right => "droite",
            Direction::Stop => "stop",
        }
    }

    /// Whether this direction causes motion (everything except `Stop`).
    #[must_use]
    pub fn is_motion(&self) -> bool {
        !matches!(self, Direction::Stop)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}
