//! Command IR and compiled programs.
//!
//! A [`Command`] is one node of the immutable program tree the compiler
//! emits: five motion leaves plus a counted [`Command::Repeat`] container.
//! A [`Program`] is the ordered top-level sequence. Neither is ever mutated
//! after compilation; re-running means replaying the same IR.
//!
//! Leaf timing lives here too: each leaf knows its wire [`Direction`] and the
//! hold duration the engine sleeps to emulate the physical motion. Turns are
//! converted at the car's nominal 90°/s turn rate.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actuator::Direction;

/// Nominal turn rate of the vehicle, used to convert degrees into a hold
/// duration. Calibrated against the stock chassis.
pub const TURN_RATE_DEG_PER_SEC: f64 = 90.0;

/// Valid duration range for move/stop commands, in seconds.
pub const DURATION_RANGE_SECS: (f64, f64) = (0.1, 10.0);

/// Valid angle range for turn commands, in degrees.
pub const DEGREES_RANGE: (f64, f64) = (1.0, 360.0);

/// One step of a compiled program.
///
/// Durations are in seconds within [`DURATION_RANGE_SECS`]; angles in degrees
/// within [`DEGREES_RANGE`]. The compiler enforces both ranges at build time;
/// values outside them indicate an editor defect, not a runtime condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    MoveForward { seconds: f64 },
    MoveBackward { seconds: f64 },
    TurnLeft { degrees: f64 },
    TurnRight { degrees: f64 },
    Stop { seconds: f64 },
    /// Counted repetition of an ordered body. The body may be empty; the
    /// count is re-clamped to zero at execution time regardless of what the
    /// compiler guaranteed.
    Repeat { count: u32, body: Vec<Command> },
}

impl Command {
    /// Wire direction for a leaf command, `None` for containers.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Command::MoveForward { .. } => Some(Direction::Forward),
            Command::MoveBackward { .. } => Some(Direction::Backward),
            Command::TurnLeft { .. } => Some(Direction::Left),
            Command::TurnRight { .. } => Some(Direction::Right),
            Command::Stop { .. } => Some(Direction::Stop),
            Command::Repeat { .. } => None,
        }
    }

    /// Time the engine holds after issuing the request, emulating the
    /// motion's real-world duration. Containers have no hold of their own.
    ///
    /// Moves and stops hold for their duration; turns hold for
    /// `degrees / 90` seconds per [`TURN_RATE_DEG_PER_SEC`].
    ///
    /// ```
    /// use blockdrive::program::Command;
    /// use std::time::Duration;
    ///
    /// let turn = Command::TurnLeft { degrees: 180.0 };
    /// assert_eq!(turn.hold_duration(), Some(Duration::from_millis(2000)));
    /// ```
    #[must_use]
    pub fn hold_duration(&self) -> Option<Duration> {
        let millis = match self {
            Command::MoveForward { seconds }
            | Command::MoveBackward { seconds }
            | Command::Stop { seconds } => seconds * 1000.0,
            Command::TurnLeft { degrees } | Command::TurnRight { degrees } => {
                degrees / TURN_RATE_DEG_PER_SEC * 1000.0
            }
            Command::Repeat { .. } => return None,
        };
        Some(Duration::from_millis(millis.max(0.0).round() as u64))
    }

    /// Whether this command is a motion leaf (i.e. not a container).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Command::Repeat { .. })
    }

    /// Number of leaf actuations executing this command produces, with
    /// repeats expanded `count` times.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Command::Repeat { count, body } => {
                (*count as usize) * body.iter().map(Command::leaf_count).sum::<usize>()
            }
            _ => 1,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::MoveForward { seconds } => write!(f, "Moving forward for {seconds}s"),
            Command::MoveBackward { seconds } => write!(f, "Moving backward for {seconds}s"),
            Command::TurnLeft { degrees } => write!(f, "Turning left {degrees}°"),
            Command::TurnRight { degrees } => write!(f, "Turning right {degrees}°"),
            Command::Stop { seconds } => write!(f, "Stopping for {seconds}s"),
            Command::Repeat { count, .. } => write!(f, "Repeating {count} times"),
        }
    }
}

/// Ordered sequence of top-level commands produced by the compiler.
///
/// Immutable once built; an empty program is not runnable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Program(Vec<Command>);

impl Program {
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self(commands)
    }

    /// Number of top-level commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level commands in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.0.iter()
    }

    /// Total leaf actuations a full run produces, repeats expanded.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.0.iter().map(Command::leaf_count).sum()
    }
}

impl From<Vec<Command>> for Program {
    fn from(commands: Vec<Command>) -> Self {
        Self::new(commands)
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
