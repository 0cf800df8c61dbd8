//! Manual control path: direct one-shot direction commands.
//!
//! Manual control has no sequencing and no hold timing; a press sends the
//! direction once and a release sends `stop`. It shares the physical
//! endpoint with the program executor, so every press first claims the
//! endpoint through [`EndpointOwner`]; while a program runs, manual commands
//! are rejected rather than interleaved.
//!
//! [`ManualControl::emergency_stop`] is the one exception to arbitration:
//! it always sends, owner or not, because halting the car is safe under any
//! interleaving.

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::actuator::{
    ActuationClient, ActuationError, CommandTransport, Direction, STOP_LEAF_RETRIES,
};
use crate::arbitration::{EndpointBusy, EndpointOwner, OwnerPermit};

/// Failures of the manual path.
#[derive(Debug, Error, Diagnostic)]
pub enum ManualError {
    /// The program executor currently owns the endpoint.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Busy(#[from] EndpointBusy),

    /// The request itself failed or the car is unreachable.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Actuation(#[from] ActuationError),
}

/// Joystick-style controller sending one-shot direction commands.
///
/// Holds the endpoint permit from the first press until [`release`]
/// (or [`emergency_stop`]), so a running manual gesture blocks program
/// starts the same way a running program blocks manual input.
///
/// [`release`]: Self::release
/// [`emergency_stop`]: Self::emergency_stop
pub struct ManualControl<T> {
    client: ActuationClient<T>,
    owner: EndpointOwner,
    permit: Mutex<Option<OwnerPermit>>,
}

impl<T: CommandTransport> ManualControl<T> {
    pub fn new(client: ActuationClient<T>, owner: EndpointOwner) -> Self {
        Self {
            client,
            owner,
            permit: Mutex::new(None),
        }
    }

    /// Start (or continue) a manual gesture in the given direction.
    ///
    /// One request, no retries; held keys re-press without re-sending
    /// arbitration.
    pub async fn press(&self, direction: Direction) -> Result<(), ManualError> {
        {
            let mut slot = self.permit.lock().await;
            if slot.is_none() {
                *slot = Some(self.owner.try_acquire("manual")?);
            }
        }
        if !self.client.link().is_reachable() {
            tracing::debug!(dir = %direction, "manual press while disconnected");
            return Err(ManualError::Actuation(ActuationError::Disconnected));
        }
        self.client.request(direction, 0).await?;
        Ok(())
    }

    /// End the current gesture: send `stop` and release the endpoint.
    pub async fn release(&self) -> Result<(), ManualError> {
        let result = if self.client.link().is_reachable() {
            self.client.request(Direction::Stop, 0).await
        } else {
            Ok(())
        };
        self.permit.lock().await.take();
        result.map_err(ManualError::Actuation)
    }

    /// Halt the car immediately.
    ///
    /// Sends two `stop` requests with the full stop retry budget for
    /// redundancy over the lossy link, then releases any held permit.
    /// Deliberately skips arbitration.
    pub async fn emergency_stop(&self) -> Result<(), ManualError> {
        if !self.client.link().is_reachable() {
            self.permit.lock().await.take();
            return Err(ManualError::Actuation(ActuationError::Disconnected));
        }
        let first = self.client.request(Direction::Stop, STOP_LEAF_RETRIES).await;
        let second = self.client.request(Direction::Stop, STOP_LEAF_RETRIES).await;
        self.permit.lock().await.take();
        tracing::warn!("EMERGENCY STOP - car halted immediately");
        first.or(second).map_err(ManualError::Actuation)
    }
}
