//! Single-owner arbitration for the car endpoint.
//!
//! The program executor and the manual control path are independent senders
//! toward the same physical endpoint; the legacy stack let them race. Here
//! the endpoint is a conceptual single-owner channel: whoever holds the
//! [`OwnerPermit`] may send, everyone else is rejected until the permit
//! drops.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The endpoint is already owned by another sender.
#[derive(Debug, Error, Diagnostic)]
#[error("car endpoint is busy (held by {holder})")]
#[diagnostic(
    code(blockdrive::arbitration::busy),
    help("Wait for the current owner to finish, or cancel the running program.")
)]
pub struct EndpointBusy {
    /// Label of the current owner, e.g. "program" or "manual".
    pub holder: &'static str,
}

/// Cloneable handle to the endpoint's ownership lock.
///
/// All clones arbitrate over the same endpoint.
#[derive(Clone, Debug, Default)]
pub struct EndpointOwner {
    lock: Arc<Mutex<()>>,
    holder: Arc<std::sync::Mutex<Option<&'static str>>>,
}

/// RAII ownership of the endpoint; dropping it releases the endpoint.
#[derive(Debug)]
pub struct OwnerPermit {
    _guard: OwnedMutexGuard<()>,
    holder: Arc<std::sync::Mutex<Option<&'static str>>>,
    pub label: &'static str,
}

impl EndpointOwner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take ownership without waiting.
    ///
    /// `label` names the would-be owner and shows up in the rejection the
    /// other side sees.
    pub fn try_acquire(&self, label: &'static str) -> Result<OwnerPermit, EndpointBusy> {
        match self.lock.clone().try_lock_owned() {
            Ok(guard) => {
                if let Ok(mut holder) = self.holder.lock() {
                    *holder = Some(label);
                }
                Ok(OwnerPermit {
                    _guard: guard,
                    holder: self.holder.clone(),
                    label,
                })
            }
            Err(_) => {
                let holder = self
                    .holder
                    .lock()
                    .ok()
                    .and_then(|h| *h)
                    .unwrap_or("unknown");
                Err(EndpointBusy { holder })
            }
        }
    }
}

impl Drop for OwnerPermit {
    fn drop(&mut self) {
        if let Ok(mut holder) = self.holder.lock() {
            *holder = None;
        }
    }
}
