//! Shared reachability flag for the car endpoint.
//!
//! Connectivity is probed by an external health-check poller; this module
//! only holds the boolean it publishes. The actuation client and engine read
//! the flag, never write it, and never determine reachability themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheap cloneable handle over the endpoint's reachability flag.
///
/// All clones observe the same underlying flag. The external poller calls
/// [`set_reachable`](Self::set_reachable); everything else calls
/// [`is_reachable`](Self::is_reachable).
#[derive(Clone, Debug, Default)]
pub struct LinkState {
    reachable: Arc<AtomicBool>,
}

impl LinkState {
    /// New link state, initially unreachable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New link state with an explicit initial value. Mostly for tests.
    #[must_use]
    pub fn with_reachable(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
        }
    }

    /// Whether the endpoint currently accepts commands.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    /// Publish a new reachability observation. Called by the poller.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let link = LinkState::new();
        let observer = link.clone();
        assert!(!observer.is_reachable());
        link.set_reachable(true);
        assert!(observer.is_reachable());
    }
}
