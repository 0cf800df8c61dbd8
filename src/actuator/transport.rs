//! Transport seam between the actuation client and the physical car.
//!
//! [`CommandTransport`] is one request attempt with no retry and no timeout
//! of its own; the client owns both. Keeping the seam this narrow lets tests
//! substitute recording or failing transports without touching the retry
//! logic.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::Direction;

/// Failure of a single request attempt.
///
/// The client's retry loop consumes these; callers above the client never
/// see them directly.
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    /// The HTTP request failed (connect error, reset, DNS, ...).
    #[error("request to car failed: {0}")]
    #[diagnostic(code(blockdrive::transport::http))]
    Http(#[from] reqwest::Error),

    /// Transport-specific failure injected by a test double.
    #[error("transport failure: {0}")]
    #[diagnostic(code(blockdrive::transport::other))]
    Other(String),
}

impl TransportError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A single fire-and-forget request attempt toward the car.
///
/// Implementations must not retry and must not enforce a deadline; both are
/// the client's job. Success means only "the attempt did not error" — the
/// firmware never acknowledges execution and the response body is ignored.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(&self, direction: Direction) -> Result<(), TransportError>;
}

/// HTTP transport speaking the car's one-shot wire contract:
/// `GET {base}/direction?dir={token}`, no body, no auth, response ignored.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for the given base URL (scheme + host, no trailing
    /// slash required).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Base URL this transport targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn direction_url(&self, direction: Direction) -> String {
        format!("{}/direction?dir={}", self.base_url, direction.as_token())
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, direction: Direction) -> Result<(), TransportError> {
        let url = self.direction_url(direction);
        tracing::trace!(%url, dir = %direction, "sending direction request");
        // The body is opaque on purpose (the firmware answers cross-origin
        // with nothing useful); an error status still counts as delivered.
        self.client.get(&url).send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_url_shape() {
        let transport = HttpTransport::new("http://192.168.4.1/");
        assert_eq!(
            transport.direction_url(Direction::Left),
            "http://192.168.4.1/direction?dir=gauche"
        );
    }
}
