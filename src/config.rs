//! Drive configuration.
//!
//! Resolves the car's base URL from the environment (`.env` supported via
//! dotenvy) and carries the request policy everything downstream shares.

use crate::actuator::{HttpTransport, RequestPolicy};

/// Default base URL: the car firmware's access-point address.
pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "CAR_BASE_URL";

/// Configuration for one car endpoint.
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub base_url: String,
    pub policy: RequestPolicy,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: Self::resolve_base_url(None),
            policy: RequestPolicy::default(),
        }
    }
}

impl DriveConfig {
    /// Config with an explicit base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            policy: RequestPolicy::default(),
        }
    }

    /// Config from the environment: `CAR_BASE_URL`, falling back to
    /// [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }

    fn resolve_base_url(provided: Option<String>) -> String {
        if let Some(url) = provided {
            return url;
        }
        dotenvy::dotenv().ok();
        std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the HTTP transport for this endpoint.
    #[must_use]
    pub fn http_transport(&self) -> HttpTransport {
        HttpTransport::new(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_base_url_wins() {
        let config = DriveConfig::new("http://10.0.0.7:8080");
        assert_eq!(config.base_url, "http://10.0.0.7:8080");
    }
}
