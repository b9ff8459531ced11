//! HTTP client utilities.
//!
//! Provides the shared HTTP client used by every provider fetcher and the
//! token refresher. The client is built once per poll cycle and shared
//! read-only across concurrent fetches.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{QpaceError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("qpace/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| QpaceError::Network(e.to_string()))
}

/// Map a transport error to the qpace taxonomy.
#[must_use]
pub fn map_request_error(err: &reqwest::Error, timeout: Duration) -> QpaceError {
    if err.is_timeout() {
        QpaceError::Timeout(timeout.as_secs())
    } else {
        QpaceError::Network(err.to_string())
    }
}
