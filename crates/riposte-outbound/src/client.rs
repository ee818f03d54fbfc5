//! Shared HTTP client construction.

use std::time::Duration;

/// Timeout applied to every outbound request.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Build the HTTP client used by all collaborators.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}
