// # feedkeeper-http
//
// Network collaborators of the feedkeeper jobs, built on reqwest.
//
// - `HttpJsonFetcher`: GET a social counter endpoint and decode its JSON
// - `RssItemSaver`: download a source feed, parse it with feed-rs and
//   insert every entry the deduplication index admits
//
// Neither type retries. A failed call surfaces as an error and the calling
// job decides what it affects.

mod json;
mod rss;

pub use json::HttpJsonFetcher;
pub use rss::{RssItemSaver, parse_entries};

use feedkeeper_core::Error;
use std::time::Duration;

/// Default timeout of feed downloads
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("feedkeeper/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into an error naming `what` was requested
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        404 => Err(Error::not_found(format!("{} ({})", what, status))),
        429 => Err(Error::http(format!(
            "Rate limit exceeded for {}. Status: {}",
            what, status
        ))),
        500..=599 => Err(Error::http(format!(
            "Server error (transient) for {}: {} - {}",
            what, status, error_text
        ))),
        _ => Err(Error::http(format!(
            "Request for {} failed: {} - {}",
            what, status, error_text
        ))),
    }
}
