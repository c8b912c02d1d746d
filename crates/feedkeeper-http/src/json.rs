use async_trait::async_trait;
use std::time::Duration;

use feedkeeper_core::traits::JsonFetcher;
use feedkeeper_core::{Error, Result};

/// reqwest-backed [`JsonFetcher`]
#[derive(Debug, Clone)]
pub struct HttpJsonFetcher {
    client: reqwest::Client,
}

impl HttpJsonFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::build_client(timeout)?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("GET {}: {}", url, e))
                } else {
                    Error::http(format!("GET {} failed: {}", url, e))
                }
            })?;

        let response = crate::check_status(response, url).await?;

        response
            .json()
            .await
            .map_err(|e| Error::http(format!("Invalid JSON from {}: {}", url, e)))
    }
}
