// # Fetcher Traits
//
// Network-facing collaborators. Neither trait retries, backs off or
// schedules anything; the jobs own timeouts and failure isolation.
//
// - `JsonFetcher`: GET a URL and decode the body as JSON
// - `ItemSaver`: fetch one source and insert its novel items

use async_trait::async_trait;

use crate::dedup::DeduplicationIndex;
use crate::model::Source;

/// Trait for JSON endpoint clients
///
/// Implementations perform a single request per call and return any
/// transport, status or decoding failure as an error.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, crate::Error>;
}

/// Trait for per-source savers
///
/// The saver fetches the source's feed and inserts every entry the index
/// admits. It must record each inserted item in `index` so that sources
/// processed later in the same run see it.
///
/// # Returns
///
/// The number of items inserted
#[async_trait]
pub trait ItemSaver: Send + Sync {
    async fn save_items(
        &self,
        source: &Source,
        index: &mut DeduplicationIndex,
    ) -> Result<usize, crate::Error>;
}
