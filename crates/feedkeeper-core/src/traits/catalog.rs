// # Catalog Traits
//
// Read-only catalogs owned outside the job engine: the registered sources,
// the categories and the channel settings singleton. Also hosts the cache
// invalidation hook jobs call after they change the item set.

use async_trait::async_trait;

use crate::model::{Category, ChannelSettings, Source};

/// Registered sources
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// List every source, ascending by aggregation flag
    ///
    /// Implementations should return primary sources (`aggregator` unset or
    /// `false`) before aggregator sources. The aggregation runner re-sorts
    /// defensively, so an unordered listing is tolerated.
    async fn list_sources(&self) -> Result<Vec<Source>, crate::Error>;
}

/// Category listing, in definition order
#[async_trait]
pub trait CategoryCatalog: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, crate::Error>;
}

/// Channel settings singleton
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn current(&self) -> Result<ChannelSettings, crate::Error>;
}

/// Cache key holding the cached item count
pub const ITEM_COUNT_CACHE: &str = "item-count";

/// Explicit cache invalidation
///
/// Jobs that add or remove items call [`Cache::invalidate`] once a run has
/// completed successfully. Invalidation is best effort and cannot fail.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn invalidate(&self, key: &str);
}
