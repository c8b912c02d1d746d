// # Item Store Traits
//
// The aggregated item set. Two traits split the contract:
//
// - `ItemStore`: bulk key listings for deduplication, full scans for the
//   retention sweep, insertion and single-counter updates
// - `RankingQuery`: paginated, ordered projections used by the digest
//   builder and the social crawler
//
// ## Write granularity
//
// `set_counter` updates exactly one counter of one item. The social crawler
// calls it once per changed value so that a run interrupted half way keeps
// everything written so far.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::model::{Item, ItemQuery, ItemView, NewItem, SocialProvider};

/// Trait for item store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple job tasks.
/// The store does not enforce link or title uniqueness; that invariant is
/// owned by the aggregation run through its deduplication index.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Every stored link
    async fn find_all_links(&self) -> Result<HashSet<String>, crate::Error>;

    /// Every stored title, lowercased
    async fn find_all_lowercase_titles(&self) -> Result<HashSet<String>, crate::Error>;

    /// Full scan of the item set
    async fn find_all(&self) -> Result<Vec<Item>, crate::Error>;

    /// Insert a new item
    ///
    /// # Returns
    ///
    /// The stored item with its assigned id
    async fn insert(&self, item: NewItem) -> Result<Item, crate::Error>;

    /// Delete an item permanently
    ///
    /// Deleting an id that does not exist is not an error.
    async fn delete(&self, item_id: i64) -> Result<(), crate::Error>;

    /// Overwrite one social counter of one item
    async fn set_counter(
        &self,
        provider: SocialProvider,
        item_id: i64,
        value: u64,
    ) -> Result<(), crate::Error>;
}

/// Paginated ranking of items
///
/// Page size is a property of the implementation. An empty page signals
/// the end of the result set.
#[async_trait]
pub trait RankingQuery: Send + Sync {
    async fn top_items(&self, query: &ItemQuery) -> Result<Vec<ItemView>, crate::Error>;
}
