// # Memory Catalog
//
// In-memory implementation of every store collaborator.
//
// ## Purpose
//
// Backs the daemon (together with `SnapshotFile` for persistence across
// restarts) and the contract tests. One `CatalogData` record behind a
// `RwLock` holds sources, categories, channel settings, items and digests.
//
// ## Ranking
//
// `top_items` pages through items published inside the requested window,
// `page_size` items per page. `Latest` sorts by publication date,
// `MostViewed` by click count, both descending with the id as tie-breaker.
//
// ## Ids
//
// Item and digest ids come from counters kept in `CatalogData`, so an id is
// never handed out twice, even after the item holding it was deleted.
// Snapshots written before the counters existed load with the counters at
// zero; the next id is then derived from the highest stored id.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::{
    Category, ChannelSettings, DigestDocument, Item, ItemOrder, ItemQuery, ItemView, NewItem,
    SocialProvider, Source,
};
use crate::traits::{
    Cache, CategoryCatalog, DigestStore, ItemStore, RankingQuery, SettingsStore, SourceCatalog,
};
use crate::Error;

/// Default number of items per ranking page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Number of recent cache invalidations kept for inspection
pub const INVALIDATION_LOG_CAPACITY: usize = 64;

/// Everything the catalog stores; also the snapshot file payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub settings: ChannelSettings,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub items: BTreeMap<i64, Item>,
    #[serde(default)]
    pub digests: Vec<DigestDocument>,
    /// Lower bound of the next item id
    #[serde(default)]
    pub next_item_id: i64,
    /// Lower bound of the next digest id
    #[serde(default)]
    pub next_digest_id: i64,
}

impl CatalogData {
    fn allocate_item_id(&mut self) -> i64 {
        let after_stored = self.items.keys().next_back().map_or(1, |last| last + 1);
        let id = self.next_item_id.max(after_stored);
        self.next_item_id = id + 1;
        id
    }

    fn allocate_digest_id(&mut self) -> i64 {
        let after_stored = self
            .digests
            .iter()
            .filter_map(|doc| doc.id)
            .max()
            .map_or(1, |last| last + 1);
        let id = self.next_digest_id.max(after_stored);
        self.next_digest_id = id + 1;
        id
    }
}

/// In-memory store implementation
///
/// Cloning shares the underlying data.
///
/// # Example
///
/// ```rust,no_run
/// use feedkeeper_core::model::{Category, Source};
/// use feedkeeper_core::state::MemoryCatalog;
/// use feedkeeper_core::traits::SourceCatalog;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = MemoryCatalog::new();
///     catalog.add_category(Category::new(1, "Java")).await;
///     catalog
///         .add_source(Source::new(1, "Blog", "https://blog.example/feed").with_category(1))
///         .await;
///
///     assert_eq!(catalog.list_sources().await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    inner: Arc<RwLock<CatalogData>>,
    invalidations: Arc<RwLock<VecDeque<String>>>,
    page_size: usize,
}

impl MemoryCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::from_data(CatalogData::default())
    }

    /// Create a catalog holding previously saved data
    pub fn from_data(data: CatalogData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
            invalidations: Arc::new(RwLock::new(VecDeque::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the ranking page size (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Copy of the current data, for persistence
    pub async fn snapshot(&self) -> CatalogData {
        self.inner.read().await.clone()
    }

    pub async fn add_source(&self, source: Source) {
        self.inner.write().await.sources.push(source);
    }

    pub async fn add_category(&self, category: Category) {
        self.inner.write().await.categories.push(category);
    }

    pub async fn set_settings(&self, settings: ChannelSettings) {
        self.inner.write().await.settings = settings;
    }

    /// Store an item as-is, bypassing id assignment
    pub async fn put_item(&self, item: Item) {
        self.inner.write().await.items.insert(item.id, item);
    }

    pub async fn get_item(&self, item_id: i64) -> Option<Item> {
        self.inner.read().await.items.get(&item_id).cloned()
    }

    pub async fn item_count(&self) -> usize {
        self.inner.read().await.items.len()
    }

    /// Register a reader click on an item
    pub async fn record_click(&self, item_id: i64) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let item = guard
            .items
            .get_mut(&item_id)
            .ok_or_else(|| Error::not_found(format!("Item {}", item_id)))?;
        item.click_count += 1;
        Ok(())
    }

    pub async fn digests(&self) -> Vec<DigestDocument> {
        self.inner.read().await.digests.clone()
    }

    /// The most recent cache invalidations, oldest first
    ///
    /// At most `INVALIDATION_LOG_CAPACITY` keys are kept.
    pub async fn invalidations(&self) -> Vec<String> {
        self.invalidations.read().await.iter().cloned().collect()
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCatalog for MemoryCatalog {
    async fn list_sources(&self) -> Result<Vec<Source>, Error> {
        let mut sources = self.inner.read().await.sources.clone();
        sources.sort_by_key(|source| source.aggregator);
        Ok(sources)
    }
}

#[async_trait]
impl CategoryCatalog for MemoryCatalog {
    async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        Ok(self.inner.read().await.categories.clone())
    }
}

#[async_trait]
impl SettingsStore for MemoryCatalog {
    async fn current(&self) -> Result<ChannelSettings, Error> {
        Ok(self.inner.read().await.settings.clone())
    }
}

#[async_trait]
impl Cache for MemoryCatalog {
    async fn invalidate(&self, key: &str) {
        let mut log = self.invalidations.write().await;
        if log.len() == INVALIDATION_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(key.to_string());
    }
}

#[async_trait]
impl ItemStore for MemoryCatalog {
    async fn find_all_links(&self) -> Result<HashSet<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.items.values().map(|item| item.link.clone()).collect())
    }

    async fn find_all_lowercase_titles(&self) -> Result<HashSet<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .items
            .values()
            .map(|item| item.title.to_lowercase())
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Item>, Error> {
        Ok(self.inner.read().await.items.values().cloned().collect())
    }

    async fn insert(&self, item: NewItem) -> Result<Item, Error> {
        let mut guard = self.inner.write().await;
        let id = guard.allocate_item_id();
        let stored = Item {
            id,
            source_id: item.source_id,
            category_id: item.category_id,
            link: item.link,
            title: item.title,
            published: item.published,
            click_count: 0,
            twitter_retweet_count: 0,
            facebook_share_count: 0,
            linkedin_share_count: 0,
        };
        guard.items.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, item_id: i64) -> Result<(), Error> {
        self.inner.write().await.items.remove(&item_id);
        Ok(())
    }

    async fn set_counter(
        &self,
        provider: SocialProvider,
        item_id: i64,
        value: u64,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let item = guard
            .items
            .get_mut(&item_id)
            .ok_or_else(|| Error::not_found(format!("Item {}", item_id)))?;
        item.set_counter(provider, value);
        Ok(())
    }
}

#[async_trait]
impl RankingQuery for MemoryCatalog {
    async fn top_items(&self, query: &ItemQuery) -> Result<Vec<ItemView>, Error> {
        let guard = self.inner.read().await;
        let oldest = query.window.duration().map(|window| Utc::now() - window);

        let mut matching: Vec<&Item> = guard
            .items
            .values()
            .filter(|item| oldest.is_none_or(|oldest| item.published >= oldest))
            .filter(|item| {
                query.categories.is_empty()
                    || item
                        .category_id
                        .is_some_and(|id| query.categories.contains(&id))
            })
            .collect();

        match query.order {
            ItemOrder::Latest => {
                matching.sort_by(|a, b| b.published.cmp(&a.published).then(b.id.cmp(&a.id)))
            }
            ItemOrder::MostViewed => matching.sort_by(|a, b| {
                b.click_count
                    .cmp(&a.click_count)
                    .then(b.published.cmp(&a.published))
                    .then(b.id.cmp(&a.id))
            }),
        }

        Ok(matching
            .into_iter()
            .skip(query.page * self.page_size)
            .take(self.page_size)
            .map(Item::view)
            .collect())
    }
}

#[async_trait]
impl DigestStore for MemoryCatalog {
    async fn find_by_short_name(&self, short_name: &str) -> Result<Option<DigestDocument>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .digests
            .iter()
            .find(|doc| doc.short_name == short_name)
            .cloned())
    }

    async fn save(&self, mut document: DigestDocument) -> Result<DigestDocument, Error> {
        let mut guard = self.inner.write().await;
        let id = guard.allocate_digest_id();
        document.id = Some(id);
        guard.digests.push(document.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RankingWindow;
    use chrono::Duration;

    fn new_item(link: &str, title: &str, category: i64, age_days: i64) -> NewItem {
        NewItem {
            source_id: 1,
            category_id: Some(category),
            link: link.to_string(),
            title: title.to_string(),
            published: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_lists_keys() {
        let catalog = MemoryCatalog::new();

        let first = catalog.insert(new_item("a.com/1", "Foo", 1, 0)).await.unwrap();
        let second = catalog.insert(new_item("a.com/2", "Bar", 1, 0)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(catalog.find_all_links().await.unwrap().contains("a.com/2"));
        assert!(catalog.find_all_lowercase_titles().await.unwrap().contains("foo"));

        catalog.delete(first.id).await.unwrap();
        // Deleting twice is fine
        catalog.delete(first.id).await.unwrap();
        assert_eq!(catalog.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_deleted_item_id_is_never_reused() {
        let catalog = MemoryCatalog::new();

        catalog.insert(new_item("a.com/1", "One", 1, 0)).await.unwrap();
        let highest = catalog.insert(new_item("a.com/2", "Two", 1, 0)).await.unwrap();
        catalog.delete(highest.id).await.unwrap();

        let next = catalog.insert(new_item("a.com/3", "Three", 1, 0)).await.unwrap();
        assert_eq!(next.id, 3);

        // The counter survives a snapshot round trip
        let restored = MemoryCatalog::from_data(catalog.snapshot().await);
        restored.delete(next.id).await.unwrap();
        let after_restore = restored.insert(new_item("a.com/4", "Four", 1, 0)).await.unwrap();
        assert_eq!(after_restore.id, 4);
    }

    #[tokio::test]
    async fn test_snapshot_without_counters_continues_after_highest_id() {
        let mut data = CatalogData::default();
        data.items.insert(
            7,
            Item {
                id: 7,
                source_id: 1,
                category_id: None,
                link: "a.com/7".to_string(),
                title: "Seven".to_string(),
                published: Utc::now(),
                click_count: 0,
                twitter_retweet_count: 0,
                facebook_share_count: 0,
                linkedin_share_count: 0,
            },
        );
        let catalog = MemoryCatalog::from_data(data);

        let next = catalog.insert(new_item("a.com/8", "Eight", 1, 0)).await.unwrap();
        assert_eq!(next.id, 8);
    }

    #[tokio::test]
    async fn test_invalidation_log_is_bounded() {
        let catalog = MemoryCatalog::new();
        for i in 0..INVALIDATION_LOG_CAPACITY + 5 {
            catalog.invalidate(&format!("key-{}", i)).await;
        }

        let log = catalog.invalidations().await;
        assert_eq!(log.len(), INVALIDATION_LOG_CAPACITY);
        assert_eq!(log.first().map(String::as_str), Some("key-5"));
        assert_eq!(
            log.last(),
            Some(&format!("key-{}", INVALIDATION_LOG_CAPACITY + 4))
        );
    }

    #[tokio::test]
    async fn test_top_items_orders_filters_and_pages() {
        let catalog = MemoryCatalog::new().with_page_size(2);
        for (i, age) in [1, 2, 3, 20].into_iter().enumerate() {
            catalog
                .insert(new_item(&format!("a.com/{}", i), &format!("T{}", i), 1, age))
                .await
                .unwrap();
        }
        catalog.insert(new_item("b.com/x", "Other", 2, 0)).await.unwrap();
        catalog.record_click(3).await.unwrap();

        let latest = |page| ItemQuery {
            page,
            categories: vec![1],
            order: ItemOrder::Latest,
            window: RankingWindow::Week,
        };

        let page0 = catalog.top_items(&latest(0)).await.unwrap();
        assert_eq!(page0.iter().map(|v| v.id).collect::<Vec<_>>(), vec![1, 2]);
        let page1 = catalog.top_items(&latest(1)).await.unwrap();
        // Item 4 is outside the week window
        assert_eq!(page1.iter().map(|v| v.id).collect::<Vec<_>>(), vec![3]);
        assert!(catalog.top_items(&latest(2)).await.unwrap().is_empty());

        let viewed = catalog
            .top_items(&ItemQuery {
                page: 0,
                categories: vec![],
                order: ItemOrder::MostViewed,
                window: RankingWindow::All,
            })
            .await
            .unwrap();
        assert_eq!(viewed[0].id, 3);
    }

    #[tokio::test]
    async fn test_set_counter_on_missing_item_fails() {
        let catalog = MemoryCatalog::new();
        let result = catalog.set_counter(SocialProvider::Twitter, 42, 1).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_digest_save_assigns_id() {
        let catalog = MemoryCatalog::new();
        let doc = DigestDocument {
            id: None,
            short_name: "best-of-4-2024".to_string(),
            title: "t".to_string(),
            short_description: "d".to_string(),
            description: "<p></p>".to_string(),
            published: Utc::now(),
        };

        let saved = catalog.save(doc.clone()).await.unwrap();
        assert_eq!(saved.id, Some(1));
        assert!(catalog
            .find_by_short_name("best-of-4-2024")
            .await
            .unwrap()
            .is_some());
        assert!(catalog.find_by_short_name("best-of-5-2024").await.unwrap().is_none());

        // Losing the newest digest does not free its id
        let second = catalog.save(doc.clone()).await.unwrap();
        assert_eq!(second.id, Some(2));
        catalog.inner.write().await.digests.retain(|d| d.id != Some(2));
        let third = catalog.save(doc).await.unwrap();
        assert_eq!(third.id, Some(3));
    }
}
