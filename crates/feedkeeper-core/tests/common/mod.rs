//! Test doubles and common utilities for job contract tests
//!
//! The doubles count calls and script failures; the actual data lives in a
//! shared `MemoryCatalog` wherever a store is needed.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use feedkeeper_core::config::SocialConfig;
use feedkeeper_core::dedup::DeduplicationIndex;
use feedkeeper_core::error::{Error, Result};
use feedkeeper_core::jobs::{Job, JobReport};
use feedkeeper_core::model::{
    Item, ItemQuery, ItemView, NewItem, SocialProvider, Source,
};
use feedkeeper_core::state::MemoryCatalog;
use feedkeeper_core::traits::{ItemSaver, ItemStore, JsonFetcher, RankingQuery};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build a stored item published `age_days` ago
pub fn item(id: i64, link: &str, title: &str, age_days: i64, clicks: u64) -> Item {
    Item {
        id,
        source_id: 1,
        category_id: Some(1),
        link: link.to_string(),
        title: title.to_string(),
        published: Utc::now() - Duration::days(age_days),
        click_count: clicks,
        twitter_retweet_count: 0,
        facebook_share_count: 0,
        linkedin_share_count: 0,
    }
}

/// Social config whose provider calls give up after one second
pub fn fast_social_config() -> SocialConfig {
    SocialConfig {
        request_timeout_secs: 1,
        ..SocialConfig::default()
    }
}

/// Scripted answer of one provider
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Count(u64),
    Fail,
    /// Never answers within any reasonable timeout
    Hang,
}

/// A JsonFetcher answering per provider, recognized by endpoint prefix
pub struct ScriptedFetcher {
    config: SocialConfig,
    replies: Arc<std::sync::Mutex<HashMap<SocialProvider, Reply>>>,
    calls: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    /// Every provider answers `count`
    pub fn new(config: SocialConfig, count: u64) -> Self {
        let replies = SocialProvider::ALL
            .into_iter()
            .map(|provider| (provider, Reply::Count(count)))
            .collect();
        Self {
            config,
            replies: Arc::new(std::sync::Mutex::new(replies)),
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_reply(self, provider: SocialProvider, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(provider, reply);
        self
    }

    /// Every URL requested so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Create a new ScriptedFetcher that shares replies and calls with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            config: other.config.clone(),
            replies: Arc::clone(&other.replies),
            calls: Arc::clone(&other.calls),
        }
    }

    fn provider_of(&self, url: &str) -> Option<SocialProvider> {
        SocialProvider::ALL
            .into_iter()
            .find(|provider| url.starts_with(self.config.endpoint(*provider)))
    }
}

#[async_trait::async_trait]
impl JsonFetcher for ScriptedFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        self.calls.lock().unwrap().push(url.to_string());

        let provider = self
            .provider_of(url)
            .ok_or_else(|| Error::http(format!("unexpected url {}", url)))?;
        let reply = self.replies.lock().unwrap().get(&provider).copied();

        match reply {
            Some(Reply::Count(count)) => {
                Ok(serde_json::json!({ provider.response_field(): count }))
            }
            Some(Reply::Hang) => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Ok(serde_json::json!({}))
            }
            Some(Reply::Fail) | None => Err(Error::http(format!("{} unavailable", provider))),
        }
    }
}

/// An ItemStore over a MemoryCatalog that counts writes and can fail deletes
pub struct CountingItemStore {
    catalog: MemoryCatalog,
    set_counter_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    failing_deletes: HashSet<i64>,
}

impl CountingItemStore {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self {
            catalog,
            set_counter_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            failing_deletes: HashSet::new(),
        }
    }

    /// Make deleting `item_id` fail
    pub fn failing_delete_of(mut self, item_id: i64) -> Self {
        self.failing_deletes.insert(item_id);
        self
    }

    pub fn set_counter_calls(&self) -> usize {
        self.set_counter_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ItemStore for CountingItemStore {
    async fn find_all_links(&self) -> Result<HashSet<String>> {
        self.catalog.find_all_links().await
    }

    async fn find_all_lowercase_titles(&self) -> Result<HashSet<String>> {
        self.catalog.find_all_lowercase_titles().await
    }

    async fn find_all(&self) -> Result<Vec<Item>> {
        self.catalog.find_all().await
    }

    async fn insert(&self, item: NewItem) -> Result<Item> {
        self.catalog.insert(item).await
    }

    async fn delete(&self, item_id: i64) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(&item_id) {
            return Err(Error::store(format!("item {} is locked", item_id)));
        }
        self.catalog.delete(item_id).await
    }

    async fn set_counter(&self, provider: SocialProvider, item_id: i64, value: u64) -> Result<()> {
        self.set_counter_calls.fetch_add(1, Ordering::SeqCst);
        self.catalog.set_counter(provider, item_id, value).await
    }
}

/// A RankingQuery serving fixed pages and counting requests
pub struct PagedRanking {
    pages: Vec<Vec<ItemView>>,
    requests: Arc<std::sync::Mutex<Vec<ItemQuery>>>,
}

impl PagedRanking {
    pub fn new(pages: Vec<Vec<ItemView>>) -> Self {
        Self {
            pages,
            requests: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ItemQuery> {
        self.requests.lock().unwrap().clone()
    }

    /// Create a new PagedRanking that shares pages and requests with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            pages: other.pages.clone(),
            requests: Arc::clone(&other.requests),
        }
    }
}

#[async_trait::async_trait]
impl RankingQuery for PagedRanking {
    async fn top_items(&self, query: &ItemQuery) -> Result<Vec<ItemView>> {
        self.requests.lock().unwrap().push(query.clone());
        Ok(self.pages.get(query.page).cloned().unwrap_or_default())
    }
}

/// A feed entry served by the scripted saver
#[derive(Debug, Clone)]
pub struct Entry {
    pub link: String,
    pub title: String,
    pub published: DateTime<Utc>,
}

pub fn entry(link: &str, title: &str) -> Entry {
    Entry {
        link: link.to_string(),
        title: title.to_string(),
        published: Utc::now(),
    }
}

/// An ItemSaver serving scripted entries per source id
///
/// Novel entries are inserted into the shared catalog and then recorded in
/// the index, as a real saver does.
pub struct ScriptedSaver {
    catalog: MemoryCatalog,
    feeds: HashMap<i64, Vec<Entry>>,
    failing: HashSet<i64>,
    processed: Arc<std::sync::Mutex<Vec<i64>>>,
}

impl ScriptedSaver {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self {
            catalog,
            feeds: HashMap::new(),
            failing: HashSet::new(),
            processed: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_feed(mut self, source_id: i64, entries: Vec<Entry>) -> Self {
        self.feeds.insert(source_id, entries);
        self
    }

    /// Make fetching `source_id` fail
    pub fn failing(mut self, source_id: i64) -> Self {
        self.failing.insert(source_id);
        self
    }

    /// Source ids in the order they were handed to the saver
    pub fn processed(&self) -> Vec<i64> {
        self.processed.lock().unwrap().clone()
    }

    /// Create a new ScriptedSaver that shares its processing log with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            catalog: other.catalog.clone(),
            feeds: other.feeds.clone(),
            failing: other.failing.clone(),
            processed: Arc::clone(&other.processed),
        }
    }
}

#[async_trait::async_trait]
impl ItemSaver for ScriptedSaver {
    async fn save_items(&self, source: &Source, index: &mut DeduplicationIndex) -> Result<usize> {
        self.processed.lock().unwrap().push(source.id);

        if self.failing.contains(&source.id) {
            return Err(Error::source(&source.name, "feed unreachable"));
        }

        let mut inserted = 0;
        for entry in self.feeds.get(&source.id).into_iter().flatten() {
            if !index.check(&entry.link, &entry.title).is_admitted() {
                continue;
            }
            self.catalog
                .insert(NewItem {
                    source_id: source.id,
                    category_id: source.category_id,
                    link: entry.link.clone(),
                    title: entry.title.clone(),
                    published: entry.published,
                })
                .await?;
            index.record(&entry.link, &entry.title);
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// A job that counts its runs and can be slow or failing
pub struct CountingJob {
    name: &'static str,
    runs: Arc<AtomicUsize>,
    duration: std::time::Duration,
    fail: bool,
    panic_on_first_run: bool,
}

impl CountingJob {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            runs: Arc::new(AtomicUsize::new(0)),
            duration: std::time::Duration::ZERO,
            fail: false,
            panic_on_first_run: false,
        }
    }

    /// The first run panics; later runs succeed
    pub fn panicking_once(mut self) -> Self {
        self.panic_on_first_run = true;
        self
    }

    /// Each run takes `duration`
    pub fn taking(mut self, duration: std::time::Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Each run fails
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Create a new CountingJob that shares its run counter with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            name: other.name,
            runs: Arc::clone(&other.runs),
            duration: other.duration,
            fail: other.fail,
            panic_on_first_run: other.panic_on_first_run,
        }
    }
}

#[async_trait::async_trait]
impl Job for CountingJob {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self) -> Result<JobReport> {
        let previous_runs = self.runs.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first_run && previous_runs == 0 {
            panic!("{} blew up", self.name);
        }
        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }
        if self.fail {
            return Err(Error::store("backend unavailable"));
        }
        Ok(JobReport::Retention {
            scanned: 0,
            deleted: 0,
        })
    }
}
