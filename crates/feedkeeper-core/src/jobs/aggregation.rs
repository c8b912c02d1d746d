//! Source aggregation
//!
//! Each run rebuilds the deduplication index from the item store, then hands
//! every source to the [`ItemSaver`] in aggregation order: primary sources
//! first, aggregator (mirror) sources last, so mirrors never claim content a
//! primary source owns. A failing source is logged and skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::dedup::DeduplicationIndex;
use crate::error::Result;
use crate::jobs::{Job, JobReport};
use crate::traits::catalog::ITEM_COUNT_CACHE;
use crate::traits::{Cache, ItemSaver, ItemStore, SourceCatalog};

/// Timestamps of the most recent aggregation run
///
/// Cloning shares the underlying record, so a handle kept by the embedding
/// application observes every run.
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    inner: Arc<RwLock<RunTimes>>,
}

#[derive(Debug, Default)]
struct RunTimes {
    last_started: Option<DateTime<Utc>>,
    last_finished: Option<DateTime<Utc>>,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the most recent run
    pub async fn last_indexed_start(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_started
    }

    /// End of the most recent run that went through every source
    pub async fn last_indexed_finish(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_finished
    }

    pub async fn set_last_indexed_start(&self, at: DateTime<Utc>) {
        self.inner.write().await.last_started = Some(at);
    }

    pub async fn set_last_indexed_finish(&self, at: DateTime<Utc>) {
        self.inner.write().await.last_finished = Some(at);
    }
}

pub struct AggregationRunner {
    sources: Arc<dyn SourceCatalog>,
    items: Arc<dyn ItemStore>,
    saver: Arc<dyn ItemSaver>,
    cache: Arc<dyn Cache>,
    state: AggregationState,
}

impl AggregationRunner {
    pub fn new(
        sources: Arc<dyn SourceCatalog>,
        items: Arc<dyn ItemStore>,
        saver: Arc<dyn ItemSaver>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            sources,
            items,
            saver,
            cache,
            state: AggregationState::new(),
        }
    }

    /// Share an externally owned state record
    pub fn with_state(mut self, state: AggregationState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    async fn aggregate(&self) -> Result<JobReport> {
        self.state.set_last_indexed_start(Utc::now()).await;

        let mut sources = self.sources.list_sources().await?;
        // Stable: catalog order is kept within one aggregation class
        sources.sort_by_key(|source| source.aggregator);

        let mut index = DeduplicationIndex::build(self.items.as_ref()).await?;
        debug!(
            "Dedup index built: {} links, {} titles",
            index.link_count(),
            index.title_count()
        );

        let mut inserted = 0;
        let mut failed_sources = 0;
        for source in &sources {
            match self.saver.save_items(source, &mut index).await {
                Ok(count) => {
                    debug!("Source {} ({}): {} new item(s)", source.name, source.id, count);
                    inserted += count;
                }
                Err(e) => {
                    warn!("Source {} ({}) failed: {}", source.name, source.id, e);
                    failed_sources += 1;
                }
            }
        }

        self.state.set_last_indexed_finish(Utc::now()).await;
        self.cache.invalidate(ITEM_COUNT_CACHE).await;

        info!(
            "Aggregation finished: {} source(s), {} failed, {} new item(s)",
            sources.len(),
            failed_sources,
            inserted
        );

        Ok(JobReport::Aggregation {
            sources: sources.len(),
            failed_sources,
            inserted,
        })
    }
}

#[async_trait]
impl Job for AggregationRunner {
    fn name(&self) -> &'static str {
        "aggregation"
    }

    async fn run(&self) -> Result<JobReport> {
        self.aggregate().await
    }
}
