//! Retention sweep: old items nobody clicked are deleted for good.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::jobs::{Job, JobReport};
use crate::model::Item;
use crate::traits::catalog::ITEM_COUNT_CACHE;
use crate::traits::{Cache, ItemStore};

pub struct RetentionSweeper {
    items: Arc<dyn ItemStore>,
    cache: Arc<dyn Cache>,
    max_age: chrono::Duration,
}

impl RetentionSweeper {
    pub fn new(items: Arc<dyn ItemStore>, cache: Arc<dyn Cache>, max_age: chrono::Duration) -> Self {
        Self {
            items,
            cache,
            max_age,
        }
    }

    /// True when the item has no clicks and is older than `max_age` at `now`
    pub fn is_expendable(&self, item: &Item, now: DateTime<Utc>) -> bool {
        item.click_count == 0 && now.signed_duration_since(item.published) > self.max_age
    }

    /// Sweep the store as of `now`
    ///
    /// A failed delete aborts the sweep; items already deleted stay deleted.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let items = self.items.find_all().await?;
        let scanned = items.len();

        let mut deleted = 0;
        for item in items.iter().filter(|item| self.is_expendable(item, now)) {
            debug!("Deleting item {} ({})", item.id, item.link);
            self.items.delete(item.id).await?;
            deleted += 1;
        }

        self.cache.invalidate(ITEM_COUNT_CACHE).await;
        info!("Retention sweep: scanned {}, deleted {}", scanned, deleted);

        Ok(JobReport::Retention { scanned, deleted })
    }
}

#[async_trait]
impl Job for RetentionSweeper {
    fn name(&self) -> &'static str {
        "retention"
    }

    async fn run(&self) -> Result<JobReport> {
        self.sweep_at(Utc::now()).await
    }
}
