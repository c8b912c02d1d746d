// # RSS Item Saver
//
// Fetches one source feed (RSS or Atom), turns its entries into `NewItem`s
// and inserts those the run's deduplication index admits. Entries without a
// link or a title cannot be deduplicated and are skipped. An entry enters the
// index only after its insert succeeded, so a failed write never shadows a
// later copy of the same post.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use feedkeeper_core::dedup::{Admission, DeduplicationIndex};
use feedkeeper_core::model::{NewItem, Source};
use feedkeeper_core::traits::{ItemSaver, ItemStore};
use feedkeeper_core::{Error, Result};

pub struct RssItemSaver {
    items: Arc<dyn ItemStore>,
    client: reqwest::Client,
}

impl RssItemSaver {
    pub fn new(items: Arc<dyn ItemStore>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            items,
            client: crate::build_client(timeout)?,
        })
    }

    async fn download(&self, source: &Source) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&source.feed_url)
            .send()
            .await
            .map_err(|e| Error::source(&source.name, format!("Download failed: {}", e)))?;

        let response = crate::check_status(response, &source.feed_url).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::source(&source.name, format!("Failed to read feed: {}", e)))?;
        Ok(body.to_vec())
    }
}

/// Parse a feed document into insertable items of `source`
///
/// Entries keep feed order. Missing publication dates fall back to the
/// update date, then to the current time.
pub fn parse_entries(source: &Source, body: &[u8]) -> Result<Vec<NewItem>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| Error::source(&source.name, format!("Failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first()?.href.trim().to_string();
            let title = entry.title?.content.trim().to_string();
            if link.is_empty() || title.is_empty() {
                return None;
            }
            Some(NewItem {
                source_id: source.id,
                category_id: source.category_id,
                link,
                title,
                published: entry.published.or(entry.updated).unwrap_or_else(Utc::now),
            })
        })
        .collect();

    Ok(items)
}

/// Insert the candidates the index admits, recording each after its insert
async fn insert_novel(
    items: &dyn ItemStore,
    source: &Source,
    candidates: Vec<NewItem>,
    index: &mut DeduplicationIndex,
) -> Result<usize> {
    let mut inserted = 0;
    for candidate in candidates {
        match index.check(&candidate.link, &candidate.title) {
            Admission::Admitted => {
                let stored = items.insert(candidate).await?;
                index.record(&stored.link, &stored.title);
                inserted += 1;
            }
            rejected => {
                debug!("{}: skipping {} ({:?})", source.name, candidate.link, rejected);
            }
        }
    }
    Ok(inserted)
}

#[async_trait]
impl ItemSaver for RssItemSaver {
    async fn save_items(&self, source: &Source, index: &mut DeduplicationIndex) -> Result<usize> {
        let body = self.download(source).await?;
        let candidates = parse_entries(source, &body)?;
        let total = candidates.len();

        let inserted = insert_novel(self.items.as_ref(), source, candidates, index).await?;

        debug!("{}: {} of {} entries are new", source.name, inserted, total);
        Ok(inserted)
    }
}
