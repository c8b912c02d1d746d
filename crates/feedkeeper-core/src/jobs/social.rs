//! Social counter crawl
//!
//! Walks the items published during the past week, newest first, page by
//! page until the ranking query returns an empty page. For every item the
//! three providers are queried concurrently; each call is its own failure
//! boundary with its own timeout, so one provider being down never stops
//! the other two or the rest of the crawl. Items themselves are processed
//! one at a time to keep the request rate against the providers bounded.
//!
//! A counter is written back only when the fetched value differs from the
//! stored one, and immediately, one counter at a time.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SocialConfig;
use crate::error::{Error, Result};
use crate::jobs::{Job, JobReport};
use crate::model::{CounterReading, ItemOrder, ItemQuery, ItemView, RankingWindow, SocialProvider};
use crate::traits::{CategoryCatalog, ItemStore, JsonFetcher, RankingQuery};

/// Totals of one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Ranking pages requested, including the terminating empty page
    pub pages: usize,
    pub items: usize,
    /// Counters written back
    pub updated: usize,
    /// Counters already up to date
    pub unchanged: usize,
    /// Provider calls that failed or timed out
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterOutcome {
    Updated,
    Unchanged,
    Failed,
}

impl CrawlReport {
    fn record(&mut self, outcome: CounterOutcome) {
        match outcome {
            CounterOutcome::Updated => self.updated += 1,
            CounterOutcome::Unchanged => self.unchanged += 1,
            CounterOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct SocialMetricsCrawler {
    categories: Arc<dyn CategoryCatalog>,
    ranking: Arc<dyn RankingQuery>,
    items: Arc<dyn ItemStore>,
    fetcher: Arc<dyn JsonFetcher>,
    config: SocialConfig,
}

impl SocialMetricsCrawler {
    pub fn new(
        categories: Arc<dyn CategoryCatalog>,
        ranking: Arc<dyn RankingQuery>,
        items: Arc<dyn ItemStore>,
        fetcher: Arc<dyn JsonFetcher>,
        config: SocialConfig,
    ) -> Self {
        Self {
            categories,
            ranking,
            items,
            fetcher,
            config,
        }
    }

    /// Run one full crawl
    ///
    /// Only a failing category listing or ranking query aborts the crawl.
    pub async fn crawl(&self) -> Result<CrawlReport> {
        info!("Social counter crawl started");

        let categories: Vec<i64> = self
            .categories
            .list_categories()
            .await?
            .into_iter()
            .map(|category| category.id)
            .collect();

        let mut report = CrawlReport::default();
        let mut page = 0;
        loop {
            let query = ItemQuery {
                page,
                categories: categories.clone(),
                order: ItemOrder::Latest,
                window: RankingWindow::Week,
            };
            let items = self.ranking.top_items(&query).await?;
            report.pages += 1;

            if items.is_empty() {
                break;
            }

            for item in &items {
                let (twitter, facebook, linkedin) = tokio::join!(
                    self.refresh_counter(item, SocialProvider::Twitter),
                    self.refresh_counter(item, SocialProvider::Facebook),
                    self.refresh_counter(item, SocialProvider::Linkedin),
                );
                for outcome in [twitter, facebook, linkedin] {
                    report.record(outcome);
                }
                report.items += 1;
            }

            page += 1;
        }

        info!(
            "Social counter crawl finished: {} item(s) on {} page(s), {} updated, {} unchanged, {} failed",
            report.items,
            report.pages,
            report.updated,
            report.unchanged,
            report.failed
        );
        Ok(report)
    }

    /// Fetch one counter of one item from its provider
    pub async fn read_counter(&self, link: &str, provider: SocialProvider) -> Result<CounterReading> {
        let url = counter_url(self.config.endpoint(provider), link);
        let timeout = self.config.request_timeout();

        let body = tokio::time::timeout(timeout, self.fetcher.fetch_json(&url))
            .await
            .map_err(|_| {
                Error::timeout(format!("{} did not answer within {:?}", provider, timeout))
            })??;

        Ok(CounterReading {
            provider,
            value: parse_counter(provider, &body)?,
        })
    }

    async fn refresh_counter(&self, item: &ItemView, provider: SocialProvider) -> CounterOutcome {
        let result: Result<bool> = async {
            let reading = self.read_counter(&item.link, provider).await?;
            if reading.value == item.counter(provider) {
                return Ok(false);
            }
            self.items
                .set_counter(reading.provider, item.id, reading.value)
                .await?;
            debug!(
                "Item {} {} count {} -> {}",
                item.id,
                provider,
                item.counter(provider),
                reading.value
            );
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => CounterOutcome::Updated,
            Ok(false) => CounterOutcome::Unchanged,
            Err(e) => {
                warn!("{} counter for item {} skipped: {}", provider, item.id, e);
                CounterOutcome::Failed
            }
        }
    }
}

/// Provider URL for an item link
pub fn counter_url(endpoint: &str, link: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(link.as_bytes()).collect();
    format!("{}{}", endpoint, encoded)
}

/// Extract the counter from a provider response
///
/// A response without the numeric field is an error rather than zero, so a
/// malformed answer never overwrites a stored count.
pub fn parse_counter(provider: SocialProvider, body: &serde_json::Value) -> Result<u64> {
    let field = provider.response_field();
    body.get(field)
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            Error::provider(
                provider.name(),
                format!("response has no numeric '{}' field", field),
            )
        })
}

#[async_trait]
impl Job for SocialMetricsCrawler {
    fn name(&self) -> &'static str {
        "social"
    }

    async fn run(&self) -> Result<JobReport> {
        Ok(JobReport::Social(self.crawl().await?))
    }
}
