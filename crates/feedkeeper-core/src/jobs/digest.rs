//! Weekly "best of" digest
//!
//! The digest for a bucket is identified by its short name
//! (`best-of-<week>-<year>`). The job fires far more often than once a week,
//! so every run first looks the short name up and does nothing when the
//! document already exists. Otherwise it renders one table per category
//! holding the five most viewed items of the past week and saves it once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::jobs::{Job, JobReport};
use crate::model::{Category, DigestDocument, ItemOrder, ItemQuery, ItemView, RankingWindow};
use crate::traits::{CategoryCatalog, DigestStore, RankingQuery, SettingsStore};
use crate::week::{self, WeekBucket};

/// Items listed per category
pub const TOP_ITEMS_PER_CATEGORY: usize = 5;

pub struct DigestBuilder {
    digests: Arc<dyn DigestStore>,
    categories: Arc<dyn CategoryCatalog>,
    settings: Arc<dyn SettingsStore>,
    ranking: Arc<dyn RankingQuery>,
    icon_base_path: String,
}

impl DigestBuilder {
    pub fn new(
        digests: Arc<dyn DigestStore>,
        categories: Arc<dyn CategoryCatalog>,
        settings: Arc<dyn SettingsStore>,
        ranking: Arc<dyn RankingQuery>,
    ) -> Self {
        Self {
            digests,
            categories,
            settings,
            ranking,
            icon_base_path: crate::config::DigestConfig::default().icon_base_path,
        }
    }

    pub fn with_icon_base_path(mut self, icon_base_path: impl Into<String>) -> Self {
        self.icon_base_path = icon_base_path.into();
        self
    }

    /// Publish the digest of the week preceding `now`, unless it exists
    pub async fn publish_for(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let bucket = week::previous_week(now)?;
        let short_name = bucket.short_name();

        if self.digests.find_by_short_name(&short_name).await?.is_some() {
            debug!("Digest {} already published", short_name);
            return Ok(JobReport::Digest {
                bucket,
                created: false,
            });
        }

        let document = self.compose(bucket, now).await?;
        let saved = self.digests.save(document).await?;
        info!(
            "Published digest {} (id {:?})",
            saved.short_name, saved.id
        );

        Ok(JobReport::Digest {
            bucket,
            created: true,
        })
    }

    async fn compose(&self, bucket: WeekBucket, now: DateTime<Utc>) -> Result<DigestDocument> {
        let channel = self.settings.current().await?.channel_title;

        let mut sections = Vec::new();
        for category in self.categories.list_categories().await? {
            let query = ItemQuery {
                page: 0,
                categories: vec![category.id],
                order: ItemOrder::MostViewed,
                window: RankingWindow::Week,
            };
            let mut items = self.ranking.top_items(&query).await?;
            items.truncate(TOP_ITEMS_PER_CATEGORY);
            sections.push((category, items));
        }

        Ok(DigestDocument {
            id: None,
            short_name: bucket.short_name(),
            title: format!(
                "{} Weekly: Best of {}/{}",
                channel, bucket.week, bucket.year
            ),
            short_description: format!(
                "Best of {}, year {}, week {}",
                channel, bucket.year, bucket.week
            ),
            description: render_body(&channel, &sections, &self.icon_base_path)?,
            published: now,
        })
    }
}

/// Render the HTML body of a digest
pub fn render_body(
    channel: &str,
    sections: &[(Category, Vec<ItemView>)],
    icon_base_path: &str,
) -> Result<String> {
    let fmt_err = |e: std::fmt::Error| Error::Other(format!("Failed to render digest: {}", e));
    let mut html = String::new();

    write!(
        html,
        "<p>{} brings you interesting news every day. Each week I select the best of:</p>",
        html_escape::encode_text(channel)
    )
    .map_err(fmt_err)?;

    for (category, items) in sections {
        write!(
            html,
            "<table class='table'><tr><td><h4>{}</h4></td></tr>",
            html_escape::encode_text(&category.name)
        )
        .map_err(fmt_err)?;

        for item in items.iter().take(TOP_ITEMS_PER_CATEGORY) {
            let icon = format!("{}{}", icon_base_path, item.source_id);
            write!(
                html,
                "<tr><td><a href='{}' target='_blank'>\
                 <img src='{}' style='float:left;padding-right:5px;height:30px' />{}</a></td></tr>",
                html_escape::encode_single_quoted_attribute(&item.link),
                html_escape::encode_single_quoted_attribute(&icon),
                html_escape::encode_text(&item.title)
            )
            .map_err(fmt_err)?;
        }

        html.push_str("</table>");
    }

    Ok(html)
}

#[async_trait]
impl Job for DigestBuilder {
    fn name(&self) -> &'static str {
        "digest"
    }

    async fn run(&self) -> Result<JobReport> {
        self.publish_for(Utc::now()).await
    }
}
