//! Domain records shared by the jobs and the store collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered feed (usually a blog)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Aggregation flag. `None` and `Some(false)` mark primary sources,
    /// `Some(true)` marks mirrors that republish other sources' content.
    #[serde(default)]
    pub aggregator: Option<bool>,
}

impl Source {
    pub fn new(id: i64, name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            feed_url: feed_url.into(),
            category_id: None,
            aggregator: None,
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_aggregator(mut self, aggregator: bool) -> Self {
        self.aggregator = Some(aggregator);
        self
    }
}

/// A stored blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub source_id: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub link: String,
    pub title: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub click_count: u64,
    #[serde(default)]
    pub twitter_retweet_count: u64,
    #[serde(default)]
    pub facebook_share_count: u64,
    #[serde(default)]
    pub linkedin_share_count: u64,
}

impl Item {
    /// Stored value of one social counter
    pub fn counter(&self, provider: SocialProvider) -> u64 {
        match provider {
            SocialProvider::Twitter => self.twitter_retweet_count,
            SocialProvider::Facebook => self.facebook_share_count,
            SocialProvider::Linkedin => self.linkedin_share_count,
        }
    }

    pub(crate) fn set_counter(&mut self, provider: SocialProvider, value: u64) {
        match provider {
            SocialProvider::Twitter => self.twitter_retweet_count = value,
            SocialProvider::Facebook => self.facebook_share_count = value,
            SocialProvider::Linkedin => self.linkedin_share_count = value,
        }
    }

    pub fn view(&self) -> ItemView {
        ItemView {
            id: self.id,
            source_id: self.source_id,
            link: self.link.clone(),
            title: self.title.clone(),
            published: self.published,
            click_count: self.click_count,
            twitter_retweet_count: self.twitter_retweet_count,
            facebook_share_count: self.facebook_share_count,
            linkedin_share_count: self.linkedin_share_count,
        }
    }
}

/// An item about to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub source_id: i64,
    pub category_id: Option<i64>,
    pub link: String,
    pub title: String,
    pub published: DateTime<Utc>,
}

/// Ranking query projection of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: i64,
    pub source_id: i64,
    pub link: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub click_count: u64,
    pub twitter_retweet_count: u64,
    pub facebook_share_count: u64,
    pub linkedin_share_count: u64,
}

impl ItemView {
    pub fn counter(&self, provider: SocialProvider) -> u64 {
        match provider {
            SocialProvider::Twitter => self.twitter_retweet_count,
            SocialProvider::Facebook => self.facebook_share_count,
            SocialProvider::Linkedin => self.linkedin_share_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Singleton channel settings consulted when composing digest text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub channel_title: String,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            channel_title: "Feedkeeper".to_string(),
        }
    }
}

/// Weekly "best of" news entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestDocument {
    /// Assigned by the store on save
    #[serde(default)]
    pub id: Option<i64>,
    pub short_name: String,
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub published: DateTime<Utc>,
}

/// External service supplying a social engagement counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Twitter,
    Facebook,
    Linkedin,
}

impl SocialProvider {
    pub const ALL: [SocialProvider; 3] = [
        SocialProvider::Twitter,
        SocialProvider::Facebook,
        SocialProvider::Linkedin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SocialProvider::Twitter => "twitter",
            SocialProvider::Facebook => "facebook",
            SocialProvider::Linkedin => "linkedin",
        }
    }

    /// JSON field carrying the counter in the provider's response
    pub fn response_field(&self) -> &'static str {
        match self {
            SocialProvider::Twitter | SocialProvider::Linkedin => "count",
            SocialProvider::Facebook => "shares",
        }
    }
}

impl std::fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A counter value read from one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReading {
    pub provider: SocialProvider,
    pub value: u64,
}

/// Ordering of a ranking query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOrder {
    /// Newest first
    Latest,
    /// Highest click count first
    MostViewed,
}

/// Publication window of a ranking query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingWindow {
    Week,
    Month,
    All,
}

impl RankingWindow {
    pub fn duration(&self) -> Option<chrono::Duration> {
        match self {
            RankingWindow::Week => Some(chrono::Duration::days(7)),
            RankingWindow::Month => Some(chrono::Duration::days(30)),
            RankingWindow::All => None,
        }
    }
}

/// A paginated ranking query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub page: usize,
    /// Restrict to these categories; empty means every category
    pub categories: Vec<i64>,
    pub order: ItemOrder,
    pub window: RankingWindow,
}
