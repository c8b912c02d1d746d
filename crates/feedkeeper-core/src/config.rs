//! Configuration types for feedkeeper
//!
//! This module defines the job cadence and per-job settings. Loading them
//! (environment, files) is left to the embedding binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main feedkeeper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Trigger cadence of every job
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Retention sweep settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Weekly digest settings
    #[serde(default)]
    pub digest: DigestConfig,

    /// Social counter crawl settings
    #[serde(default)]
    pub social: SocialConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl KeeperConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.jobs.aggregation.validate("aggregation")?;
        self.jobs.retention.validate("retention")?;
        self.jobs.digest.validate("digest")?;
        self.jobs.social.validate("social")?;

        if self.retention.max_age_days == 0 {
            return Err(crate::Error::config("Retention max_age_days must be > 0"));
        }

        self.social.validate()?;

        if self.scheduler.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Scheduler event_channel_capacity must be > 0",
            ));
        }

        Ok(())
    }
}

/// Cadence of the four background jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "JobSchedule::hourly")]
    pub aggregation: JobSchedule,

    #[serde(default = "JobSchedule::daily_after_half_day")]
    pub retention: JobSchedule,

    #[serde(default = "JobSchedule::hourly_digest")]
    pub digest: JobSchedule,

    #[serde(default = "JobSchedule::hourly_social")]
    pub social: JobSchedule,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            aggregation: JobSchedule::hourly(),
            retention: JobSchedule::daily_after_half_day(),
            digest: JobSchedule::hourly_digest(),
            social: JobSchedule::hourly_social(),
        }
    }
}

/// Fixed-delay trigger of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSchedule {
    /// Whether the job is registered at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Delay between the end of one run and the start of the next (in seconds)
    pub interval_secs: u64,

    /// Delay before the first run (in seconds)
    #[serde(default)]
    pub initial_delay_secs: u64,
}

impl JobSchedule {
    pub fn new(interval_secs: u64, initial_delay_secs: u64) -> Self {
        Self {
            enabled: true,
            interval_secs,
            initial_delay_secs,
        }
    }

    /// Enable or disable the job
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    fn hourly() -> Self {
        Self::new(60 * 60, 0)
    }

    fn daily_after_half_day() -> Self {
        Self::new(60 * 60 * 24, 60 * 60 * 12)
    }

    fn hourly_digest() -> Self {
        Self::new(60 * 60, 2)
    }

    fn hourly_social() -> Self {
        Self::new(60 * 60, 1)
    }

    fn validate(&self, job: &str) -> Result<(), crate::Error> {
        if self.enabled && self.interval_secs == 0 {
            return Err(crate::Error::config(format!(
                "Job '{}' interval must be > 0",
                job
            )));
        }
        Ok(())
    }
}

/// Retention sweep settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Unclicked items older than this are deleted
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl RetentionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_age_days))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

/// Weekly digest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Path prefix of source icons; the source id is appended
    #[serde(default = "default_icon_base_path")]
    pub icon_base_path: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            icon_base_path: default_icon_base_path(),
        }
    }
}

/// Social counter crawl settings
///
/// Endpoints are URL prefixes; the percent-encoded item link is appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Deadline of every provider call (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_twitter_endpoint")]
    pub twitter_endpoint: String,

    #[serde(default = "default_facebook_endpoint")]
    pub facebook_endpoint: String,

    #[serde(default = "default_linkedin_endpoint")]
    pub linkedin_endpoint: String,
}

impl SocialConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint prefix of a provider
    pub fn endpoint(&self, provider: crate::model::SocialProvider) -> &str {
        use crate::model::SocialProvider;
        match provider {
            SocialProvider::Twitter => &self.twitter_endpoint,
            SocialProvider::Facebook => &self.facebook_endpoint,
            SocialProvider::Linkedin => &self.linkedin_endpoint,
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config(
                "Social request_timeout_secs must be > 0",
            ));
        }
        for provider in crate::model::SocialProvider::ALL {
            if self.endpoint(provider).is_empty() {
                return Err(crate::Error::config(format!(
                    "Social endpoint for {} cannot be empty",
                    provider
                )));
            }
        }
        Ok(())
    }
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            twitter_endpoint: default_twitter_endpoint(),
            facebook_endpoint: default_facebook_endpoint(),
            linkedin_endpoint: default_linkedin_endpoint(),
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_age_days() -> u32 {
    90
}

fn default_icon_base_path() -> String {
    "/icon/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_twitter_endpoint() -> String {
    "https://cdn.api.twitter.com/1/urls/count.json?url=".to_string()
}

fn default_facebook_endpoint() -> String {
    "https://graph.facebook.com/?id=".to_string()
}

fn default_linkedin_endpoint() -> String {
    "https://www.linkedin.com/countserv/count/share?format=json&url=".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}
