//! Background jobs
//!
//! Every job exposes a stateless [`Job::run`] invoked by the scheduler on
//! its own fixed-delay timer. Jobs never call each other; they only share
//! persisted data through the store collaborators.
//!
//! - [`AggregationRunner`]: refresh items from every source
//! - [`RetentionSweeper`]: purge old unclicked items
//! - [`DigestBuilder`]: publish the weekly best-of digest
//! - [`SocialMetricsCrawler`]: refresh social share counters

pub mod aggregation;
pub mod digest;
pub mod retention;
pub mod social;

pub use aggregation::{AggregationRunner, AggregationState};
pub use digest::DigestBuilder;
pub use retention::RetentionSweeper;
pub use social::{CrawlReport, SocialMetricsCrawler};

use async_trait::async_trait;

use crate::error::Result;
use crate::week::WeekBucket;

/// Summary of one completed job run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobReport {
    Aggregation {
        sources: usize,
        failed_sources: usize,
        inserted: usize,
    },
    Retention {
        scanned: usize,
        deleted: usize,
    },
    Digest {
        bucket: WeekBucket,
        created: bool,
    },
    Social(CrawlReport),
}

/// A unit of recurring background work
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used for registration, logging and manual triggers
    fn name(&self) -> &'static str;

    /// Execute one run
    ///
    /// An error aborts this run only; the scheduler logs it and the job
    /// runs again on its next tick.
    async fn run(&self) -> Result<JobReport>;
}
