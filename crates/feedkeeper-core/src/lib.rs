// # feedkeeper-core
//
// Background job engine for an aggregated blog store.
//
// ## Architecture Overview
//
// Four independent jobs, each run by the scheduler on its own timer:
// - **AggregationRunner**: pull new items from every source, deduplicated
// - **RetentionSweeper**: delete old items nobody clicked
// - **DigestBuilder**: publish one "best of" digest per ISO week
// - **SocialMetricsCrawler**: refresh per-item social share counters
//
// Supporting pieces:
// - **week**: digest bucket computation (ISO-8601 weeks)
// - **dedup**: per-run link/title deduplication index
// - **traits**: store and network collaborator contracts
// - **registry** / **scheduler**: `(job, interval, initial_delay)` timers
// - **state**: in-memory catalog and JSON snapshot persistence
//
// ## Design Principles
//
// 1. **Contracts, not backends**: jobs only see the collaborator traits
// 2. **Isolation**: one failing source or provider never stops the rest of a run
// 3. **Idempotency**: the weekly digest is keyed by its bucket short name
// 4. **No shared run state**: the dedup index is rebuilt on every run

pub mod config;
pub mod dedup;
pub mod error;
pub mod jobs;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod traits;
pub mod week;

// Re-export core types for convenience
pub use config::{JobSchedule, KeeperConfig};
pub use dedup::{Admission, DeduplicationIndex};
pub use error::{Error, Result};
pub use jobs::{
    AggregationRunner, AggregationState, DigestBuilder, Job, JobReport, RetentionSweeper,
    SocialMetricsCrawler,
};
pub use registry::JobRegistry;
pub use scheduler::{Scheduler, SchedulerEvent};
pub use state::{MemoryCatalog, SnapshotFile};
pub use week::WeekBucket;
