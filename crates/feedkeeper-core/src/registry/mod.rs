//! Job registry
//!
//! The registry holds `(job, interval, initial_delay)` entries that the
//! [`Scheduler`](crate::scheduler::Scheduler) turns into timers. Jobs are
//! registered explicitly instead of being discovered, and each name may be
//! registered once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedkeeper_core::registry::JobRegistry;
//!
//! let mut registry = JobRegistry::new();
//! registry.register_scheduled(Arc::new(aggregation_runner), &config.jobs.aggregation)?;
//! registry.register_scheduled(Arc::new(digest_builder), &config.jobs.digest)?;
//!
//! let (scheduler, events) = Scheduler::new(registry, &config.scheduler)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::JobSchedule;
use crate::error::{Error, Result};
use crate::jobs::Job;

/// A job together with its fixed-delay trigger
#[derive(Clone)]
pub struct ScheduledJob {
    pub job: Arc<dyn Job>,
    pub interval: Duration,
    pub initial_delay: Duration,
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("job", &self.job.name())
            .field("interval", &self.interval)
            .field("initial_delay", &self.initial_delay)
            .finish()
    }
}

/// Ordered set of scheduled jobs
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<ScheduledJob>,
}

impl JobRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job
    ///
    /// # Parameters
    ///
    /// - `job`: the job to run
    /// - `interval`: delay between the end of one run and the next start
    /// - `initial_delay`: delay before the first run
    ///
    /// # Returns
    ///
    /// - `Ok(())`: registered
    /// - `Err(Error)`: the name is taken or the interval is zero
    pub fn register(
        &mut self,
        job: Arc<dyn Job>,
        interval: Duration,
        initial_delay: Duration,
    ) -> Result<()> {
        let name = job.name();
        if self.has_job(name) {
            return Err(Error::config(format!("Job '{}' registered twice", name)));
        }
        if interval.is_zero() {
            return Err(Error::config(format!("Job '{}' interval must be > 0", name)));
        }

        self.jobs.push(ScheduledJob {
            job,
            interval,
            initial_delay,
        });
        Ok(())
    }

    /// Register a job from its configured schedule
    ///
    /// Disabled schedules are skipped.
    ///
    /// # Returns
    ///
    /// `true` if the job was registered, `false` if it is disabled
    pub fn register_scheduled(&mut self, job: Arc<dyn Job>, schedule: &JobSchedule) -> Result<bool> {
        if !schedule.enabled {
            tracing::info!("Job '{}' disabled, not scheduling", job.name());
            return Ok(false);
        }
        self.register(job, schedule.interval(), schedule.initial_delay())?;
        Ok(true)
    }

    /// Check if a job name is registered
    pub fn has_job(&self, name: &str) -> bool {
        self.jobs.iter().any(|entry| entry.job.name() == name)
    }

    /// Registered job names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|entry| entry.job.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn into_jobs(self) -> Vec<ScheduledJob> {
        self.jobs
    }
}
