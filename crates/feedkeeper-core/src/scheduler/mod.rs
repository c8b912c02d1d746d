//! Job scheduler
//!
//! The Scheduler is responsible for:
//! - Running every registered job on its own fixed-delay timer
//! - Rejecting overlapping runs of the same job
//! - Containing job failures so the next tick retries
//! - Stopping every timer deterministically on shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ JobRegistry  │── (job, interval, initial_delay) ──┐
//! └──────────────┘                                     │
//!                                                      ▼
//!                                             ┌──────────────┐
//!                                             │  Scheduler   │
//!                                             └──────────────┘
//!                                                      │
//!          ┌─────────────────┬─────────────────┬───────┴─────────┐
//!          ▼                 ▼                 ▼                 ▼
//!   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//!   │ aggregation │   │  retention  │   │   digest    │   │   social    │
//!   │   timer     │   │   timer     │   │   timer     │   │   timer     │
//!   └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Timer Semantics
//!
//! 1. Wait `initial_delay`
//! 2. Run the job (guarded: a run already in progress means skip); an error
//!    or a panic fails this run only
//! 3. Sleep `interval` after the run completes
//! 4. Repeat until shutdown

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::jobs::{Job, JobReport};
use crate::registry::JobRegistry;

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started
    Started { jobs_count: usize },

    /// A job run started
    JobStarted { job: &'static str },

    /// A job run completed
    JobSucceeded {
        job: &'static str,
        report: JobReport,
    },

    /// A job run failed; the job stays scheduled
    JobFailed { job: &'static str, error: String },

    /// A run was skipped because the previous one is still in progress
    JobSkipped { job: &'static str },

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Runtime slot of one registered job
struct JobSlot {
    job: Arc<dyn Job>,
    interval: Duration,
    initial_delay: Duration,
    /// Non-reentrant run guard
    running: Mutex<()>,
}

/// Fixed-delay job scheduler
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`] from a [`JobRegistry`]
/// 2. Start with [`Scheduler::run()`]
/// 3. Timers run until a shutdown signal is received
/// 4. Every timer task is aborted and joined before `run` returns
///
/// ## Load Resistance
///
/// - **Run guard**: a job never overlaps itself, even with manual triggers
/// - **Bounded event channel**: events are dropped (logged) when full
pub struct Scheduler {
    slots: Vec<Arc<JobSlot>>,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        registry: JobRegistry,
        config: &SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        if config.event_channel_capacity == 0 {
            return Err(Error::config("Scheduler event_channel_capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let slots = registry
            .into_jobs()
            .into_iter()
            .map(|entry| {
                Arc::new(JobSlot {
                    job: entry.job,
                    interval: entry.interval,
                    initial_delay: entry.initial_delay,
                    running: Mutex::new(()),
                })
            })
            .collect();

        Ok((Self { slots, event_tx: tx }, rx))
    }

    /// Names of the scheduled jobs
    pub fn job_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|slot| slot.job.name()).collect()
    }

    /// Run every job until SIGINT
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run every job until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// With `None` this behaves like [`Scheduler::run()`].
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        emit_event(
            &self.event_tx,
            SchedulerEvent::Started {
                jobs_count: self.slots.len(),
            },
        );

        let mut timers = JoinSet::new();
        for slot in &self.slots {
            info!(
                "Scheduling job '{}' every {:?} (initial delay {:?})",
                slot.job.name(),
                slot.interval,
                slot.initial_delay
            );
            timers.spawn(job_timer(Arc::clone(slot), self.event_tx.clone()));
        }

        let waited = match shutdown_rx {
            // Test mode: a dropped sender counts as shutdown too
            Some(rx) => {
                let _ = rx.await;
                Ok(())
            }
            None => tokio::signal::ctrl_c().await,
        };
        info!("Shutdown signal received");

        timers.abort_all();
        while timers.join_next().await.is_some() {}

        emit_event(
            &self.event_tx,
            SchedulerEvent::Stopped {
                reason: "Shutdown signal".to_string(),
            },
        );
        info!("All job timers stopped");

        waited.map_err(Error::from)
    }

    /// Run a job immediately, outside its timer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(report))`: the run completed
    /// - `Ok(None)`: skipped, a run of this job is already in progress
    /// - `Err(Error)`: unknown job, or the run failed
    pub async fn trigger(&self, job_name: &str) -> Result<Option<JobReport>> {
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.job.name() == job_name)
            .ok_or_else(|| Error::not_found(format!("Unknown job: {}", job_name)))?;

        execute(slot, &self.event_tx).await.transpose()
    }
}

/// Timer loop of one job
async fn job_timer(slot: Arc<JobSlot>, event_tx: mpsc::Sender<SchedulerEvent>) {
    tokio::time::sleep(slot.initial_delay).await;
    loop {
        // Failures are already logged and reported as events
        let _ = execute(&slot, &event_tx).await;
        tokio::time::sleep(slot.interval).await;
    }
}

/// Execute one guarded run
///
/// Returns `None` when the run was skipped because another run holds the guard.
async fn execute(slot: &JobSlot, event_tx: &mpsc::Sender<SchedulerEvent>) -> Option<Result<JobReport>> {
    let name = slot.job.name();
    let Ok(_guard) = slot.running.try_lock() else {
        warn!("Job '{}' still running, skipping this run", name);
        emit_event(event_tx, SchedulerEvent::JobSkipped { job: name });
        return None;
    };

    debug!("Job '{}' started", name);
    emit_event(event_tx, SchedulerEvent::JobStarted { job: name });

    let result = match AssertUnwindSafe(slot.job.run()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Other(format!(
            "job panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    match result {
        Ok(report) => {
            debug!("Job '{}' finished: {:?}", name, report);
            emit_event(
                event_tx,
                SchedulerEvent::JobSucceeded {
                    job: name,
                    report: report.clone(),
                },
            );
            Some(Ok(report))
        }
        Err(e) => {
            error!("Job '{}' failed: {}", name, e);
            emit_event(
                event_tx,
                SchedulerEvent::JobFailed {
                    job: name,
                    error: e.to_string(),
                },
            );
            Some(Err(e))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// Emit a scheduler event without blocking
fn emit_event(event_tx: &mpsc::Sender<SchedulerEvent>, event: SchedulerEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
        // Nobody is listening
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
