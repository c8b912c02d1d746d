// # feedkeeperd - Feedkeeper Daemon
//
// Thin integration layer: all job logic lives in feedkeeper-core, all
// network access in feedkeeper-http. The daemon:
// 1. Reads configuration from environment variables
// 2. Loads the catalog snapshot
// 3. Registers the four jobs and runs the scheduler
// 4. Writes the snapshot after every successful job and on shutdown
//
// ## Configuration
//
// ### Storage
// - `FEEDKEEPER_SNAPSHOT_PATH`: catalog snapshot file (default `/var/lib/feedkeeper/catalog.json`)
//
// ### Jobs
// - `FEEDKEEPER_<JOB>_ENABLED`: `false` disables a job (JOB = AGGREGATION, RETENTION, DIGEST, SOCIAL)
// - `FEEDKEEPER_<JOB>_INTERVAL_SECS`: delay between the end of one run and the next
// - `FEEDKEEPER_<JOB>_INITIAL_DELAY_SECS`: delay before the first run
//
// ### Job settings
// - `FEEDKEEPER_RETENTION_MAX_AGE_DAYS`: unclicked items older than this are deleted
// - `FEEDKEEPER_DIGEST_ICON_BASE_PATH`: icon URL prefix used in digests
// - `FEEDKEEPER_SOCIAL_TIMEOUT_SECS`: deadline of each social provider call
// - `FEEDKEEPER_FEED_TIMEOUT_SECS`: deadline of each feed download
//
// ### Logging
// - `FEEDKEEPER_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export FEEDKEEPER_SNAPSHOT_PATH=/var/lib/feedkeeper/catalog.json
// export FEEDKEEPER_SOCIAL_ENABLED=false
// export FEEDKEEPER_LOG_LEVEL=debug
//
// feedkeeperd
// ```

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use feedkeeper_core::config::{JobSchedule, KeeperConfig};
use feedkeeper_core::jobs::{AggregationRunner, DigestBuilder, RetentionSweeper, SocialMetricsCrawler};
use feedkeeper_core::registry::JobRegistry;
use feedkeeper_core::scheduler::{Scheduler, SchedulerEvent};
use feedkeeper_core::state::{MemoryCatalog, SnapshotFile};
use feedkeeper_http::{HttpJsonFetcher, RssItemSaver};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for the scheduler to stop its timers
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes, following systemd conventions
#[derive(Debug, Clone, Copy)]
enum KeeperExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<KeeperExitCode> for ExitCode {
    fn from(code: KeeperExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
#[derive(Debug)]
struct Config {
    snapshot_path: PathBuf,
    feed_timeout_secs: u64,
    log_level: String,
    keeper: KeeperConfig,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut keeper = KeeperConfig::default();

        schedule_from_env("AGGREGATION", &mut keeper.jobs.aggregation)?;
        schedule_from_env("RETENTION", &mut keeper.jobs.retention)?;
        schedule_from_env("DIGEST", &mut keeper.jobs.digest)?;
        schedule_from_env("SOCIAL", &mut keeper.jobs.social)?;

        if let Some(days) = env_parse("FEEDKEEPER_RETENTION_MAX_AGE_DAYS")? {
            keeper.retention.max_age_days = days;
        }
        if let Ok(path) = env::var("FEEDKEEPER_DIGEST_ICON_BASE_PATH") {
            keeper.digest.icon_base_path = path;
        }
        if let Some(secs) = env_parse("FEEDKEEPER_SOCIAL_TIMEOUT_SECS")? {
            keeper.social.request_timeout_secs = secs;
        }

        Ok(Self {
            snapshot_path: env::var("FEEDKEEPER_SNAPSHOT_PATH")
                .unwrap_or_else(|_| "/var/lib/feedkeeper/catalog.json".to_string())
                .into(),
            feed_timeout_secs: env_parse("FEEDKEEPER_FEED_TIMEOUT_SECS")?.unwrap_or(30),
            log_level: env::var("FEEDKEEPER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            keeper,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.keeper.validate()?;

        if self.snapshot_path.as_os_str().is_empty() {
            anyhow::bail!("FEEDKEEPER_SNAPSHOT_PATH cannot be empty");
        }

        if !(1..=600).contains(&self.feed_timeout_secs) {
            anyhow::bail!(
                "FEEDKEEPER_FEED_TIMEOUT_SECS must be between 1 and 600 seconds. Got: {}",
                self.feed_timeout_secs
            );
        }

        if !(1..=120).contains(&self.keeper.social.request_timeout_secs) {
            anyhow::bail!(
                "FEEDKEEPER_SOCIAL_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.keeper.social.request_timeout_secs
            );
        }

        let schedules = [
            &self.keeper.jobs.aggregation,
            &self.keeper.jobs.retention,
            &self.keeper.jobs.digest,
            &self.keeper.jobs.social,
        ];
        if schedules.iter().all(|schedule| !schedule.enabled) {
            anyhow::bail!("Every job is disabled; nothing to run");
        }

        parse_level(&self.log_level)?;
        Ok(())
    }
}

/// Read an optional, typed environment variable
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

/// Override a job schedule from `FEEDKEEPER_<JOB>_*`
fn schedule_from_env(job: &str, schedule: &mut JobSchedule) -> Result<()> {
    if let Some(enabled) = env_parse(&format!("FEEDKEEPER_{}_ENABLED", job))? {
        schedule.enabled = enabled;
    }
    if let Some(secs) = env_parse(&format!("FEEDKEEPER_{}_INTERVAL_SECS", job))? {
        schedule.interval_secs = secs;
    }
    if let Some(secs) = env_parse(&format!("FEEDKEEPER_{}_INITIAL_DELAY_SECS", job))? {
        schedule.initial_delay_secs = secs;
    }
    Ok(())
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "FEEDKEEPER_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return KeeperExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return KeeperExitCode::ConfigError.into();
    }

    let log_level = parse_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return KeeperExitCode::ConfigError.into();
    }

    info!("Starting feedkeeperd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return KeeperExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            KeeperExitCode::RuntimeError
        } else {
            KeeperExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until SIGTERM or SIGINT
async fn run_daemon(config: Config) -> Result<()> {
    let snapshot = SnapshotFile::new(&config.snapshot_path);
    let catalog = MemoryCatalog::from_data(
        snapshot
            .load()
            .await
            .with_context(|| format!("loading {}", config.snapshot_path.display()))?,
    );
    info!(
        "Catalog loaded from {}: {} item(s)",
        config.snapshot_path.display(),
        catalog.item_count().await
    );

    let registry = build_registry(&config, &catalog)?;
    info!("Scheduling job(s): {}", registry.names().join(", "));

    let (scheduler, events) = Scheduler::new(registry, &config.keeper.scheduler)?;
    let persister = tokio::spawn(persist_on_success(events, catalog.clone(), snapshot.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_task =
        tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await {
        Ok(joined) => joined.context("scheduler task panicked")??,
        Err(_) => anyhow::bail!("Scheduler did not stop within {:?}", SHUTDOWN_TIMEOUT),
    }

    // The scheduler owned the last event sender
    persister.await.context("snapshot task panicked")?;

    snapshot.save(&catalog.snapshot().await).await?;
    info!("Catalog saved to {}", config.snapshot_path.display());
    Ok(())
}

/// Wire the four jobs against the catalog and the HTTP collaborators
fn build_registry(config: &Config, catalog: &MemoryCatalog) -> Result<JobRegistry> {
    let keeper = &config.keeper;
    let store = Arc::new(catalog.clone());

    let saver = RssItemSaver::new(store.clone(), Duration::from_secs(config.feed_timeout_secs))?;
    let fetcher = HttpJsonFetcher::new(keeper.social.request_timeout())?;

    let aggregation = AggregationRunner::new(
        store.clone(),
        store.clone(),
        Arc::new(saver),
        store.clone(),
    );
    let retention = RetentionSweeper::new(store.clone(), store.clone(), keeper.retention.max_age());
    let digest = DigestBuilder::new(store.clone(), store.clone(), store.clone(), store.clone())
        .with_icon_base_path(keeper.digest.icon_base_path.clone());
    let social = SocialMetricsCrawler::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(fetcher),
        keeper.social.clone(),
    );

    let mut registry = JobRegistry::new();
    registry.register_scheduled(Arc::new(aggregation), &keeper.jobs.aggregation)?;
    registry.register_scheduled(Arc::new(retention), &keeper.jobs.retention)?;
    registry.register_scheduled(Arc::new(digest), &keeper.jobs.digest)?;
    registry.register_scheduled(Arc::new(social), &keeper.jobs.social)?;
    Ok(registry)
}

/// Consume scheduler events, saving the catalog after every successful run
async fn persist_on_success(
    mut events: mpsc::Receiver<SchedulerEvent>,
    catalog: MemoryCatalog,
    snapshot: SnapshotFile,
) {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::JobSucceeded { job, report } => {
                info!("Job '{}' succeeded: {:?}", job, report);
                if let Err(e) = snapshot.save(&catalog.snapshot().await).await {
                    warn!("Failed to save catalog after '{}': {}", job, e);
                }
            }
            SchedulerEvent::JobFailed { job, error } => {
                warn!("Job '{}' failed, next run on schedule: {}", job, error);
            }
            other => debug!("Scheduler event: {:?}", other),
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for SIGINT
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
