//! Periodic refresh of the published snapshots.
//!
//! Every sampler runs on its own task: poll immediately, then wait for the
//! next tick, a refresh request or cancellation. A successful poll replaces
//! the sampler's `watch` slot with a new `Arc`; a failed one leaves the slot
//! alone and only updates the sampler's [`SourceHealth`]. Readers therefore
//! always get a whole snapshot, and a flaky `squeue` never blanks the view.
//!
//! At most one provider call per sampler is outstanding. A tick or request
//! that arrives while a poll is still running is dropped and counted, not
//! queued.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::SampleError;
use crate::models::{Config, HostInfo, JobRecord, PartitionRecord, RefreshConfig, Snapshot};
use crate::sampler::{InfoSampler, JobSampler, PartitionSampler, Sampler};
use crate::slurm::SlurmSource;

/// How long `shutdown` waits for tasks before abandoning them
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// The independently refreshed data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Info,
    Partitions,
    Jobs,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Info => write!(f, "info"),
            Source::Partitions => write!(f, "partitions"),
            Source::Jobs => write!(f, "jobs"),
        }
    }
}

/// Staleness bookkeeping for one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHealth {
    /// Consecutive failed polls since the last success
    pub failed_polls: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Local>>,
    /// Ticks and requests dropped because a poll was already running
    pub skipped: u64,
}

impl SourceHealth {
    /// True when the published snapshot is older than the latest poll attempt
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.failed_polls > 0
    }

    /// Age of the published snapshot while stale, `None` when fresh or never loaded
    #[must_use]
    pub fn stale_for(&self, now: DateTime<Local>) -> Option<Duration> {
        if !self.is_stale() {
            return None;
        }
        self.last_success
            .map(|at| (now - at).to_std().unwrap_or_default())
    }
}

/// Result of a poll that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was published
    Published,
    /// Another poll of the same sampler was running
    Skipped,
}

/// Resets the in-flight flag however the poll ends (including cancellation)
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One sampler together with its published slot and health
struct Feed<P: Sampler> {
    sampler: P,
    slot: watch::Sender<Arc<P::Output>>,
    health: watch::Sender<SourceHealth>,
    in_flight: AtomicBool,
    wake: Notify,
}

impl<P: Sampler> Feed<P> {
    fn new(sampler: P, initial: P::Output) -> Self {
        Self {
            sampler,
            slot: watch::Sender::new(Arc::new(initial)),
            health: watch::Sender::new(SourceHealth::default()),
            in_flight: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    fn record_skipped(&self, count: u64, why: &str) {
        self.health.send_modify(|h| h.skipped += count);
        tracing::debug!(source = P::NAME, count, "{why}, skipping");
    }

    async fn poll(&self) -> Result<PollOutcome, SampleError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            self.record_skipped(1, "previous poll still running");
            return Ok(PollOutcome::Skipped);
        }
        let guard = InFlight(&self.in_flight);
        let result = self.sampler.poll().await;
        // Released before publishing so a woken reader can request again
        drop(guard);

        match result {
            Ok(output) => {
                self.slot.send_replace(Arc::new(output));
                self.health.send_modify(|h| {
                    h.failed_polls = 0;
                    h.last_error = None;
                    h.last_success = Some(Local::now());
                });
                tracing::trace!(source = P::NAME, "published snapshot");
                Ok(PollOutcome::Published)
            }
            Err(e) => {
                self.health.send_modify(|h| {
                    h.failed_polls = h.failed_polls.saturating_add(1);
                    h.last_error = Some(e.to_string());
                });
                tracing::warn!(source = P::NAME, error = %e, "poll failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Ask the task for an immediate poll. Dropped if one is running.
    fn request(&self) -> bool {
        if self.in_flight.load(Ordering::Acquire) {
            self.record_skipped(1, "refresh requested while polling");
            return false;
        }
        self.wake.notify_one();
        true
    }
}

/// Poll loop of one sampler. `period == None` polls only on request.
async fn run_feed<P: Sampler>(
    feed: Arc<Feed<P>>,
    period: Option<Duration>,
    cancel: CancellationToken,
) {
    let mut ticker = period.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        (ticker, period)
    });

    loop {
        let started = Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = feed.poll() => {}
        }

        // Ticks that fell due while the provider was running are dropped
        if let Some((ticker, period)) = ticker.as_mut() {
            let took = started.elapsed();
            if took >= *period {
                let missed = (took.as_millis() / period.as_millis().max(1)) as u64;
                feed.record_skipped(missed, "tick fell due while polling");
                ticker.reset();
            }
        }

        let next_tick = async {
            match ticker.as_mut() {
                Some((ticker, _)) => {
                    ticker.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = next_tick => {}
            _ = feed.wake.notified() => {}
        }
    }

    tracing::debug!(source = P::NAME, "refresh task stopped");
}

/// Owns the samplers, their published snapshots and the refresh tasks.
pub struct RefreshCoordinator<S: SlurmSource> {
    info: Arc<Feed<InfoSampler<S>>>,
    partitions: Arc<Feed<PartitionSampler<S>>>,
    jobs: Arc<Feed<JobSampler<S>>>,
    refresh: RefreshConfig,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: SlurmSource> RefreshCoordinator<S> {
    /// Build the samplers without starting any task. Snapshots start empty.
    pub fn new(source: Arc<S>, config: &Config) -> Self {
        let partitions = PartitionSampler::new(Arc::clone(&source))
            .with_limit(config.display.max_partitions);
        let jobs = JobSampler::new(Arc::clone(&source)).with_limit(config.display.max_jobs);

        Self {
            info: Arc::new(Feed::new(InfoSampler::new(source), HostInfo::default())),
            partitions: Arc::new(Feed::new(partitions, Snapshot::empty())),
            jobs: Arc::new(Feed::new(jobs, Snapshot::empty())),
            refresh: config.refresh.clone(),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Spawn the periodic tasks. Each polls once right away.
    ///
    /// Must be called from within a tokio runtime; calling it twice is a no-op.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }
        tracing::info!(
            info = self.refresh.info_interval,
            partitions = self.refresh.partitions_interval,
            jobs = self.refresh.jobs_interval,
            "starting refresh tasks"
        );

        self.tasks.push(tokio::spawn(run_feed(
            Arc::clone(&self.info),
            Some(self.refresh.info_period()),
            self.cancel.clone(),
        )));
        self.tasks.push(tokio::spawn(run_feed(
            Arc::clone(&self.partitions),
            Some(self.refresh.partitions_period()),
            self.cancel.clone(),
        )));
        self.tasks.push(tokio::spawn(run_feed(
            Arc::clone(&self.jobs),
            self.refresh.jobs_period(),
            self.cancel.clone(),
        )));
    }

    /// Latest partition snapshot
    #[must_use]
    pub fn partitions(&self) -> Arc<Snapshot<PartitionRecord>> {
        Arc::clone(&self.partitions.slot.borrow())
    }

    /// Latest job snapshot
    #[must_use]
    pub fn jobs(&self) -> Arc<Snapshot<JobRecord>> {
        Arc::clone(&self.jobs.slot.borrow())
    }

    /// Latest info line contents
    #[must_use]
    pub fn info(&self) -> Arc<HostInfo> {
        Arc::clone(&self.info.slot.borrow())
    }

    pub fn subscribe_partitions(&self) -> watch::Receiver<Arc<Snapshot<PartitionRecord>>> {
        self.partitions.slot.subscribe()
    }

    pub fn subscribe_jobs(&self) -> watch::Receiver<Arc<Snapshot<JobRecord>>> {
        self.jobs.slot.subscribe()
    }

    pub fn subscribe_info(&self) -> watch::Receiver<Arc<HostInfo>> {
        self.info.slot.subscribe()
    }

    #[must_use]
    pub fn health(&self, source: Source) -> SourceHealth {
        match source {
            Source::Info => self.info.health.borrow().clone(),
            Source::Partitions => self.partitions.health.borrow().clone(),
            Source::Jobs => self.jobs.health.borrow().clone(),
        }
    }

    /// Wake a source's task for an immediate poll.
    ///
    /// Returns false when the request was dropped because a poll is running.
    pub fn refresh_now(&self, source: Source) -> bool {
        match source {
            Source::Info => self.info.request(),
            Source::Partitions => self.partitions.request(),
            Source::Jobs => self.jobs.request(),
        }
    }

    pub fn refresh_all(&self) {
        for source in [Source::Info, Source::Partitions, Source::Jobs] {
            self.refresh_now(source);
        }
    }

    /// Poll a source on the caller's task and publish the result.
    ///
    /// Shares the in-flight guard with the periodic task, so it returns
    /// `Skipped` rather than starting a second provider call.
    ///
    /// # Errors
    /// The sampler's error; the previous snapshot stays published.
    pub async fn poll_once(&self, source: Source) -> Result<PollOutcome, SampleError> {
        match source {
            Source::Info => self.info.poll().await,
            Source::Partitions => self.partitions.poll().await,
            Source::Jobs => self.jobs.poll().await,
        }
    }

    /// Cancel the tasks and wait briefly for them to finish.
    ///
    /// Provider calls still running are killed; nothing is published after
    /// cancellation.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        let tasks = futures::future::join_all(self.tasks);
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, tasks).await.is_err() {
            tracing::warn!("refresh tasks did not stop within {:?}", SHUTDOWN_TIMEOUT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    const SUMMARY: &str = "cpu_p1 up 5-00:00:00 40/10/0/50 node[001-050]\n";

    const QUEUE: &str = r#"{"jobs": [
        {"job_id": 7, "partition": "cpu_p1", "name": "md", "user_name": "alice",
         "job_state": ["RUNNING"], "node_count": 1, "nodes": "node001",
         "priority": 10, "start_time": 0}
    ]}"#;

    fn on_demand_config() -> Config {
        let mut config = Config::default();
        config.refresh.jobs_interval = 0;
        config
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_snapshot() {
        let source = Arc::new(FakeSource::new().with_partitions(SUMMARY));
        let coordinator = RefreshCoordinator::new(Arc::clone(&source), &Config::default());

        assert!(coordinator.partitions().is_empty());
        assert_eq!(
            coordinator.poll_once(Source::Partitions).await,
            Ok(PollOutcome::Published)
        );
        let published = coordinator.partitions();
        assert_eq!(published.records[0].usage_ratio, 80.0);
        assert!(!coordinator.health(Source::Partitions).is_stale());

        source.fail_partitions(SampleError::unavailable("sinfo -s -h", "exit code 1"));
        assert!(coordinator.poll_once(Source::Partitions).await.is_err());
        assert!(coordinator.poll_once(Source::Partitions).await.is_err());

        assert!(Arc::ptr_eq(&published, &coordinator.partitions()));
        let health = coordinator.health(Source::Partitions);
        assert_eq!(health.failed_polls, 2);
        assert!(health.last_error.as_deref().unwrap().contains("exit code 1"));
        assert!(health.last_success.is_some());
        assert!(health.stale_for(Local::now()).is_some());

        source.set_partitions(SUMMARY);
        coordinator.poll_once(Source::Partitions).await.unwrap();
        let health = coordinator.health(Source::Partitions);
        assert_eq!(health.failed_polls, 0);
        assert_eq!(health.last_error, None);
        assert!(!Arc::ptr_eq(&published, &coordinator.partitions()));
    }

    #[tokio::test]
    async fn test_failure_before_first_success() {
        let source = Arc::new(FakeSource::new());
        source.fail_jobs(SampleError::malformed("squeue --json", "expected value"));
        let coordinator = RefreshCoordinator::new(Arc::clone(&source), &Config::default());

        assert!(coordinator.poll_once(Source::Jobs).await.is_err());
        assert!(coordinator.jobs().is_empty());
        let health = coordinator.health(Source::Jobs);
        assert!(health.is_stale());
        assert_eq!(health.stale_for(Local::now()), None);
    }

    #[tokio::test]
    async fn test_overlapping_poll_is_skipped() {
        let source = Arc::new(
            FakeSource::new()
                .with_jobs(QUEUE)
                .with_delay(Duration::from_millis(200)),
        );
        let coordinator = RefreshCoordinator::new(Arc::clone(&source), &Config::default());

        let (first, second) = tokio::join!(
            coordinator.poll_once(Source::Jobs),
            coordinator.poll_once(Source::Jobs)
        );
        assert_eq!(first, Ok(PollOutcome::Published));
        assert_eq!(second, Ok(PollOutcome::Skipped));
        assert_eq!(source.job_calls(), 1);
        assert_eq!(coordinator.health(Source::Jobs).skipped, 1);
        assert_eq!(coordinator.jobs().len(), 1);

        // The guard is released once the poll completes
        assert_eq!(
            coordinator.poll_once(Source::Jobs).await,
            Ok(PollOutcome::Published)
        );
        assert_eq!(source.job_calls(), 2);
    }

    #[tokio::test]
    async fn test_start_polls_and_refresh_now() {
        let source = Arc::new(FakeSource::new().with_jobs(QUEUE));
        let mut coordinator = RefreshCoordinator::new(Arc::clone(&source), &on_demand_config());
        let mut jobs = coordinator.subscribe_jobs();

        coordinator.start();
        tokio::time::timeout(Duration::from_secs(2), jobs.changed())
            .await
            .expect("initial poll")
            .unwrap();
        assert_eq!(jobs.borrow_and_update().len(), 1);
        assert_eq!(source.job_calls(), 1);

        assert!(coordinator.refresh_now(Source::Jobs));
        tokio::time::timeout(Duration::from_secs(2), jobs.changed())
            .await
            .expect("requested poll")
            .unwrap();
        assert_eq!(source.job_calls(), 2);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_info_polls_reuse_host_details() {
        let source = Arc::new(FakeSource::new());
        let coordinator = RefreshCoordinator::new(Arc::clone(&source), &Config::default());

        for _ in 0..4 {
            coordinator.poll_once(Source::Info).await.unwrap();
        }
        assert_eq!(coordinator.info().slurm_version.as_deref(), Some("24.11.0"));
        assert_eq!(source.version_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_all_wakes_every_source() {
        let source = Arc::new(FakeSource::new().with_partitions(SUMMARY).with_jobs(QUEUE));
        let mut coordinator = RefreshCoordinator::new(Arc::clone(&source), &on_demand_config());
        let mut partitions = coordinator.subscribe_partitions();
        let mut jobs = coordinator.subscribe_jobs();
        let wait = Duration::from_secs(2);

        coordinator.start();
        tokio::time::timeout(wait, partitions.changed()).await.unwrap().unwrap();
        tokio::time::timeout(wait, jobs.changed()).await.unwrap().unwrap();
        partitions.borrow_and_update();
        jobs.borrow_and_update();

        coordinator.refresh_all();
        tokio::time::timeout(wait, partitions.changed()).await.unwrap().unwrap();
        tokio::time::timeout(wait, jobs.changed()).await.unwrap().unwrap();
        assert_eq!(source.partition_calls(), 2);
        assert_eq!(source.job_calls(), 2);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_while_polling_is_dropped() {
        let source = Arc::new(
            FakeSource::new()
                .with_jobs(QUEUE)
                .with_delay(Duration::from_millis(300)),
        );
        let mut coordinator = RefreshCoordinator::new(Arc::clone(&source), &on_demand_config());
        let mut jobs = coordinator.subscribe_jobs();
        coordinator.start();

        // Wait until the initial poll is running
        while source.job_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!coordinator.refresh_now(Source::Jobs));

        tokio::time::timeout(Duration::from_secs(2), jobs.changed())
            .await
            .expect("initial poll")
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(source.job_calls(), 1, "dropped request is not replayed");
        assert_eq!(coordinator.health(Source::Jobs).skipped, 1);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_abandons_running_poll() {
        let source = Arc::new(
            FakeSource::new()
                .with_partitions(SUMMARY)
                .with_delay(Duration::from_secs(30)),
        );
        let mut coordinator = RefreshCoordinator::new(Arc::clone(&source), &Config::default());
        let partitions = coordinator.subscribe_partitions();
        coordinator.start();

        while source.partition_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let started = std::time::Instant::now();
        coordinator.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(partitions.borrow().is_empty(), "nothing published after cancel");
    }

    #[test]
    fn test_stale_for() {
        let now = Local::now();
        let mut health = SourceHealth {
            last_success: Some(now - chrono::Duration::seconds(12)),
            ..Default::default()
        };
        assert_eq!(health.stale_for(now), None);

        health.failed_polls = 1;
        assert_eq!(health.stale_for(now), Some(Duration::from_secs(12)));
    }
}
