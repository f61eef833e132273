//! Workload lifecycle: spawn, observe, cancel, drain.
use crate::client::DatabaseClient;
use crate::data::DataProvider;
use crate::handler::JobHandler;
use crate::job_pool::JobPool;
use crate::limiter::RateLimiter;
use crate::worker::WorkerPool;
use drover_core::{ConfigError, Progress, RunState, RunSummary, WorkloadConfig};
use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

/// Success/error/latency tallies shared by every worker of a run.
pub(crate) struct Tallies {
    success: AtomicU64,
    error: AtomicU64,
    latency: AtomicBucket<Duration>,
    #[cfg(feature = "metrics")]
    handles: MetricHandles,
}

#[cfg(feature = "metrics")]
struct MetricHandles {
    success: metrics::Counter,
    error: metrics::Counter,
    latency: metrics::Histogram,
}

impl Tallies {
    fn new(workload: &str) -> Self {
        #[cfg(not(feature = "metrics"))]
        let _ = workload;
        Self {
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
            latency: AtomicBucket::new(),
            #[cfg(feature = "metrics")]
            handles: MetricHandles {
                success: metrics::counter!(
                    "drover_requests_success_total",
                    "workload" => workload.to_string()
                ),
                error: metrics::counter!(
                    "drover_requests_error_total",
                    "workload" => workload.to_string()
                ),
                latency: metrics::histogram!(
                    "drover_request_duration_seconds",
                    "workload" => workload.to_string()
                ),
            },
        }
    }

    pub(crate) fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        self.handles.success.increment(1);
    }

    pub(crate) fn record_error(&self) {
        self.error.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        self.handles.error.increment(1);
    }

    pub(crate) fn record_latency(&self, elapsed: Duration) {
        self.latency.push(elapsed);
        #[cfg(feature = "metrics")]
        self.handles.latency.record(elapsed.as_secs_f64());
    }

    fn successes(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    fn errors(&self) -> u64 {
        self.error.load(Ordering::Relaxed)
    }

    fn take_latencies(&self) -> Vec<Duration> {
        let mut latencies = vec![];
        self.latency.clear_with(|chunk| latencies.extend_from_slice(chunk));
        latencies
    }
}

/// State a run's workers, handle, and watchers all hang off.
pub(crate) struct Shared {
    name: String,
    weight: u64,
    pool: Arc<JobPool>,
    tallies: Tallies,
    started: Instant,
    summary: OnceLock<RunSummary>,
}

impl Shared {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn pool(&self) -> &Arc<JobPool> {
        &self.pool
    }

    pub(crate) fn tallies(&self) -> &Tallies {
        &self.tallies
    }

    /// Seals the run. Called exactly once, after every worker has exited.
    pub(crate) fn finish(&self) {
        let summary = self.compute_summary(self.started.elapsed());
        let _ = self.summary.set(summary);
    }

    fn compute_summary(&self, elapsed: Duration) -> RunSummary {
        let requests = self.pool.requests_done();
        let secs = elapsed.as_secs_f64();
        let rps = if secs > 0.0 { requests as f64 / secs } else { 0.0 };
        let mut latencies = self.tallies.take_latencies();
        latencies.sort_unstable();
        RunSummary {
            elapsed,
            requests,
            successes: self.tallies.successes(),
            errors: self.tallies.errors(),
            requests_per_second: rps,
            operations_per_second: rps * self.weight as f64,
            latency_p50: quantile(&latencies, 0.50),
            latency_p90: quantile(&latencies, 0.90),
            latency_p99: quantile(&latencies, 0.99),
        }
    }

    fn state(&self) -> RunState {
        if self.summary.get().is_some() {
            RunState::Drained
        } else if self.pool.is_cancelled() {
            RunState::Cancelling
        } else {
            RunState::Running
        }
    }

    fn progress(&self) -> Progress {
        if let Some(summary) = self.summary.get() {
            return Progress {
                requests_done: summary.requests,
                elapsed: summary.elapsed,
                current_rps: summary.requests_per_second,
                state: RunState::Drained,
            };
        }
        let requests_done = self.pool.requests_done();
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();
        Progress {
            requests_done,
            elapsed,
            current_rps: if secs > 0.0 { requests_done as f64 / secs } else { 0.0 },
            state: self.state(),
        }
    }
}

fn quantile(sorted: &[Duration], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let index = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[index]
}

/// Validates the config and starts the run; workers begin immediately.
///
/// Must be called from within a tokio runtime. The returned handle is the
/// only way to drain the run; clone off [`WorkloadHandle::watcher`] for
/// progress polling from elsewhere.
pub fn spawn(
    config: &WorkloadConfig,
    client: Arc<dyn DatabaseClient>,
    provider: Arc<DataProvider>,
) -> Result<WorkloadHandle, ConfigError> {
    config.validate()?;

    let pool = Arc::new(if let Some(duration) = config.duration {
        JobPool::timer(duration)
    } else if let Some(operations) = config.operations {
        JobPool::deduction(operations)
    } else {
        JobPool::no_limit()
    });
    let limiter = Arc::new(RateLimiter::new(config.rps));
    let handler = Arc::new(JobHandler::new(config, client, provider));

    let shared = Arc::new(Shared {
        name: config.name.clone(),
        weight: config.operation_weight(),
        pool,
        tallies: Tallies::new(&config.name),
        started: Instant::now(),
        summary: OnceLock::new(),
    });

    let workers = WorkerPool::new(
        shared.clone(),
        limiter,
        handler,
        config.connections(),
        config.counting,
    );
    let driver = tokio::spawn(workers.run());

    Ok(WorkloadHandle { shared, driver })
}

/// Owning handle for one workload run.
pub struct WorkloadHandle {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl WorkloadHandle {
    /// Idempotent graceful stop: no new operations start; in-flight ones
    /// complete.
    pub fn cancel(&self) {
        self.shared.pool.cancel();
    }

    pub fn progress(&self) -> Progress {
        self.shared.progress()
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    /// Final statistics; `None` until the run has drained.
    pub fn summary(&self) -> Option<RunSummary> {
        self.shared.summary.get().cloned()
    }

    /// A cloneable, non-owning view for progress polling and cancellation.
    pub fn watcher(&self) -> WorkloadWatcher {
        WorkloadWatcher {
            shared: self.shared.clone(),
        }
    }

    /// Waits for every worker to exit and returns the final statistics.
    pub async fn join(self) -> RunSummary {
        if let Err(err) = self.driver.await {
            error!("workload driver task failed: {err}");
        }
        self.shared
            .summary
            .get()
            .cloned()
            .unwrap_or_else(|| self.shared.compute_summary(self.shared.started.elapsed()))
    }
}

#[derive(Clone)]
pub struct WorkloadWatcher {
    shared: Arc<Shared>,
}

impl WorkloadWatcher {
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn cancel(&self) {
        self.shared.pool.cancel();
    }

    pub fn progress(&self) -> Progress {
        self.shared.progress()
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.shared.summary.get().cloned()
    }
}

/// Logs a progress line at `interval` until the workload drains.
pub fn report_progress(watcher: WorkloadWatcher, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let progress = watcher.progress();
            if progress.state == RunState::Drained {
                break;
            }
            info!(
                workload = watcher.name(),
                "{} requests done, {:.1} rq/s",
                progress.requests_done,
                progress.current_rps
            );
        }
    })
}
