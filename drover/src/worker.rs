//! The worker loop and the drain barrier.
use crate::handler::JobHandler;
use crate::limiter::RateLimiter;
use crate::workload::Shared;
use drover_core::CountingMode;
use std::sync::Arc;
use std::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Drives one workload run: spawns exactly the configured number of workers
/// and waits for every one of them to exit before sealing the statistics.
pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
    limiter: Arc<RateLimiter>,
    handler: Arc<JobHandler>,
    concurrency: usize,
    counting: CountingMode,
}

impl WorkerPool {
    pub(crate) fn new(
        shared: Arc<Shared>,
        limiter: Arc<RateLimiter>,
        handler: Arc<JobHandler>,
        concurrency: usize,
        counting: CountingMode,
    ) -> Self {
        Self {
            shared,
            limiter,
            handler,
            concurrency,
            counting,
        }
    }

    #[instrument(name = "workload", skip_all, fields(name = self.shared.name()))]
    pub(crate) async fn run(self) {
        // A timer pool also cancels at its deadline, so workers parked in
        // the limiter wake up instead of waiting out one more token.
        let deadline_guard = self.shared.pool().deadline().map(|deadline| {
            let pool = Arc::clone(self.shared.pool());
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                pool.cancel();
            })
        });

        debug!("starting {} workers", self.concurrency);
        let mut workers = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            workers.push(tokio::spawn(worker_loop(
                Arc::clone(&self.shared),
                Arc::clone(&self.limiter),
                Arc::clone(&self.handler),
                self.counting,
            )));
        }
        for worker in workers {
            if let Err(err) = worker.await {
                error!("worker task failed: {err}");
            }
        }
        if let Some(guard) = deadline_guard {
            guard.abort();
        }

        self.shared.finish();
        info!("workload drained");
    }
}

/// `spawn_job -> take -> handle -> mark_job_done` until the pool stops
/// granting. A handler failure is tallied and the loop continues; only the
/// pool decides when a worker exits.
async fn worker_loop(
    shared: Arc<Shared>,
    limiter: Arc<RateLimiter>,
    handler: Arc<JobHandler>,
    counting: CountingMode,
) {
    let pool = shared.pool();
    while pool.spawn_job() {
        tokio::select! {
            biased;
            _ = pool.cancelled() => break,
            _ = limiter.take() => {}
        }

        let start = Instant::now();
        let result = handler.handle().await;
        shared.tallies().record_latency(start.elapsed());

        let succeeded = matches!(result, Ok(true));
        if succeeded {
            shared.tallies().record_success();
        } else {
            if let Err(err) = &result {
                debug!("operation failed: {err}");
            }
            shared.tallies().record_error();
        }

        match counting {
            CountingMode::Attempts => pool.mark_job_done(),
            CountingMode::Successes if succeeded => pool.mark_job_done(),
            CountingMode::Successes => pool.refund(),
        }
    }
}
