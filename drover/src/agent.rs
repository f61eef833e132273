//! Sequential orchestration of configured workloads.
use crate::client::DatabaseClient;
use crate::data::DataPool;
use crate::workload::{self, report_progress, WorkloadWatcher};
use arc_swap::ArcSwap;
use drover_core::{AgentConfig, ConfigError, Progress, RunSummary, DEFAULT_REPORT_INTERVAL};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a workload run is already active")]
    AlreadyRunning,
}

/// Holds the agent configuration and drives workloads against the injected
/// database client, one at a time in declaration order, so a later workload
/// sees the saved fields of every workload before it.
pub struct Agent {
    config: ArcSwap<AgentConfig>,
    client: Arc<dyn DatabaseClient>,
    watchers: Mutex<Vec<WorkloadWatcher>>,
    cancelled: AtomicBool,
    running: AtomicBool,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        client: Arc<dyn DatabaseClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            client,
            watchers: Mutex::new(vec![]),
            cancelled: AtomicBool::new(false),
            running: AtomicBool::new(false),
        })
    }

    /// Replaces the configuration used by subsequent runs.
    pub fn set_config(&self, config: AgentConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.store(Arc::new(config));
        Ok(())
    }

    pub fn config(&self) -> Arc<AgentConfig> {
        self.config.load_full()
    }

    /// Runs every configured workload and returns their summaries in order.
    pub async fn run(&self) -> Result<Vec<(String, RunSummary)>, AgentError> {
        self.reserve()?;
        Ok(self.run_inner().await)
    }

    /// Kicks off [`run`](Self::run) in the background; summaries go to the
    /// log. Used by the control server, which must answer immediately.
    pub fn start(self: &Arc<Self>) -> Result<(), AgentError> {
        self.reserve()?;
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            for (name, summary) in agent.run_inner().await {
                info!(
                    workload = name.as_str(),
                    "{} requests, {:.1} rq/s, {:.1} op/s",
                    summary.requests,
                    summary.requests_per_second,
                    summary.operations_per_second,
                );
            }
        });
        Ok(())
    }

    fn reserve(&self) -> Result<(), AgentError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AgentError::AlreadyRunning);
        }
        self.cancelled.store(false, Ordering::SeqCst);
        lock(&self.watchers).clear();
        Ok(())
    }

    async fn run_inner(&self) -> Vec<(String, RunSummary)> {
        let config = self.config.load_full();
        let pools: HashMap<&str, DataPool> = config
            .schemas
            .iter()
            .map(|schema| (schema.name.as_str(), DataPool::new(schema.clone())))
            .collect();

        let mut summaries = vec![];
        for workload_config in &config.workloads {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            // validate() pinned every workload to a declared schema
            let Some(pool) = pools.get(workload_config.schema.as_str()) else {
                continue;
            };
            let provider = Arc::new(pool.provider());
            let handle =
                match workload::spawn(workload_config, self.client.clone(), provider.clone()) {
                    Ok(handle) => handle,
                    Err(err) => {
                        error!("skipping workload `{}`: {err}", workload_config.name);
                        continue;
                    }
                };
            lock(&self.watchers).push(handle.watcher());
            // Cancel may have landed between the loop check and the watcher
            // registration; re-check so it cannot be missed.
            if self.cancelled.load(Ordering::SeqCst) {
                handle.cancel();
            }
            let reporter = report_progress(
                handle.watcher(),
                config.report_interval.unwrap_or(DEFAULT_REPORT_INTERVAL),
            );

            let summary = handle.join().await;
            reporter.abort();
            // Saved fields become visible only now, after the drain.
            pool.publish(provider.take_captured());

            info!(
                workload = workload_config.name.as_str(),
                "finished in {}: {} requests ({} ok, {} failed), {:.1} rq/s, {:.1} op/s",
                humantime::format_duration(summary.elapsed),
                summary.requests,
                summary.successes,
                summary.errors,
                summary.requests_per_second,
                summary.operations_per_second,
            );
            summaries.push((workload_config.name.clone(), summary));
        }

        self.running.store(false, Ordering::SeqCst);
        summaries
    }

    /// Idempotent: stops the in-flight workload and skips the ones not yet
    /// started. In-flight database operations complete.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        for watcher in lock(&self.watchers).iter() {
            watcher.cancel();
        }
    }

    /// One entry per configured workload, in declaration order. Workloads
    /// that have not started yet report idle zeroes.
    pub fn progress(&self) -> Vec<(String, Progress)> {
        let config = self.config.load_full();
        let watchers = lock(&self.watchers);
        config
            .workloads
            .iter()
            .map(|workload_config| {
                let progress = watchers
                    .iter()
                    .find(|watcher| watcher.name() == workload_config.name)
                    .map(WorkloadWatcher::progress)
                    .unwrap_or_else(Progress::idle);
                (workload_config.name.clone(), progress)
            })
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
