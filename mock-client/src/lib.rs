//! In-memory `DatabaseClient` stand-in for tests and benchmarks.
//!
//! Records every call, optionally sleeps through a skewed latency
//! distribution, and can fail a configurable fraction of requests.
use async_trait::async_trait;
use drover::{ClientError, DatabaseClient, Document};
use rand::Rng;
use rand_distr::{Distribution, SkewNormal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
pub struct MockClient {
    latency: Option<(Duration, Duration)>,
    failure_rate: f64,
    inserted: Mutex<Vec<Document>>,
    filters: Mutex<Vec<Document>>,
    reads: AtomicU64,
    updates: AtomicU64,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep through a skew-normal latency sample on every call.
    pub fn with_latency(mut self, mean: Duration, std: Duration) -> Self {
        self.latency = Some((mean, std));
        self
    }

    /// Fail roughly this fraction of calls with a backend error.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate;
        self
    }

    pub fn inserted_documents(&self) -> Vec<Document> {
        lock(&self.inserted).clone()
    }

    pub fn insert_count(&self) -> u64 {
        lock(&self.inserted).len() as u64
    }

    /// Filters seen by reads and updates, in arrival order.
    pub fn seen_filters(&self) -> Vec<Document> {
        lock(&self.filters).clone()
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    async fn simulate(&self) -> Result<(), ClientError> {
        if let Some((mean, std)) = self.latency {
            let delay = if std.is_zero() {
                mean
            } else {
                let skew = SkewNormal::new(mean.as_secs_f64(), std.as_secs_f64(), 20.).unwrap();
                let secs: f64 = skew.sample(&mut rand::thread_rng()).max(0.);
                Duration::from_secs_f64(secs)
            };
            tokio::time::sleep(delay).await;
        }
        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(ClientError::Backend("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for MockClient {
    async fn insert_one(&self, item: Document) -> Result<bool, ClientError> {
        self.simulate().await?;
        lock(&self.inserted).push(item);
        Ok(true)
    }

    async fn insert_many(&self, items: Vec<Document>) -> Result<bool, ClientError> {
        self.simulate().await?;
        lock(&self.inserted).extend(items);
        Ok(true)
    }

    async fn read_one(&self, filter: Document) -> Result<bool, ClientError> {
        self.simulate().await?;
        lock(&self.filters).push(filter);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    async fn update_one(&self, filter: Document, _update: Document) -> Result<bool, ClientError> {
        self.simulate().await?;
        lock(&self.filters).push(filter);
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
