use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::time::Duration;

/// Lifecycle of a single workload run. A drained workload is terminal and
/// not restartable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Cancelling,
    Drained,
}

/// Live view of a running workload. Safe to poll at any point; before start
/// it is all zeroes, after drain it reports the final figures.
#[serde_as]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Progress {
    pub requests_done: u64,
    #[serde_as(as = "DurationSecondsWithFrac")]
    pub elapsed: Duration,
    /// Average requests per second over the run so far.
    pub current_rps: f64,
    pub state: RunState,
}

impl Progress {
    pub fn idle() -> Self {
        Self {
            requests_done: 0,
            elapsed: Duration::ZERO,
            current_rps: 0.0,
            state: RunState::Idle,
        }
    }
}

/// Final statistics for a drained workload run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde_as(as = "DurationSecondsWithFrac")]
    pub elapsed: Duration,
    /// Requests counted by the job pool (attempts or successes, per the
    /// workload's counting mode).
    pub requests: u64,
    pub successes: u64,
    pub errors: u64,
    pub requests_per_second: f64,
    /// Requests per second weighted by batch size.
    pub operations_per_second: f64,
    #[serde_as(as = "DurationSecondsWithFrac")]
    pub latency_p50: Duration,
    #[serde_as(as = "DurationSecondsWithFrac")]
    pub latency_p90: Duration,
    #[serde_as(as = "DurationSecondsWithFrac")]
    pub latency_p99: Duration,
}
