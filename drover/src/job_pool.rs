//! Decides whether another operation may start and tracks completed work.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// One pool per workload run. All workers share it; every method is safe to
/// call concurrently. Once cancelled or exhausted the pool is terminal and
/// `spawn_job` never grants again.
pub struct JobPool {
    policy: Policy,
    requests_done: AtomicU64,
    cancelled: AtomicBool,
    cancel_tx: watch::Sender<bool>,
}

enum Policy {
    NoLimit,
    Timer { deadline: Instant },
    Deduction { remaining: AtomicU64 },
}

impl JobPool {
    /// Runs until cancelled.
    pub fn no_limit() -> Self {
        Self::with_policy(Policy::NoLimit)
    }

    /// Runs until `duration` has elapsed from construction.
    pub fn timer(duration: Duration) -> Self {
        Self::with_policy(Policy::Timer {
            deadline: Instant::now() + duration,
        })
    }

    /// Grants exactly `operations` spawns, no matter how many workers race
    /// for them.
    pub fn deduction(operations: u64) -> Self {
        Self::with_policy(Policy::Deduction {
            remaining: AtomicU64::new(operations),
        })
    }

    fn with_policy(policy: Policy) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            policy,
            requests_done: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            cancel_tx,
        }
    }

    /// Whether the caller may proceed with one more operation.
    ///
    /// For a count-bounded pool the grant is the decrement: `checked_sub`
    /// inside `fetch_update` means the counter can neither go negative nor
    /// hand out the same slot twice.
    pub fn spawn_job(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        match &self.policy {
            Policy::NoLimit => true,
            Policy::Timer { deadline } => Instant::now() < *deadline,
            Policy::Deduction { remaining } => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok(),
        }
    }

    pub fn mark_job_done(&self) {
        self.requests_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns one granted slot to a count-bounded pool. Used by the
    /// `successes` counting mode when an operation fails.
    pub(crate) fn refund(&self) {
        if let Policy::Deduction { remaining } = &self.policy {
            remaining.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Idempotent. Stops all future spawns and wakes anything parked on
    /// [`cancelled`](Self::cancelled), including workers blocked in the rate
    /// limiter.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.cancel_tx.send_replace(true);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Completed-operation count. Live while workers run; authoritative once
    /// the workload has drained.
    pub fn requests_done(&self) -> u64 {
        self.requests_done.load(Ordering::Relaxed)
    }

    /// Resolves when the pool is cancelled; immediately if it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_tx.subscribe();
        // Err only if the sender dropped, which `&self` rules out.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        match &self.policy {
            Policy::Timer { deadline } => Some(*deadline),
            _ => None,
        }
    }
}
