//! Aggregate dispatch pacing shared by all workers of a workload.
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use std::num::NonZeroU32;

/// One pacer per workload. The limiter is global to the worker pool, so the
/// configured rate caps total throughput rather than per-worker throughput.
/// Waiters queue fairly; no caller is starved.
pub enum RateLimiter {
    NoLimit,
    Limited(DefaultDirectRateLimiter),
}

impl RateLimiter {
    pub fn new(rps: Option<NonZeroU32>) -> Self {
        match rps {
            None => Self::NoLimit,
            Some(rps) => Self::Limited(rate_limiter(rps)),
        }
    }

    /// Blocks until the caller may dispatch one operation. Callers race this
    /// against [`JobPool::cancelled`](crate::job_pool::JobPool::cancelled)
    /// so cancellation never leaves a worker parked here.
    pub async fn take(&self) {
        if let Self::Limited(limiter) = self {
            limiter.until_ready().await;
        }
    }
}

fn rate_limiter(rps: NonZeroU32) -> DefaultDirectRateLimiter {
    GovernorLimiter::direct(Quota::per_second(rps).allow_burst(NonZeroU32::MIN))
}
