use std::time::Duration;

/// Worker count used when a workload does not set `connections`.
pub const DEFAULT_CONNECTIONS: usize = 100;

/// Batch size used by `insert_many` workloads that do not set `batch_size`.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Interval between progress log lines while a workload is running.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(200);

/// Port the agent control server listens on by default.
pub const DEFAULT_AGENT_PORT: u16 = 1234;

pub const DEFAULT_WORD_LENGTH: usize = 12;
