//! A database workload driver.
//!
//! Drover runs configurable write/read/update workloads against a target
//! database at a fixed concurrency level and an optional aggregate request
//! rate. The database itself stays behind the [`DatabaseClient`] trait;
//! synthetic payloads come from schema-driven [`data`] providers, and
//! values saved by one workload feed the filters of the next.

pub mod agent;
pub mod client;
pub mod data;
pub mod handler;
pub mod job_pool;
pub mod limiter;
pub mod workload;

pub(crate) mod worker;

pub use agent::{Agent, AgentError};
pub use client::{ClientError, DatabaseClient, Document};
pub use workload::{spawn, WorkloadHandle, WorkloadWatcher};

pub mod prelude {
    pub use crate::agent::{Agent, AgentError};
    pub use crate::client::{ClientError, DatabaseClient, Document};
    pub use crate::data::{DataPool, DataProvider, SavedValues};
    pub use crate::workload::{WorkloadHandle, WorkloadWatcher};
    pub use drover_core::{
        AgentConfig, ConfigError, CountingMode, FieldSpec, OperationKind, Progress, RunState,
        RunSummary, SchemaConfig, WorkloadConfig,
    };
}
