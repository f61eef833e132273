use thiserror::Error;

/// Configuration problems caught before any worker runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("workload `{0}`: both duration and operation count set; pick one termination policy")]
    ConflictingTermination(String),

    #[error("workload `{0}`: connections must be greater than zero")]
    ZeroConnections(String),

    #[error("workload `{0}`: batch size must be greater than zero")]
    ZeroBatchSize(String),

    #[error("workload `{workload}` references unknown schema `{schema}`")]
    UnknownSchema { workload: String, schema: String },

    #[error("schema `{schema}`: saved field `{field}` is not defined")]
    UnknownSavedField { schema: String, field: String },

    #[error("schema `{schema}`, field `{field}`: {reason}")]
    InvalidFieldSpec {
        schema: String,
        field: String,
        reason: String,
    },
}
