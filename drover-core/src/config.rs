use crate::{ConfigError, DEFAULT_BATCH_SIZE, DEFAULT_CONNECTIONS, DEFAULT_WORD_LENGTH};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Duration;

/// Top-level agent configuration: the schemas that describe synthetic data
/// and the workloads to drive against the target database, in order.
#[serde_as]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
    #[serde(default)]
    pub workloads: Vec<WorkloadConfig>,
    /// How often a progress line is logged for the running workload.
    /// Defaults to [`DEFAULT_REPORT_INTERVAL`](crate::DEFAULT_REPORT_INTERVAL).
    #[serde_as(as = "Option<DurationSecondsWithFrac>")]
    #[serde(default)]
    pub report_interval: Option<Duration>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for schema in &self.schemas {
            schema.validate()?;
        }
        for workload in &self.workloads {
            workload.validate()?;
            if !self.schemas.iter().any(|s| s.name == workload.schema) {
                return Err(ConfigError::UnknownSchema {
                    workload: workload.name.clone(),
                    schema: workload.schema.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaConfig> {
        self.schemas.iter().find(|s| s.name == name)
    }
}

/// One configured run of a single operation type against a schema.
///
/// Exactly one termination policy applies: `duration`, `operations`, or
/// neither (run until cancelled). Setting both is a configuration error.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Name of the schema this workload generates payloads from.
    pub schema: String,
    /// Concurrent workers. Defaults to [`DEFAULT_CONNECTIONS`].
    #[serde(default)]
    pub connections: Option<u64>,
    #[serde_as(as = "Option<DurationSecondsWithFrac>")]
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub operations: Option<u64>,
    /// Aggregate request rate cap across all workers. Unset means unpaced.
    #[serde(default)]
    pub rps: Option<NonZeroU32>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub counting: CountingMode,
}

impl WorkloadConfig {
    pub fn new(name: &str, kind: OperationKind, schema: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            schema: schema.to_string(),
            connections: None,
            duration: None,
            operations: None,
            rps: None,
            batch_size: None,
            counting: CountingMode::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_some() && self.operations.is_some() {
            return Err(ConfigError::ConflictingTermination(self.name.clone()));
        }
        if self.connections == Some(0) {
            return Err(ConfigError::ZeroConnections(self.name.clone()));
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::ZeroBatchSize(self.name.clone()));
        }
        Ok(())
    }

    pub fn connections(&self) -> usize {
        self.connections.map(|c| c as usize).unwrap_or(DEFAULT_CONNECTIONS)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Database operations carried by one request; used to weight the
    /// operations-per-second figure for batched workloads.
    pub fn operation_weight(&self) -> u64 {
        match self.kind {
            OperationKind::InsertMany => self.batch_size() as u64,
            _ => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    InsertOne,
    InsertMany,
    ReadOne,
    UpdateOne,
}

/// What `requests done` counts toward a count-bounded limit.
///
/// `Attempts` counts every completed call regardless of outcome. `Successes`
/// counts only successful calls; a failed call refunds its slot, so a
/// count-bounded workload keeps going until it has that many successes or is
/// cancelled (a client that never succeeds will not terminate on its own).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    #[default]
    Attempts,
    Successes,
}

/// Schema for synthetic documents: field generators plus the list of fields
/// whose generated values are saved for reuse by later workloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub name: String,
    pub collection: String,
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub save: Vec<String>,
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for field in &self.save {
            if !self.fields.contains_key(field) {
                return Err(ConfigError::UnknownSavedField {
                    schema: self.name.clone(),
                    field: field.clone(),
                });
            }
        }
        for (name, spec) in &self.fields {
            spec.validate(&self.name, name)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSpec {
    /// Random v4 UUID rendered as a simple hex string.
    Id,
    Word {
        #[serde(default = "default_word_length")]
        length: usize,
    },
    Int {
        min: i64,
        max: i64,
    },
    Float {
        min: f64,
        max: f64,
    },
    Bool,
    /// Milliseconds since the Unix epoch at generation time.
    Timestamp,
    OneOf {
        values: Vec<Value>,
    },
    Array {
        item: Box<FieldSpec>,
        length: usize,
    },
    Object {
        fields: BTreeMap<String, FieldSpec>,
    },
}

impl FieldSpec {
    fn validate(&self, schema: &str, field: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidFieldSpec {
            schema: schema.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        };
        match self {
            FieldSpec::Int { min, max } if min > max => Err(invalid("min exceeds max")),
            FieldSpec::Float { min, max } if min >= max => Err(invalid("min must be below max")),
            FieldSpec::OneOf { values } if values.is_empty() => Err(invalid("no values to pick from")),
            FieldSpec::Array { item, .. } => item.validate(schema, field),
            FieldSpec::Object { fields } => {
                for spec in fields.values() {
                    spec.validate(schema, field)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn default_word_length() -> usize {
    DEFAULT_WORD_LENGTH
}
