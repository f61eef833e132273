//! Schema-driven payload generation and cross-workload value reuse.
//!
//! A [`DataPool`] exists per declared schema and outlives individual
//! workloads. Each workload gets a [`DataProvider`] snapshot from it. Fields
//! listed in the schema's `save` list are captured as the provider generates
//! them; once the producing workload has drained, the captured values are
//! published back into the pool, where providers built afterwards can see
//! them. Publishing swaps an immutable `Arc` snapshot, so a consumer never
//! observes a partially-written side-table.
use crate::client::Document;
use arc_swap::ArcSwap;
use drover_core::{FieldSpec, SchemaConfig};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Values captured from completed workloads, keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct SavedValues {
    fields: HashMap<String, Vec<Value>>,
}

impl SavedValues {
    pub fn get(&self, field: &str) -> Option<&[Value]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn extend(&mut self, other: SavedValues) {
        for (field, mut values) in other.fields {
            self.fields.entry(field).or_default().append(&mut values);
        }
    }
}

pub struct DataPool {
    schema: Arc<SchemaConfig>,
    saved: ArcSwap<SavedValues>,
}

impl DataPool {
    pub fn new(schema: SchemaConfig) -> Self {
        Self {
            schema: Arc::new(schema),
            saved: ArcSwap::from_pointee(SavedValues::default()),
        }
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Provider over the current saved-values snapshot. Values published
    /// after this call are not visible to the returned provider.
    pub fn provider(&self) -> DataProvider {
        DataProvider::new(self.schema.clone(), self.saved.load_full())
    }

    /// Merges values captured by a drained workload into the side-table.
    ///
    /// Must only be called after the producing workload's workers have all
    /// exited; workloads run sequentially, so the swap has a single writer.
    pub fn publish(&self, captured: SavedValues) {
        if captured.is_empty() {
            return;
        }
        let mut merged = SavedValues::clone(&self.saved.load_full());
        merged.extend(captured);
        self.saved.store(Arc::new(merged));
    }
}

/// Generates schema-conformant payloads for one workload.
pub struct DataProvider {
    schema: Arc<SchemaConfig>,
    saved: Arc<SavedValues>,
    captured: Option<Mutex<HashMap<String, Vec<Value>>>>,
}

impl DataProvider {
    fn new(schema: Arc<SchemaConfig>, saved: Arc<SavedValues>) -> Self {
        let captured = if schema.save.is_empty() {
            None
        } else {
            Some(Mutex::new(HashMap::new()))
        };
        Self {
            schema,
            saved,
            captured,
        }
    }

    /// One synthetic document conforming to the schema.
    pub fn single_item(&self) -> Document {
        let mut rng = rand::thread_rng();
        let mut doc = Document::new();
        for (field, spec) in &self.schema.fields {
            doc.insert(field.clone(), generate(spec, &mut rng));
        }
        self.capture(&doc);
        doc
    }

    pub fn batch(&self, n: usize) -> Vec<Document> {
        (0..n).map(|_| self.single_item()).collect()
    }

    /// A single-field filter. Prefers a value some earlier workload saved
    /// for this schema, so reads and updates land on documents that actually
    /// exist; falls back to a random conforming value when nothing has been
    /// published yet.
    pub fn filter(&self) -> Document {
        let mut rng = rand::thread_rng();
        let mut doc = Document::new();
        for field in &self.schema.save {
            let value = self.saved.get(field).and_then(|values| values.choose(&mut rng));
            if let Some(value) = value {
                doc.insert(field.clone(), value.clone());
                return doc;
            }
        }
        if let Some((field, spec)) = pick_field(&self.schema, &mut rng) {
            doc.insert(field.to_string(), generate(spec, &mut rng));
        }
        doc
    }

    /// A synthetic replacement document; saved fields are left out so an
    /// update cannot clobber the values other workloads key on.
    pub fn update(&self) -> Document {
        let mut rng = rand::thread_rng();
        let mut doc = Document::new();
        for (field, spec) in &self.schema.fields {
            if self.schema.save.contains(field) {
                continue;
            }
            doc.insert(field.clone(), generate(spec, &mut rng));
        }
        doc
    }

    fn capture(&self, doc: &Document) {
        let Some(captured) = &self.captured else {
            return;
        };
        let mut captured = captured.lock().unwrap_or_else(PoisonError::into_inner);
        for field in &self.schema.save {
            if let Some(value) = doc.get(field) {
                captured.entry(field.clone()).or_default().push(value.clone());
            }
        }
    }

    /// Drains everything captured so far. Called once per run, after drain,
    /// to hand the values to [`DataPool::publish`].
    pub fn take_captured(&self) -> SavedValues {
        let Some(captured) = &self.captured else {
            return SavedValues::default();
        };
        let mut captured = captured.lock().unwrap_or_else(PoisonError::into_inner);
        SavedValues {
            fields: std::mem::take(&mut *captured),
        }
    }
}

fn pick_field<'a>(
    schema: &'a SchemaConfig,
    rng: &mut ThreadRng,
) -> Option<(&'a str, &'a FieldSpec)> {
    if schema.fields.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..schema.fields.len());
    schema
        .fields
        .iter()
        .nth(index)
        .map(|(field, spec)| (field.as_str(), spec))
}

fn generate(spec: &FieldSpec, rng: &mut ThreadRng) -> Value {
    match spec {
        FieldSpec::Id => Value::String(Uuid::new_v4().simple().to_string()),
        FieldSpec::Word { length } => {
            Value::String(Alphanumeric.sample_string(rng, *length))
        }
        FieldSpec::Int { min, max } => Value::from(rng.gen_range(*min..=*max)),
        FieldSpec::Float { min, max } => Value::from(rng.gen_range(*min..*max)),
        FieldSpec::Bool => Value::Bool(rng.gen()),
        FieldSpec::Timestamp => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            Value::from(now.as_millis() as u64)
        }
        FieldSpec::OneOf { values } => values.choose(rng).cloned().unwrap_or(Value::Null),
        FieldSpec::Array { item, length } => {
            Value::Array((0..*length).map(|_| generate(item, rng)).collect())
        }
        FieldSpec::Object { fields } => Value::Object(
            fields
                .iter()
                .map(|(field, spec)| (field.clone(), generate(spec, rng)))
                .collect(),
        ),
    }
}
