//! Metric event — the typed record produced by a pull
//!
//! A [`MetricEvent`] is created once by the engine's pull invoker and then
//! shared read-only with every due receiver. The type deliberately does NOT
//! implement `Clone`: batches are `Vec<Arc<MetricEvent>>`, so fan-out to N
//! receivers is N refcount bumps, and no receiver can observe a diverged
//! copy of the data.
//!
//! ```text
//! PullSource returns raw payload
//!                 │
//!                 ▼
//! PullInvoker parses once ──► Vec<Arc<MetricEvent>>
//!                 │
//!     ┌───────────┼───────────┐
//!     ▼           ▼           ▼
//! Receiver A  Receiver B  Receiver C
//! (all share the same underlying events)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::code::PullCode;

/// A batch of shared, read-only events as delivered to receivers.
pub type EventBatch = Vec<Arc<MetricEvent>>;

/// A single typed value inside a metric event.
///
/// Parsed permissively from source payloads: JSON strings, integers,
/// floats, and booleans all map onto a variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer (counters, handles, ids)
    Int(i64),
    /// Floating point (rates, temperatures)
    Float(f64),
    /// Free-form string (names, states)
    Str(String),
}

impl FieldValue {
    /// Integer value, if this field holds one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this field holds one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// An immutable metric event.
///
/// Produced by the engine's pull invoker from a source's raw payload and
/// stamped with the bucket-aligned tick timestamp. Never mutated after
/// creation; intentionally not `Clone` — share it via `Arc`.
#[derive(Debug, PartialEq)]
pub struct MetricEvent {
    /// Pull code of the source that produced this event
    pub code: PullCode,
    /// Bucket-aligned timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Metric name (e.g. `"kernel.wakelocks"`)
    pub name: Arc<str>,
    /// Typed key-value payload
    pub fields: HashMap<String, FieldValue>,
}

impl MetricEvent {
    /// Create an event with no fields.
    pub fn new(code: PullCode, timestamp_ms: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            code,
            timestamp_ms,
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    /// Attach a field (builder-style, used by sources and tests).
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
