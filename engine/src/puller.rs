//! Pull invoker - turns one due pull code into one typed event batch
//!
//! Resolves the source for a code, invokes it at most once per tick, and
//! parses the raw payload into [`MetricEvent`]s stamped with the tick
//! timestamp.
//!
//! # Payload format
//!
//! Sources return JSON in any of three shapes, auto-detected:
//! - Single object: `{"name": "...", "fields": {...}}`
//! - Array: `[{...}, {...}]`
//! - Newline-delimited: `{...}\n{...}\n{...}`
//!
//! # Error handling
//!
//! A malformed record is skipped with a warning; the rest of the batch
//! survives — one corrupt record cannot void an entire pull. A source that
//! cannot be reached at all is a soft failure: the tick delivers nothing
//! for that code and the next tick retries.

use std::sync::Arc;

use nouto_core::{EventBatch, FieldValue, MetricEvent, PluginError, PullCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::sources::SourceRegistry;

/// Invokes pull sources and parses their payloads.
pub struct PullInvoker {
    sources: Arc<SourceRegistry>,
}

/// Intermediate JSON representation for flexible parsing
#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,

    #[serde(default)]
    fields: std::collections::HashMap<String, FieldValue>,
}

impl RawRecord {
    fn into_event(self, code: PullCode, timestamp_ms: u64) -> MetricEvent {
        MetricEvent {
            code,
            timestamp_ms,
            name: self.name.into(),
            fields: self.fields,
        }
    }
}

impl PullInvoker {
    /// Create an invoker over the given source registry.
    pub fn new(sources: Arc<SourceRegistry>) -> Self {
        Self { sources }
    }

    /// Pull one batch for `code`, stamping every event with `timestamp_ms`.
    ///
    /// # Returns
    ///
    /// * `Ok(batch)` - Parsed events; empty when the code has no registered
    ///   source (a no-op, never an error) or every record was skipped
    /// * `Err(PluginError)` - The source invocation itself failed, or the
    ///   payload was unusable as a whole (e.g. invalid UTF-8). Recoverable:
    ///   the next tick retries.
    pub async fn pull(
        &self,
        code: PullCode,
        timestamp_ms: u64,
    ) -> Result<EventBatch, PluginError> {
        let Some(source) = self.sources.resolve(code) else {
            debug!(code = %code, "No source for pull code, returning empty batch");
            return Ok(Vec::new());
        };

        let raw = source.pull(timestamp_ms).await.map_err(|e| {
            warn!(
                source = source.name(),
                code = %code,
                error = %e,
                "Pull failed, will retry next tick"
            );
            e
        })?;

        debug!(
            source = source.name(),
            code = %code,
            bytes = raw.len(),
            "Pulled raw payload"
        );

        parse_batch(code, timestamp_ms, &raw)
    }
}

/// Parse a raw payload into events, skipping malformed records.
fn parse_batch(code: PullCode, timestamp_ms: u64, data: &[u8]) -> Result<EventBatch, PluginError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| PluginError::Malformed(format!("invalid UTF-8: {e}")))?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        parse_array(code, timestamp_ms, trimmed)
    } else if trimmed.starts_with('{') {
        // Try a single (possibly multi-line formatted) object first; fall
        // back to newline-delimited records.
        match serde_json::from_str::<RawRecord>(trimmed) {
            Ok(record) => Ok(vec![Arc::new(record.into_event(code, timestamp_ms))]),
            Err(_) => Ok(parse_ndjson(code, timestamp_ms, trimmed)),
        }
    } else {
        Ok(parse_ndjson(code, timestamp_ms, trimmed))
    }
}

fn parse_array(code: PullCode, timestamp_ms: u64, text: &str) -> Result<EventBatch, PluginError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| PluginError::Malformed(format!("invalid JSON array: {e}")))?;

    let mut events = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(value) {
            Ok(record) => events.push(Arc::new(record.into_event(code, timestamp_ms))),
            Err(e) => {
                warn!(code = %code, index = idx, error = %e, "Skipping malformed record");
            }
        }
    }
    Ok(events)
}

fn parse_ndjson(code: PullCode, timestamp_ms: u64, text: &str) -> EventBatch {
    let mut events = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<RawRecord>(trimmed) {
            Ok(record) => events.push(Arc::new(record.into_event(code, timestamp_ms))),
            Err(e) => {
                warn!(
                    code = %code,
                    line = line_num + 1,
                    error = %e,
                    "Skipping malformed record"
                );
            }
        }
    }

    events
}
