//! nouto-core - Core types for the NOUTO pull-metrics engine
//!
//! This crate provides the foundational types that are shared between
//! the NOUTO engine and external plugins (pull sources, receivers):
//!
//! - [`PullCode`] - integer identifier for a class of pullable metric
//! - [`MetricEvent`] - the immutable typed event record (shared via `Arc`)
//! - [`PullSource`] trait - async interface for producing raw payloads on demand
//! - [`Receiver`] trait - async interface for accepting pulled event batches
//! - [`PluginError`] - error type for plugin operations
//!
//! # Why this crate exists
//!
//! External source plugins (like a kernel-stats reader) need to implement
//! the `PullSource` trait and use the `MetricEvent` type. Without
//! `nouto-core`, they would depend on `nouto-engine`, but `nouto-engine`
//! might also want to optionally depend on those sources, creating a
//! cyclic dependency.
//!
//! By extracting core types here, we break the cycle:
//!
//! ```text
//! nouto-core ◄── nouto-engine
//!     ▲
//!     └────────── wakelock-source (out-of-tree plugin)
//! ```
//!
//! Now `nouto-engine` can optionally depend on out-of-tree sources without
//! cycles.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

/// Pull code newtype
pub mod code;
mod error;
/// The immutable metric event record
pub mod event;
mod receive;
mod source;

pub use code::PullCode;
pub use error::PluginError;
pub use event::{EventBatch, FieldValue, MetricEvent};
pub use receive::Receiver;
pub use source::PullSource;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    // ==========================================================================
    // PluginError Tests
    // ==========================================================================

    #[test]
    fn test_plugin_error_init_display() {
        let err = PluginError::Init("missing kernel interface".to_string());
        assert_eq!(
            err.to_string(),
            "initialization failed: missing kernel interface"
        );
    }

    #[test]
    fn test_plugin_error_unavailable_display() {
        let err = PluginError::Unavailable("read timeout".to_string());
        assert_eq!(err.to_string(), "source unavailable: read timeout");
    }

    #[test]
    fn test_plugin_error_malformed_display() {
        let err = PluginError::Malformed("invalid JSON".to_string());
        assert_eq!(err.to_string(), "malformed payload: invalid JSON");
    }

    #[test]
    fn test_plugin_error_deliver_display() {
        let err = PluginError::Deliver("queue full".to_string());
        assert_eq!(err.to_string(), "delivery failed: queue full");
    }

    #[test]
    fn test_plugin_error_not_ready_display() {
        let err = PluginError::NotReady;
        assert_eq!(err.to_string(), "plugin not ready");
    }

    #[test]
    fn test_plugin_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PluginError>();
    }

    // ==========================================================================
    // PullCode Tests
    // ==========================================================================

    #[test]
    fn test_pull_code_display_and_value() {
        let code = PullCode(42);
        assert_eq!(code.to_string(), "42");
        assert_eq!(code.value(), 42);
        assert_eq!(i32::from(code), 42);
        assert_eq!(PullCode::from(42), code);
    }

    #[test]
    fn test_pull_code_ordering() {
        assert!(PullCode(1) < PullCode(2));
        assert_eq!(PullCode(7), PullCode(7));
    }

    // ==========================================================================
    // MetricEvent Tests
    // ==========================================================================

    #[test]
    fn test_metric_event_builder() {
        let ev = MetricEvent::new(PullCode(10), 60_000, "kernel.wakelocks")
            .with_field("name", FieldValue::Str("wlan_rx".to_string()))
            .with_field("count", FieldValue::Int(17));

        assert_eq!(ev.code, PullCode(10));
        assert_eq!(ev.timestamp_ms, 60_000);
        assert_eq!(&*ev.name, "kernel.wakelocks");
        assert_eq!(ev.field("count").and_then(FieldValue::as_int), Some(17));
        assert_eq!(ev.field("name").and_then(FieldValue::as_str), Some("wlan_rx"));
        assert!(ev.field("missing").is_none());
    }

    #[test]
    fn test_metric_event_shared_not_cloned() {
        // Batches are shared handles; two Arc clones point at the same event.
        let ev = Arc::new(MetricEvent::new(PullCode(1), 0, "m"));
        let other = Arc::clone(&ev);
        assert!(Arc::ptr_eq(&ev, &other));
    }

    #[test]
    fn test_field_value_untagged_deserialize() {
        let v: FieldValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, FieldValue::Int(3));
        let v: FieldValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, FieldValue::Float(3.5));
        let v: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FieldValue::Bool(true));
        let v: FieldValue = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(v, FieldValue::Str("idle".to_string()));
    }

    #[test]
    fn test_metric_event_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MetricEvent>();
    }

    // ==========================================================================
    // PullSource Trait Tests
    // ==========================================================================

    /// Test source that tracks calls for verification
    struct TestSource {
        pull_count: AtomicU64,
        last_timestamp: AtomicU64,
    }

    impl TestSource {
        fn new() -> Self {
            Self {
                pull_count: AtomicU64::new(0),
                last_timestamp: AtomicU64::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl PullSource for TestSource {
        fn name(&self) -> &'static str {
            "test-source"
        }

        fn code(&self) -> PullCode {
            PullCode(10)
        }

        fn metric_names(&self) -> &'static [&'static str] {
            &["test.metric", "test.metric.alias"]
        }

        async fn pull(&self, timestamp_ms: u64) -> Result<bytes::Bytes, PluginError> {
            self.pull_count.fetch_add(1, Ordering::Relaxed);
            self.last_timestamp.store(timestamp_ms, Ordering::Relaxed);
            Ok(bytes::Bytes::from_static(b"{\"name\":\"test.metric\"}"))
        }
    }

    #[tokio::test]
    async fn test_source_pull() {
        let source = TestSource::new();
        let raw = source.pull(5_000).await.unwrap();
        assert!(!raw.is_empty());
        assert_eq!(source.pull_count.load(Ordering::Relaxed), 1);
        assert_eq!(source.last_timestamp.load(Ordering::Relaxed), 5_000);
    }

    #[tokio::test]
    async fn test_source_is_object_safe() {
        // Verify trait is object-safe by using it as a trait object
        let source: Arc<dyn PullSource> = Arc::new(TestSource::new());

        assert_eq!(source.name(), "test-source");
        assert_eq!(source.code(), PullCode(10));
        assert_eq!(source.metric_names().len(), 2);
        assert!(source.pull(0).await.is_ok());
    }

    // ==========================================================================
    // Receiver Trait Tests
    // ==========================================================================

    /// Receiver that counts deliveries
    struct CountingReceiver {
        delivered: AtomicU64,
    }

    #[async_trait::async_trait]
    impl Receiver for CountingReceiver {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(
            &self,
            _code: PullCode,
            _timestamp_ms: u64,
            events: &[Arc<MetricEvent>],
        ) -> Result<(), PluginError> {
            self.delivered.fetch_add(events.len() as u64, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_receiver_deliver_empty_batch() {
        let rx = CountingReceiver {
            delivered: AtomicU64::new(0),
        };
        rx.deliver(PullCode(1), 0, &[]).await.unwrap();
        assert_eq!(rx.delivered.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_receiver_is_object_safe() {
        let rx: Arc<dyn Receiver> = Arc::new(CountingReceiver {
            delivered: AtomicU64::new(0),
        });

        let batch = vec![
            Arc::new(MetricEvent::new(PullCode(1), 0, "a")),
            Arc::new(MetricEvent::new(PullCode(1), 0, "b")),
        ];
        rx.deliver(PullCode(1), 0, &batch).await.unwrap();
        assert_eq!(rx.name(), "counting");
    }

    /// Receiver that always fails - for testing error handling
    struct FailingReceiver;

    #[async_trait::async_trait]
    impl Receiver for FailingReceiver {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn deliver(
            &self,
            _code: PullCode,
            _timestamp_ms: u64,
            _events: &[Arc<MetricEvent>],
        ) -> Result<(), PluginError> {
            Err(PluginError::Deliver("always fails".to_string()))
        }
    }

    #[tokio::test]
    async fn test_receiver_returns_error() {
        let rx = FailingReceiver;
        let result = rx.deliver(PullCode(1), 0, &[]).await;

        match result {
            Err(PluginError::Deliver(msg)) => assert_eq!(msg, "always fails"),
            _ => panic!("Expected PluginError::Deliver"),
        }
    }
}
