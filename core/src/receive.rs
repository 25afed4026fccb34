//! Receiver trait for NOUTO plugins
//!
//! The [`Receiver`] trait defines the interface for accepting pulled event
//! batches. Receivers are the output side of the NOUTO engine: every
//! receiver that is due in a tick gets the same shared batch in a fan-out
//! pattern.

use std::sync::Arc;

use async_trait::async_trait;

use crate::code::PullCode;
use crate::error::PluginError;
use crate::event::MetricEvent;

/// Receiver trait - accepts batches of pulled events
///
/// Receivers subscribe to a pull code with a desired interval; the engine
/// coalesces intervals and delivers to every due receiver once per tick.
/// The engine holds only a weak handle: the registering caller owns the
/// receiver's lifetime and may unregister (or simply drop it) at any time,
/// including from within a delivery.
///
/// # Implementation Requirements
///
/// - Receivers must be `Send + Sync` for use across async tasks
/// - `deliver` runs on the engine's tick path; queue internally and return
///   promptly rather than doing slow work inline
/// - Receivers sharing a pull code in one tick see the identical batch —
///   do not mutate events, the `Arc` handles are shared
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use nouto_core::{MetricEvent, PullCode, PluginError, Receiver};
/// use async_trait::async_trait;
///
/// struct GaugeAggregator {
///     tx: tokio::sync::mpsc::Sender<Vec<Arc<MetricEvent>>>,
/// }
///
/// #[async_trait]
/// impl Receiver for GaugeAggregator {
///     fn name(&self) -> &'static str {
///         "gauge-aggregator"
///     }
///
///     async fn deliver(
///         &self,
///         _code: PullCode,
///         _timestamp_ms: u64,
///         events: &[Arc<MetricEvent>],
///     ) -> Result<(), PluginError> {
///         self.tx
///             .try_send(events.to_vec())
///             .map_err(|e| PluginError::Deliver(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Returns the receiver's name for identification and logging
    ///
    /// Prefer short, descriptive names (e.g. "gauge-agg", "uploader").
    fn name(&self) -> &'static str;

    /// Accept a batch of events for a pull code and timestamp
    ///
    /// # Arguments
    ///
    /// * `code` - The pull code this batch was produced for
    /// * `timestamp_ms` - Bucket-aligned tick timestamp shared by every
    ///   receiver in this tick
    /// * `events` - Shared read-only event handles. May be empty.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Batch accepted; the engine records the pull time and
    ///   will not redeliver until the receiver's interval elapses again
    /// * `Err(PluginError)` - Batch rejected; the pull time is NOT
    ///   advanced, so the receiver is due again on the next tick
    async fn deliver(
        &self,
        code: PullCode,
        timestamp_ms: u64,
        events: &[Arc<MetricEvent>],
    ) -> Result<(), PluginError>;
}
