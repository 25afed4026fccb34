//! PullSource trait for NOUTO plugins
//!
//! The [`PullSource`] trait defines the interface for producing a batch of
//! raw metric data on demand. Sources are the input side of the NOUTO
//! engine: the scheduler asks a source for data at most once per tick, and
//! the pull invoker parses whatever it returns.

use async_trait::async_trait;
use bytes::Bytes;

use crate::code::PullCode;
use crate::error::PluginError;

/// PullSource trait - produces a raw payload for a timestamp
///
/// Each source owns exactly one [`PullCode`] and is registered once at
/// engine construction. The engine never replaces a source; it lives for
/// the process lifetime.
///
/// # Implementation Requirements
///
/// - Sources must be `Send + Sync` for use across async tasks
/// - `pull` may be invoked concurrently for the same code (the direct query
///   path can overlap an alarm tick) — any internal caching must be safe
///   under that
/// - `pull` may block on external I/O, but its latency must be bounded by
///   the collaborator's own timeout, never the engine's
///
/// # Example
///
/// ```ignore
/// use nouto_core::{PullCode, PullSource, PluginError};
/// use async_trait::async_trait;
/// use bytes::Bytes;
///
/// struct WakelockSource;
///
/// #[async_trait]
/// impl PullSource for WakelockSource {
///     fn name(&self) -> &'static str {
///         "wakelocks"
///     }
///
///     fn code(&self) -> PullCode {
///         PullCode(20)
///     }
///
///     fn metric_names(&self) -> &'static [&'static str] {
///         &["kernel.wakelocks"]
///     }
///
///     async fn pull(&self, timestamp_ms: u64) -> Result<Bytes, PluginError> {
///         let raw = read_wakelock_stats(timestamp_ms)
///             .map_err(|e| PluginError::Unavailable(e.to_string()))?;
///         Ok(Bytes::from(raw))
///     }
/// }
/// ```
#[async_trait]
pub trait PullSource: Send + Sync {
    /// Returns the source's name for identification and logging
    ///
    /// This should be a short, descriptive name that uniquely identifies
    /// the source type. Examples: "wakelocks", "netstats", "cpu-freq".
    fn name(&self) -> &'static str;

    /// The pull code this source produces data for
    ///
    /// Exactly one source per code; duplicate codes at registration are
    /// rejected by the registry (first wins).
    fn code(&self) -> PullCode;

    /// Human-readable metric names that resolve to this source's code
    ///
    /// The engine builds its fixed name→code table from these at
    /// construction. Multiple names can map to the same code (aliases).
    fn metric_names(&self) -> &'static [&'static str];

    /// Produce a raw payload for the given timestamp
    ///
    /// # Arguments
    ///
    /// * `timestamp_ms` - Bucket-aligned request time in milliseconds
    ///
    /// # Returns
    ///
    /// * `Ok(Bytes)` - Opaque payload; format is owned by the source and
    ///   parsed by the engine's pull invoker
    /// * `Err(PluginError)` - Source unreachable or unable to produce data
    ///
    /// # Error Handling
    ///
    /// A failed pull is a soft failure: the engine logs it, delivers
    /// nothing for this code this tick, and retries naturally on the next
    /// tick. Sources should return `PluginError::Unavailable` rather than
    /// fabricating an empty payload.
    async fn pull(&self, timestamp_ms: u64) -> Result<Bytes, PluginError>;
}
