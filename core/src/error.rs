//! Error types for NOUTO plugins

use thiserror::Error;

/// Error type for plugin operations
///
/// This is the standard error type used by all NOUTO plugins, both pull
/// sources and receivers. It provides structured error categories that
/// help with debugging and error handling. No plugin error is fatal to
/// the engine: the worst outcome is a missed or empty delivery for one
/// tick, self-healing on the next.
///
/// # Example
///
/// ```
/// use nouto_core::PluginError;
///
/// fn read_stats() -> Result<Vec<u8>, PluginError> {
///     Err(PluginError::Unavailable("companion service down".to_string()))
/// }
///
/// match read_stats() {
///     Ok(_) => println!("pulled!"),
///     Err(PluginError::Unavailable(msg)) => println!("soft failure: {}", msg),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// Initialization failed
    ///
    /// Returned when a plugin fails to initialize, typically during startup.
    /// Examples: invalid configuration, missing kernel interface.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Source unavailable
    ///
    /// Returned when a pull source cannot reach its backing data.
    /// Examples: service not running, read timeout, permission denied.
    /// The engine treats this as a soft failure and retries next tick.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Malformed payload
    ///
    /// Returned when raw data cannot be parsed into events.
    /// Examples: invalid UTF-8, broken JSON, schema mismatch.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Delivery failed
    ///
    /// Returned when a receiver fails to accept a batch.
    /// Examples: internal queue full, downstream sink closed.
    #[error("delivery failed: {0}")]
    Deliver(String),

    /// Not ready
    ///
    /// Returned when a plugin is accessed before it's ready to handle
    /// requests. This is typically a transient state during startup.
    #[error("plugin not ready")]
    NotReady,

    /// Shutdown error
    ///
    /// Returned when graceful shutdown fails.
    /// Examples: failed to flush buffered batches.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}
