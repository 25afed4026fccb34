//! Error types for the NOUTO engine

use thiserror::Error;

// Re-export PluginError from nouto-core
pub use nouto_core::PluginError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the NOUTO engine
///
/// Nothing in the engine is fatal to the process: these errors surface at
/// the configuration and composition boundary, while per-tick failures are
/// logged and self-heal on the next tick.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Plugin error
    #[error("plugin '{plugin}' error: {message}")]
    Plugin { plugin: String, message: String },
}

impl From<PluginError> for EngineError {
    fn from(err: PluginError) -> Self {
        EngineError::Plugin {
            plugin: "unknown".to_string(),
            message: err.to_string(),
        }
    }
}
