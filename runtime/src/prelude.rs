//! Convenience re-exports for engine authors.
//!
//! ```rust
//! use nouto_runtime::prelude::*;
//! ```

// Core types
pub use nouto_core::{EventBatch, FieldValue, MetricEvent, PullCode};

// Plugin traits
pub use nouto_core::{PluginError, PullSource, Receiver};

// Engine builder and manager
pub use nouto_engine::{PullHub, PullerManager};

// Alarm boundary
pub use nouto_engine::{AlarmDriver, AlarmService, WatchAlarm};

// Configuration
pub use nouto_engine::{Config, LogFormat};

// Error types
pub use nouto_engine::{EngineError, Result};

// Zero-copy payload
pub use bytes::Bytes;

// Runtime
pub use crate::RuntimeBuilder;
