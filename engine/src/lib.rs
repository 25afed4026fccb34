//! NOUTO - pull-based metrics scheduling and fan-out engine
//!
//! Maps pull codes to on-demand data sources, lets independent receivers
//! subscribe with their own polling intervals, coalesces those intervals
//! into one minimal alarm cadence, and on every tick pulls each due code
//! at most once and fans the shared batch out to all due receivers with a
//! bucket-aligned timestamp.
//!
//! # Architecture
//!
//! ```text
//! PullSources ──► SourceRegistry ──► PullInvoker ──┐
//!                                                  │ (once per due code)
//! register/unregister ──► ReceiverRegistry ──► PullerManager ──► Receivers (fan-out)
//!                              │                   ▲
//!                              └── request_alarm ──┴── AlarmDriver (tick)
//! ```
//!
//! Sources and receivers are pluggable via the `nouto-core` traits. The
//! engine does not aggregate or persist anything: it schedules pulls and
//! delivers raw batches; receivers own their bucketing.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod alarm;
pub mod clock;
pub mod config;
pub mod error;
pub mod hub;
pub mod puller;
pub mod registry;
pub mod sources;

pub use alarm::{AlarmDriver, AlarmService, WatchAlarm};
pub use clock::{Clock, SystemClock};
pub use config::{Config, LogFormat};
pub use error::{EngineError, PluginError, Result};
pub use hub::{PullHub, PullerManager};
pub use puller::PullInvoker;
pub use registry::{IntervalChange, ReceiverRegistry};
pub use sources::SourceRegistry;

// Re-export core types for plugin authors
pub use nouto_core::{EventBatch, FieldValue, MetricEvent, PullCode, PullSource, Receiver};
