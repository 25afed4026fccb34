//! Engine configuration from environment variables
//!
//! All knobs default sensibly; set `NOUTO_*` variables to override:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `NOUTO_INTERVAL_FLOOR_MS` | `1000` | Minimum accepted receiver interval |
//! | `NOUTO_LOG_LEVEL` | `info` | Tracing filter when `RUST_LOG` is unset |
//! | `NOUTO_LOG_FORMAT` | `pretty` | `pretty` or `json` |

use crate::error::{EngineError, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for development
    Pretty,
    /// Structured JSON lines for log shippers
    Json,
}

/// Engine configuration
///
/// Loaded once at startup via [`Config::from_env`]; the engine never
/// re-reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Floor applied to receiver intervals at registration. Registering
    /// below the floor silently clamps up; a zero interval would arm a
    /// busy timer.
    pub interval_floor_ms: u64,
    /// Tracing filter directive used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from `NOUTO_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let interval_floor_ms = parse_interval_floor(std::env::var("NOUTO_INTERVAL_FLOOR_MS").ok())?;
        let log_format = parse_log_format(std::env::var("NOUTO_LOG_FORMAT").ok())?;
        let log_level = std::env::var("NOUTO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            interval_floor_ms,
            log_level,
            log_format,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_floor_ms: 1000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_interval_floor(raw: Option<String>) -> Result<u64> {
    match raw {
        None => Ok(1000),
        Some(s) => {
            let ms: u64 = s
                .parse()
                .map_err(|_| EngineError::Config(format!("invalid NOUTO_INTERVAL_FLOOR_MS: {s:?}")))?;
            // 0 would disable the floor entirely; clamp to 1ms.
            Ok(ms.max(1))
        }
    }
}

fn parse_log_format(raw: Option<String>) -> Result<LogFormat> {
    match raw.as_deref() {
        None | Some("pretty") => Ok(LogFormat::Pretty),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(EngineError::Config(format!(
            "invalid NOUTO_LOG_FORMAT: {other:?} (expected \"pretty\" or \"json\")"
        ))),
    }
}
