//! NOUTO Runtime — injectable engine lifecycle
//!
//! Provides [`run()`] for zero-boilerplate engine startup, and
//! [`RuntimeBuilder`] for users who need a registration hook or custom
//! wiring.
//!
//! # Quick start
//!
//! ```ignore
//! use nouto_runtime::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     nouto_runtime::run(|hub| async move {
//!         Ok(hub.source(WakelockSource::new()))
//!     }).await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod prelude;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use nouto_engine::config::{Config, LogFormat};
use nouto_engine::hub::{PullHub, PullerManager};
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type ReadyHook = Box<
    dyn FnOnce(Arc<PullerManager>) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

/// Run a NOUTO engine with default settings.
///
/// Loads configuration from environment variables, initialises tracing,
/// calls your closure to wire up the sources, then runs the alarm driver
/// with graceful shutdown.
///
/// # Example
///
/// ```ignore
/// nouto_runtime::run(|hub| async move {
///     Ok(hub
///         .source(WakelockSource::new())
///         .source(NetstatsSource::new()))
/// }).await
/// ```
pub async fn run<F, Fut>(configure: F) -> anyhow::Result<()>
where
    F: FnOnce(PullHub) -> Fut,
    Fut: Future<Output = anyhow::Result<PullHub>>,
{
    RuntimeBuilder::new().configure(configure).await
}

/// Power-user builder for controlling runtime behaviour.
///
/// Use this when you need to register receivers at startup via
/// [`on_ready`](RuntimeBuilder::on_ready), or run without installing the
/// process-wide tracing subscriber.
///
/// # Example
///
/// ```ignore
/// RuntimeBuilder::new()
///     .on_ready(|manager| async move {
///         manager.register_receiver(PullCode(20), &receiver, Duration::from_secs(60));
///         Ok(())
///     })
///     .configure(|hub| async move {
///         Ok(hub.source(WakelockSource::new()))
///     })
///     .await
/// ```
pub struct RuntimeBuilder {
    tracing_enabled: bool,
    ready: Option<ReadyHook>,
}

impl RuntimeBuilder {
    /// Create a new builder with defaults from environment variables.
    pub fn new() -> Self {
        Self {
            tracing_enabled: true,
            ready: None,
        }
    }

    /// Skip installing the process-wide tracing subscriber.
    ///
    /// Useful when embedding NOUTO in a host application that owns its
    /// own subscriber.
    pub fn disable_tracing(mut self) -> Self {
        self.tracing_enabled = false;
        self
    }

    /// Hook invoked with the built manager, before waiting for shutdown.
    ///
    /// This is where startup receiver registrations belong: the alarm
    /// driver is already ticking when the hook runs.
    pub fn on_ready<R, RFut>(mut self, ready: R) -> Self
    where
        R: FnOnce(Arc<PullerManager>) -> RFut + Send + 'static,
        RFut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.ready = Some(Box::new(move |manager| Box::pin(ready(manager))));
        self
    }

    /// Configure the engine and run it to completion.
    ///
    /// This is the terminal method — it blocks until shutdown.
    pub async fn configure<F, Fut>(self, configure: F) -> anyhow::Result<()>
    where
        F: FnOnce(PullHub) -> Fut,
        Fut: Future<Output = anyhow::Result<PullHub>>,
    {
        // ── 1. Load config from env ──────────────────────────────
        let config = Config::from_env()?;

        // ── 2. Init tracing ──────────────────────────────────────
        if self.tracing_enabled {
            init_tracing(&config);
        }

        info!(
            interval_floor_ms = config.interval_floor_ms,
            "Starting NOUTO"
        );

        // ── 3. Pre-configure hub from env ────────────────────────
        let hub = PullHub::from_config(&config);

        // ── 4. User configures the hub ───────────────────────────
        let hub = configure(hub).await?;

        // ── 5. Build and spawn the alarm driver ──────────────────
        let (manager, driver) = hub.build();
        let driver_handle = tokio::spawn(driver.run());

        // ── 6. Startup registrations ─────────────────────────────
        if let Some(ready) = self.ready {
            ready(Arc::clone(&manager)).await?;
        }

        // ── 7. Wait for shutdown signal ──────────────────────────
        shutdown_signal().await;

        // ── 8. Shutdown ──────────────────────────────────────────
        driver_handle.abort();
        info!("NOUTO shutdown complete");

        Ok(())
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialise the tracing subscriber based on config.
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
