//! PullHub - builder and alarm-driven scheduler for NOUTO
//!
//! The hub wires sources, registries, and the alarm into a
//! [`PullerManager`]: one explicitly constructed instance owned by the
//! process's composition root and shared by handle — "exactly one per
//! process" without hidden global state.
//!
//! # Example
//!
//! ```ignore
//! use nouto_engine::PullHub;
//!
//! let (manager, driver) = PullHub::new()
//!     .source(WakelockSource::new())
//!     .source(NetstatsSource::new())
//!     .build();
//!
//! tokio::spawn(driver.run());
//! manager.register_receiver(PullCode(20), &receiver, Duration::from_secs(60));
//! ```
//!
//! # Scheduler states
//!
//! ```text
//! Idle ──register──► Armed ──OnAlarmFired──► Ticking ──► Armed
//!   ▲                  │  ▲______________________________│
//!   └──unregister──────┘     (interval changes re-arm in place)
//! ```
//!
//! `Idle`: no receivers, alarm cancelled. `Armed`: alarm requested at the
//! global coalesced interval. `Ticking`: the transient body of
//! [`PullerManager::on_alarm_fired`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use nouto_core::{EventBatch, PullCode, PullSource, Receiver};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmDriver, AlarmService, WatchAlarm};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::puller::PullInvoker;
use crate::registry::{IntervalChange, ReceiverRegistry};
use crate::sources::SourceRegistry;

/// Builder for the pull engine
///
/// Collects sources and knobs, then [`build`](PullHub::build)s the manager
/// plus its default timer driver. No YAML, just code.
pub struct PullHub {
    sources: Vec<Arc<dyn PullSource>>,
    interval_floor_ms: u64,
    clock: Arc<dyn Clock>,
}

impl PullHub {
    /// Create a new hub with default settings
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            interval_floor_ms: 1000,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a hub pre-configured from engine [`Config`]
    pub fn from_config(config: &Config) -> Self {
        Self::new().interval_floor_ms(config.interval_floor_ms)
    }

    /// Add a pull source
    ///
    /// Sources are fixed at build time; the manager never replaces one.
    pub fn source<S: PullSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Add a pull source (Arc version)
    pub fn source_arc(mut self, source: Arc<dyn PullSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Set the floor applied to receiver intervals at registration
    ///
    /// Default is 1000 ms. Clamped to at least 1 ms; a zero interval would
    /// arm a busy timer.
    pub fn interval_floor_ms(mut self, ms: u64) -> Self {
        self.interval_floor_ms = ms.max(1);
        self
    }

    /// Override the clock (for testing)
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Build the manager together with the default tokio timer driver.
    ///
    /// Spawn the driver with `tokio::spawn(driver.run())`; abort its task
    /// to stop ticking.
    pub fn build(self) -> (Arc<PullerManager>, AlarmDriver) {
        let (alarm, rx) = WatchAlarm::channel();
        let manager = self.build_with_alarm(alarm);
        let driver = AlarmDriver::new(rx, Arc::clone(&manager));
        (manager, driver)
    }

    /// Build the manager against an external [`AlarmService`].
    ///
    /// For deployments where an outside collaborator owns the timer: it
    /// receives `request_alarm` calls and is responsible for invoking
    /// [`PullerManager::on_alarm_fired`] at roughly that cadence.
    pub fn build_with_alarm(self, alarm: Arc<dyn AlarmService>) -> Arc<PullerManager> {
        let sources = Arc::new(SourceRegistry::new(self.sources));
        // Epoch: the moment the scheduler becomes active. Every delivered
        // timestamp is quantized against it so aggregation windows line up
        // across independently registered metrics.
        let epoch_ms = self.clock.now_ms();

        info!(
            sources = sources.len(),
            epoch_ms,
            interval_floor_ms = self.interval_floor_ms,
            "Pull engine built"
        );

        Arc::new(PullerManager {
            invoker: PullInvoker::new(Arc::clone(&sources)),
            sources,
            receivers: ReceiverRegistry::new(self.interval_floor_ms),
            alarm,
            clock: self.clock,
            epoch_ms,
        })
    }
}

impl Default for PullHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The alarm-driven scheduler: registrations, interval coalescing, and
/// per-tick pull fan-out. Lives for the process lifetime.
pub struct PullerManager {
    sources: Arc<SourceRegistry>,
    invoker: PullInvoker,
    receivers: ReceiverRegistry,
    alarm: Arc<dyn AlarmService>,
    clock: Arc<dyn Clock>,
    /// First moment the scheduler became active; bucket-alignment anchor.
    epoch_ms: u64,
}

impl PullerManager {
    /// Subscribe a receiver to a pull code at the desired interval.
    ///
    /// Idempotent for the same (code, receiver) pair — the interval is
    /// replaced. If the global coalesced interval changes, the alarm is
    /// re-requested at the new cadence.
    pub fn register_receiver(
        &self,
        code: PullCode,
        receiver: &Arc<dyn Receiver>,
        interval: Duration,
    ) {
        let change = self.receivers.register(code, receiver, interval);
        self.apply_interval_change(change);
    }

    /// Remove a receiver's subscription. Unknown pairs are a silent no-op.
    pub fn unregister_receiver(&self, code: PullCode, receiver: &Arc<dyn Receiver>) {
        let change = self.receivers.unregister(code, receiver);
        self.apply_interval_change(change);
    }

    /// Translate a metric name to its pull code.
    ///
    /// Fixed table built at construction; case-sensitive exact match;
    /// unknown names yield `None`.
    pub fn pull_code(&self, name: &str) -> Option<PullCode> {
        self.sources.code_for(name)
    }

    /// Direct query path: pull one batch for `code` right now.
    ///
    /// May run concurrently with an in-flight alarm tick — sources must
    /// tolerate that. Does not touch receiver bookkeeping; a failed or
    /// unknown pull yields an empty batch.
    pub async fn pull(&self, code: PullCode, timestamp_ms: u64) -> EventBatch {
        self.invoker
            .pull(code, timestamp_ms)
            .await
            .unwrap_or_default()
    }

    /// Process one alarm tick: find due receivers, pull each due code once,
    /// fan the shared batch out, then advance last-pull times.
    pub async fn on_alarm_fired(&self) {
        // One "now" for the whole tick: every receiver processed here sees
        // a consistent time.
        let now_ms = self.clock.now_ms();
        let stamp_ms = self.bucket_timestamp(now_ms);

        // The registry lock is held only inside the snapshot, never across
        // a source invocation or a delivery.
        let due = self.receivers.due_snapshot(now_ms);
        if due.is_empty() {
            debug!(now_ms, "Alarm tick, nothing due");
            return;
        }

        debug!(now_ms, stamp_ms, codes = due.len(), "Alarm tick");

        for due_code in due {
            let code = due_code.code;

            // At most one source invocation per code per tick; every due
            // receiver below shares this exact batch.
            let events = match self.invoker.pull(code, stamp_ms).await {
                Ok(events) => events,
                // Already logged by the invoker; other due codes still run.
                Err(_) => continue,
            };

            let mut delivered: Vec<Weak<dyn Receiver>> =
                Vec::with_capacity(due_code.receivers.len());

            for due_rx in due_code.receivers {
                // A receiver unregistered (or dropped) since the snapshot
                // no longer upgrades: detected no-op.
                let Some(receiver) = due_rx.receiver.upgrade() else {
                    debug!(
                        code = %code,
                        receiver = due_rx.name,
                        "Receiver gone before delivery, skipping"
                    );
                    continue;
                };

                match receiver.deliver(code, stamp_ms, &events).await {
                    Ok(()) => delivered.push(due_rx.receiver),
                    Err(e) => warn!(
                        code = %code,
                        receiver = due_rx.name,
                        error = %e,
                        "Delivery failed, receiver stays due"
                    ),
                }
            }

            if !delivered.is_empty() {
                self.receivers.mark_pulled(code, &delivered, now_ms);
            }
        }
    }

    /// The receiver registry, for inspection
    pub fn registry(&self) -> &ReceiverRegistry {
        &self.receivers
    }

    /// Bucket-alignment anchor: the moment this manager was built
    pub fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    fn apply_interval_change(&self, change: IntervalChange) {
        if let IntervalChange::Changed { prev, now } = change {
            match (prev, now) {
                (None, Some(ms)) => info!(interval_ms = ms, "Scheduler armed"),
                (Some(_), Some(ms)) => debug!(interval_ms = ms, "Alarm re-armed"),
                (Some(_), None) => info!("Scheduler idle, alarm cancelled"),
                (None, None) => {}
            }
            self.alarm.request_alarm(now.map(Duration::from_millis));
        }
    }

    /// Quantize `now_ms` to a bucket boundary: epoch plus a whole number of
    /// coalesced intervals. Falls back to `now_ms` when nothing is armed.
    fn bucket_timestamp(&self, now_ms: u64) -> u64 {
        match self.receivers.global_interval_ms() {
            Some(interval_ms) if interval_ms > 0 => {
                let elapsed = now_ms.saturating_sub(self.epoch_ms);
                self.epoch_ms + (elapsed / interval_ms) * interval_ms
            }
            _ => now_ms,
        }
    }
}
