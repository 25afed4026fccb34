//! Alarm service boundary and the default tokio timer driver
//!
//! The engine never owns a timer directly. Whenever the global coalesced
//! interval changes it calls [`AlarmService::request_alarm`]; whoever
//! implements the alarm is responsible for invoking
//! [`PullerManager::on_alarm_fired`] at roughly that cadence. Exact timing
//! is not guaranteed — dueness is computed from timestamps, so early, late,
//! or batched firings are all tolerated.
//!
//! The default in-process implementation is a [`WatchAlarm`] feeding an
//! [`AlarmDriver`]: requests flow through a `tokio::sync::watch` channel
//! and the driver runs a `tokio::time::interval` loop, re-arming whenever
//! the requested cadence changes.
//!
//! ```text
//! register/unregister ──► request_alarm(Some(10s) / None)
//!                                 │ (watch channel)
//!                                 ▼
//!                          AlarmDriver::run ──► ticker ──► on_alarm_fired()
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::hub::PullerManager;

/// External alarm collaborator.
///
/// `request_alarm(Some(interval))` arms (or re-arms) the alarm at a new
/// cadence; `request_alarm(None)` cancels it because the last receiver
/// unregistered. Implementations must not block — the call happens on the
/// registration path.
pub trait AlarmService: Send + Sync {
    /// Request a new alarm cadence, or cancel with `None`.
    fn request_alarm(&self, interval: Option<Duration>);
}

/// Default [`AlarmService`] backed by a watch channel.
///
/// The paired receiver half is consumed by an [`AlarmDriver`].
pub struct WatchAlarm {
    tx: watch::Sender<Option<Duration>>,
}

impl WatchAlarm {
    /// Create the alarm and its driver-side receiver.
    pub fn channel() -> (Arc<Self>, watch::Receiver<Option<Duration>>) {
        let (tx, rx) = watch::channel(None);
        (Arc::new(Self { tx }), rx)
    }
}

impl AlarmService for WatchAlarm {
    fn request_alarm(&self, interval: Option<Duration>) {
        // A gone driver just means nobody ticks; registration stays valid.
        let _ = self.tx.send(interval);
    }
}

/// Tokio timer loop driving [`PullerManager::on_alarm_fired`].
///
/// Spawn with `tokio::spawn(driver.run())`. The first tick after arming
/// fires immediately, so a freshly registered receiver gets its first
/// delivery without waiting a full interval. Stop the driver by aborting
/// its task; the runtime crate does this on shutdown.
pub struct AlarmDriver {
    rx: watch::Receiver<Option<Duration>>,
    manager: Arc<PullerManager>,
}

impl AlarmDriver {
    pub(crate) fn new(rx: watch::Receiver<Option<Duration>>, manager: Arc<PullerManager>) -> Self {
        Self { rx, manager }
    }

    /// Run the driver loop until the alarm channel closes.
    pub async fn run(mut self) {
        info!("Alarm driver started");

        loop {
            let requested = *self.rx.borrow_and_update();
            match requested {
                None => {
                    // Idle: no receivers, nothing to tick.
                    if self.rx.changed().await.is_err() {
                        break;
                    }
                }
                Some(interval) => {
                    let interval = interval.max(Duration::from_millis(1));
                    debug!(interval_ms = interval.as_millis() as u64, "Alarm armed");

                    let mut ticker = tokio::time::interval(interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    loop {
                        tokio::select! {
                            changed = self.rx.changed() => {
                                if changed.is_err() {
                                    info!("Alarm driver stopped");
                                    return;
                                }
                                // Re-arm at the new cadence.
                                break;
                            }
                            _ = ticker.tick() => {
                                self.manager.on_alarm_fired().await;
                            }
                        }
                    }
                }
            }
        }

        info!("Alarm driver stopped");
    }
}
