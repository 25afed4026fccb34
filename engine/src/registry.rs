//! Receiver registry - subscriptions, interval coalescing, due-set scans
//!
//! The registry is the single piece of mutable shared state in the engine.
//! It is touched from two independent call paths: application threads
//! registering and unregistering receivers, and the alarm path scanning for
//! due entries. One exclusive `parking_lot::Mutex` covers both; critical
//! sections contain only map reads/writes, never a source invocation or a
//! receiver delivery.
//!
//! # Ownership
//!
//! The registry holds `Weak<dyn Receiver>` handles. The registering caller
//! owns the receiver; dropping it (or unregistering from within a delivery)
//! is always safe — a handle that no longer upgrades is a detected no-op at
//! delivery time and is pruned on the next mutation of its code's list.
//!
//! # Rules
//!
//! - Entries per pull code keep registration order; the due set and
//!   deliveries are never re-sorted.
//! - Re-registering a (code, receiver) pair replaces the interval in place
//!   and resets the entry to "never pulled".
//! - The coalesced interval of a code is the minimum of its entries'
//!   intervals; the global interval is the minimum across codes, `None`
//!   when the registry is empty. Both are recomputed synchronously under
//!   the lock on every mutation.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use nouto_core::{PullCode, Receiver};
use parking_lot::Mutex;
use tracing::{debug, info};

/// One subscription: a weak receiver handle plus its pull bookkeeping.
struct Entry {
    receiver: Weak<dyn Receiver>,
    /// Receiver name cached at registration so log lines survive a drop.
    name: &'static str,
    interval_ms: u64,
    /// `None` = never pulled; the first tick after registration always
    /// finds the entry due.
    last_pull_ms: Option<u64>,
}

/// A due receiver captured in a tick snapshot.
pub(crate) struct DueReceiver {
    pub receiver: Weak<dyn Receiver>,
    pub name: &'static str,
}

/// All due receivers for one pull code, in registration order.
pub(crate) struct DueCode {
    pub code: PullCode,
    pub receivers: Vec<DueReceiver>,
}

/// Outcome of a registry mutation, as seen by the alarm cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalChange {
    /// The global coalesced interval did not move.
    Unchanged,
    /// The global coalesced interval changed; the scheduler must re-request
    /// the alarm. `now == None` means the registry emptied out (go idle).
    Changed {
        /// Global interval before the mutation
        prev: Option<u64>,
        /// Global interval after the mutation
        now: Option<u64>,
    },
}

/// Thread-safe registry of (pull code → receiver subscriptions).
pub struct ReceiverRegistry {
    inner: Mutex<BTreeMap<PullCode, Vec<Entry>>>,
    /// Floor applied to desired intervals at registration.
    interval_floor_ms: u64,
}

impl ReceiverRegistry {
    /// Create an empty registry with the given interval floor.
    pub fn new(interval_floor_ms: u64) -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            interval_floor_ms: interval_floor_ms.max(1),
        }
    }

    /// Subscribe `receiver` to `code` at the desired interval.
    ///
    /// Inserts a new entry, or — matched by handle identity — replaces the
    /// existing one in place, keeping its position in registration order
    /// and resetting it to "never pulled" so the next tick delivers.
    pub fn register(
        &self,
        code: PullCode,
        receiver: &Arc<dyn Receiver>,
        interval: Duration,
    ) -> IntervalChange {
        let interval_ms = (interval.as_millis().min(u128::from(u64::MAX)) as u64)
            .max(self.interval_floor_ms);
        let handle = Arc::downgrade(receiver);

        let mut inner = self.inner.lock();
        let prev = global_interval(&inner);

        let entries = inner.entry(code).or_default();
        entries.retain(|e| e.receiver.strong_count() > 0);

        match entries
            .iter_mut()
            .find(|e| Weak::ptr_eq(&e.receiver, &handle))
        {
            Some(entry) => {
                debug!(
                    code = %code,
                    receiver = receiver.name(),
                    interval_ms,
                    "Re-registered receiver, interval replaced"
                );
                entry.interval_ms = interval_ms;
                entry.last_pull_ms = None;
            }
            None => {
                info!(
                    code = %code,
                    receiver = receiver.name(),
                    interval_ms,
                    "Registered receiver"
                );
                entries.push(Entry {
                    receiver: handle,
                    name: receiver.name(),
                    interval_ms,
                    last_pull_ms: None,
                });
            }
        }

        let now = global_interval(&inner);
        interval_change(prev, now)
    }

    /// Remove `receiver`'s subscription to `code`.
    ///
    /// A pair that was never registered is a silent no-op. When the last
    /// entry for a code goes away the code is removed entirely.
    pub fn unregister(&self, code: PullCode, receiver: &Arc<dyn Receiver>) -> IntervalChange {
        let handle = Arc::downgrade(receiver);

        let mut inner = self.inner.lock();
        let prev = global_interval(&inner);

        if let Some(entries) = inner.get_mut(&code) {
            entries.retain(|e| e.receiver.strong_count() > 0);
            if let Some(pos) = entries
                .iter()
                .position(|e| Weak::ptr_eq(&e.receiver, &handle))
            {
                entries.remove(pos);
                info!(code = %code, receiver = receiver.name(), "Unregistered receiver");
            }
            if entries.is_empty() {
                inner.remove(&code);
            }
        }

        let now = global_interval(&inner);
        interval_change(prev, now)
    }

    /// Global coalesced interval: minimum across every subscription, `None`
    /// when the registry is empty.
    pub fn global_interval_ms(&self) -> Option<u64> {
        global_interval(&self.inner.lock())
    }

    /// Coalesced interval for one code: minimum of its entries' intervals.
    pub fn coalesced_interval_ms(&self, code: PullCode) -> Option<u64> {
        self.inner
            .lock()
            .get(&code)
            .and_then(|entries| entries.iter().map(|e| e.interval_ms).min())
    }

    /// Number of live subscriptions for a code
    pub fn receiver_count(&self, code: PullCode) -> usize {
        self.inner
            .lock()
            .get(&code)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.receiver.strong_count() > 0)
                    .count()
            })
            .unwrap_or(0)
    }

    /// True if no receivers are registered
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot the due set for a tick.
    ///
    /// An entry is due when it was never pulled, or when at least its
    /// interval has elapsed since its last pull. Does not mutate last-pull
    /// times — that happens in [`mark_pulled`](Self::mark_pulled) after
    /// successful delivery. Handles that no longer upgrade are skipped.
    pub(crate) fn due_snapshot(&self, now_ms: u64) -> Vec<DueCode> {
        let inner = self.inner.lock();
        let mut due = Vec::new();

        for (code, entries) in inner.iter() {
            let receivers: Vec<DueReceiver> = entries
                .iter()
                .filter(|e| e.receiver.strong_count() > 0)
                .filter(|e| match e.last_pull_ms {
                    None => true,
                    Some(last) => now_ms.saturating_sub(last) >= e.interval_ms,
                })
                .map(|e| DueReceiver {
                    receiver: Weak::clone(&e.receiver),
                    name: e.name,
                })
                .collect();

            if !receivers.is_empty() {
                due.push(DueCode {
                    code: *code,
                    receivers,
                });
            }
        }

        due
    }

    /// Record a successful delivery: set last-pull for the matching entries.
    ///
    /// Entries unregistered between the snapshot and this call are simply
    /// not found and skipped — the update is atomic with respect to
    /// concurrent register/unregister because it runs under the same lock.
    pub(crate) fn mark_pulled(
        &self,
        code: PullCode,
        delivered: &[Weak<dyn Receiver>],
        now_ms: u64,
    ) {
        let mut inner = self.inner.lock();
        if let Some(entries) = inner.get_mut(&code) {
            for entry in entries.iter_mut() {
                if delivered
                    .iter()
                    .any(|w| Weak::ptr_eq(w, &entry.receiver))
                {
                    entry.last_pull_ms = Some(now_ms);
                }
            }
        }
    }
}

/// Minimum interval across all entries of all codes.
fn global_interval(inner: &BTreeMap<PullCode, Vec<Entry>>) -> Option<u64> {
    inner
        .values()
        .flat_map(|entries| entries.iter().map(|e| e.interval_ms))
        .min()
}

fn interval_change(prev: Option<u64>, now: Option<u64>) -> IntervalChange {
    if prev == now {
        IntervalChange::Unchanged
    } else {
        IntervalChange::Changed { prev, now }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nouto_core::{MetricEvent, PluginError};

    struct NullReceiver;

    #[async_trait::async_trait]
    impl Receiver for NullReceiver {
        fn name(&self) -> &'static str {
            "null"
        }

        async fn deliver(
            &self,
            _code: PullCode,
            _timestamp_ms: u64,
            _events: &[Arc<MetricEvent>],
        ) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn receiver() -> Arc<dyn Receiver> {
        Arc::new(NullReceiver)
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    const CODE: PullCode = PullCode(10);

    #[test]
    fn test_register_arms_global_interval() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();

        let change = registry.register(CODE, &a, secs(60));
        assert_eq!(
            change,
            IntervalChange::Changed {
                prev: None,
                now: Some(60_000)
            }
        );
        assert_eq!(registry.global_interval_ms(), Some(60_000));
    }

    #[test]
    fn test_coalesced_interval_is_minimum() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let b = receiver();

        registry.register(CODE, &a, secs(60));
        let change = registry.register(CODE, &b, secs(10));
        assert_eq!(
            change,
            IntervalChange::Changed {
                prev: Some(60_000),
                now: Some(10_000)
            }
        );
        assert_eq!(registry.coalesced_interval_ms(CODE), Some(10_000));

        // Removing the faster receiver relaxes the interval back.
        let change = registry.unregister(CODE, &b);
        assert_eq!(
            change,
            IntervalChange::Changed {
                prev: Some(10_000),
                now: Some(60_000)
            }
        );
        assert_eq!(registry.coalesced_interval_ms(CODE), Some(60_000));
    }

    #[test]
    fn test_global_interval_spans_codes() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let b = receiver();

        registry.register(PullCode(10), &a, secs(60));
        registry.register(PullCode(11), &b, secs(5));

        assert_eq!(registry.global_interval_ms(), Some(5_000));
        assert_eq!(registry.coalesced_interval_ms(PullCode(10)), Some(60_000));
    }

    #[test]
    fn test_unregister_last_receiver_goes_idle() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();

        registry.register(CODE, &a, secs(60));
        let change = registry.unregister(CODE, &a);
        assert_eq!(
            change,
            IntervalChange::Changed {
                prev: Some(60_000),
                now: None
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_pair_is_noop() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let stranger = receiver();

        registry.register(CODE, &a, secs(60));

        assert_eq!(
            registry.unregister(CODE, &stranger),
            IntervalChange::Unchanged
        );
        assert_eq!(
            registry.unregister(PullCode(999), &a),
            IntervalChange::Unchanged
        );
        assert_eq!(registry.receiver_count(CODE), 1);
    }

    #[test]
    fn test_reregister_replaces_interval_idempotently() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();

        registry.register(CODE, &a, secs(60));
        registry.register(CODE, &a, secs(10));

        // Still one entry; interval replaced, not appended.
        assert_eq!(registry.receiver_count(CODE), 1);
        assert_eq!(registry.coalesced_interval_ms(CODE), Some(10_000));
    }

    #[test]
    fn test_reregister_resets_last_pull() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();

        registry.register(CODE, &a, secs(60));
        let due = registry.due_snapshot(0);
        registry.mark_pulled(CODE, &collect_handles(&due), 0);
        assert!(registry.due_snapshot(1_000).is_empty());

        // Re-registering makes the entry due again immediately.
        registry.register(CODE, &a, secs(60));
        assert_eq!(registry.due_snapshot(1_000).len(), 1);
    }

    #[test]
    fn test_interval_floor_clamps() {
        let registry = ReceiverRegistry::new(1000);
        let a = receiver();

        registry.register(CODE, &a, Duration::from_millis(1));
        assert_eq!(registry.coalesced_interval_ms(CODE), Some(1000));
    }

    #[test]
    fn test_never_pulled_is_due_regardless_of_now() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        registry.register(CODE, &a, secs(60));

        // Due at t=0 even though no interval has elapsed.
        let due = registry.due_snapshot(0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].code, CODE);
        assert_eq!(due[0].receivers.len(), 1);
    }

    #[test]
    fn test_due_respects_interval_after_pull() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        registry.register(CODE, &a, secs(60));

        let due = registry.due_snapshot(0);
        registry.mark_pulled(CODE, &collect_handles(&due), 0);

        assert!(registry.due_snapshot(30_000).is_empty());
        assert_eq!(registry.due_snapshot(60_000).len(), 1);
    }

    #[test]
    fn test_due_snapshot_does_not_mutate() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        registry.register(CODE, &a, secs(60));

        // Scanning twice without marking keeps the entry due.
        assert_eq!(registry.due_snapshot(0).len(), 1);
        assert_eq!(registry.due_snapshot(0).len(), 1);
    }

    #[test]
    fn test_due_set_keeps_registration_order() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let b = receiver();
        let c = receiver();

        registry.register(CODE, &b, secs(10));
        registry.register(CODE, &a, secs(10));
        registry.register(CODE, &c, secs(10));

        let due = registry.due_snapshot(0);
        let handles: Vec<_> = due[0].receivers.iter().map(|d| &d.receiver).collect();
        assert!(Weak::ptr_eq(handles[0], &Arc::downgrade(&b)));
        assert!(Weak::ptr_eq(handles[1], &Arc::downgrade(&a)));
        assert!(Weak::ptr_eq(handles[2], &Arc::downgrade(&c)));
    }

    #[test]
    fn test_mark_pulled_skips_unregistered() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let b = receiver();

        registry.register(CODE, &a, secs(10));
        registry.register(CODE, &b, secs(10));

        let due = registry.due_snapshot(0);
        let handles = collect_handles(&due);

        // b unregisters between snapshot and mark; a's update still lands.
        registry.unregister(CODE, &b);
        registry.mark_pulled(CODE, &handles, 0);

        assert!(registry.due_snapshot(5_000).is_empty());
        assert_eq!(registry.receiver_count(CODE), 1);
    }

    #[test]
    fn test_dropped_receiver_skipped_and_pruned() {
        let registry = ReceiverRegistry::new(1);
        let a = receiver();
        let b = receiver();

        registry.register(CODE, &a, secs(10));
        registry.register(CODE, &b, secs(10));

        // Caller drops its receiver without unregistering.
        drop(b);

        let due = registry.due_snapshot(0);
        assert_eq!(due[0].receivers.len(), 1);

        // Next mutation prunes the dead entry.
        registry.register(CODE, &a, secs(10));
        assert_eq!(registry.receiver_count(CODE), 1);
    }

    fn collect_handles(due: &[DueCode]) -> Vec<Weak<dyn Receiver>> {
        due.iter()
            .flat_map(|d| d.receivers.iter().map(|r| Weak::clone(&r.receiver)))
            .collect()
    }
}
