use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-slot counters, updated lock-free from the invocation path.
#[derive(Debug, Default)]
pub struct SlotCounters {
    started: AtomicU64,
    rejected: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl SlotCounters {
    pub(crate) fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, ok: bool) {
        let counter = if ok { &self.succeeded } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SlotStats {
        SlotStats {
            started: self.started.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SlotCounters`].
///
/// `started - succeeded - failed` is the number of invocations that are
/// still running or were dropped before completing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SlotStats {
    pub started: u64,
    pub rejected: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Stats for every registered slot, sorted by slot name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metrics {
    slots: BTreeMap<&'static str, SlotStats>,
}

impl Metrics {
    pub(crate) fn insert(&mut self, slot: &'static str, stats: SlotStats) {
        self.slots.insert(slot, stats);
    }

    pub fn slot(&self, name: &str) -> SlotStats {
        self.slots.get(name).copied().unwrap_or_default()
    }

    /// Returns a stable, sorted snapshot suitable for logs.
    pub fn snapshot(&self) -> Vec<(&'static str, SlotStats)> {
        self.slots.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
