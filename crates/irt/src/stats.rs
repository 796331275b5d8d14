//! Stats Module - Table Activity Counters
//!
//! Counters are relaxed atomics so lookups (`&self`) can record failures
//! without a lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// IrtStats - per-table operation counters
#[derive(Debug, Default)]
pub struct IrtStats {
    adds: AtomicU64,
    fast_appends: AtomicU64,
    holes_reused: AtomicU64,
    removes: AtomicU64,
    rejected_removes: AtomicU64,
    grows: AtomicU64,
    invalid_lookups: AtomicU64,
    segment_pushes: AtomicU64,
    segment_pops: AtomicU64,
    peak_entries: AtomicUsize,
}

impl IrtStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_add(&self, top_index: usize, reused_hole: bool) {
        self.adds.fetch_add(1, Ordering::Relaxed);
        if reused_hole {
            self.holes_reused.fetch_add(1, Ordering::Relaxed);
        }
        self.peak_entries.fetch_max(top_index, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_fast_append(&self, top_index: usize) {
        self.fast_appends.fetch_add(1, Ordering::Relaxed);
        self.peak_entries.fetch_max(top_index, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_remove(&self, removed: bool) {
        if removed {
            self.removes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected_removes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_grow(&self) {
        self.grows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_lookup(&self) {
        self.invalid_lookups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_push(&self) {
        self.segment_pushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_pop(&self) {
        self.segment_pops.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> IrtStatsSnapshot {
        IrtStatsSnapshot {
            adds: self.adds.load(Ordering::Relaxed),
            fast_appends: self.fast_appends.load(Ordering::Relaxed),
            holes_reused: self.holes_reused.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            rejected_removes: self.rejected_removes.load(Ordering::Relaxed),
            grows: self.grows.load(Ordering::Relaxed),
            invalid_lookups: self.invalid_lookups.load(Ordering::Relaxed),
            segment_pushes: self.segment_pushes.load(Ordering::Relaxed),
            segment_pops: self.segment_pops.load(Ordering::Relaxed),
            peak_entries: self.peak_entries.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.adds,
            &self.fast_appends,
            &self.holes_reused,
            &self.removes,
            &self.rejected_removes,
            &self.grows,
            &self.invalid_lookups,
            &self.segment_pushes,
            &self.segment_pops,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.peak_entries.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of table counters
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IrtStatsSnapshot {
    /// Entries stored through the full add path
    pub adds: u64,
    /// Entries stored through the fast append path
    pub fast_appends: u64,
    /// Adds that reused a hole instead of appending
    pub holes_reused: u64,
    /// Successful removals
    pub removes: u64,
    /// Removals rejected as stale, deleted or out of segment
    pub rejected_removes: u64,
    /// Backing storage growths
    pub grows: u64,
    /// Lookups that failed validation
    pub invalid_lookups: u64,
    pub segment_pushes: u64,
    pub segment_pops: u64,
    /// Highest top index observed
    pub peak_entries: usize,
}

impl std::fmt::Display for IrtStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IrtStats {{ adds: {}, appends: {}, holes reused: {}, removes: {}, rejected: {}, grows: {}, invalid lookups: {}, pushes: {}, pops: {}, peak: {} }}",
            self.adds,
            self.fast_appends,
            self.holes_reused,
            self.removes,
            self.rejected_removes,
            self.grows,
            self.invalid_lookups,
            self.segment_pushes,
            self.segment_pops,
            self.peak_entries
        )
    }
}
