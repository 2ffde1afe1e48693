// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a near cache since it was built.
///
/// Obtained from `NearCacheService::stats`. Each field is read independently, so a
/// snapshot taken under load is not a consistent cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct NearCacheStats {
    /// Reads served from the local tier.
    pub hits: u64,
    /// Reads that went to the remote cache.
    pub misses: u64,
    /// Fetched values that were made visible locally.
    pub admissions: u64,
    /// Fetched values that were discarded because the key was invalidated during the fetch.
    pub abandoned_admissions: u64,
    /// Invalidation events applied for single keys.
    pub invalidations: u64,
    /// Local removals issued ahead of remote writes.
    pub preemptive_removes: u64,
    /// Entries dropped by the local tier to honour its bound.
    pub evictions: u64,
    /// Times the whole local state was dropped.
    pub full_resets: u64,
    /// Membership filters the server accepted.
    pub filter_syncs: u64,
    /// Membership filter pushes that failed.
    pub failed_filter_syncs: u64,
}

impl NearCacheStats {
    /// Returns hits divided by reads, or `0.0` when nothing was read.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            return 0.0;
        }

        #[expect(clippy::cast_precision_loss, reason = "ratio of counters, precision loss is acceptable")]
        let ratio = self.hits as f64 / reads as f64;
        ratio
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) admissions: AtomicU64,
    pub(crate) abandoned_admissions: AtomicU64,
    pub(crate) invalidations: AtomicU64,
    pub(crate) preemptive_removes: AtomicU64,
    pub(crate) full_resets: AtomicU64,
    pub(crate) filter_syncs: AtomicU64,
    pub(crate) failed_filter_syncs: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, evictions: u64) -> NearCacheStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        NearCacheStats {
            hits: load(&self.hits),
            misses: load(&self.misses),
            admissions: load(&self.admissions),
            abandoned_admissions: load(&self.abandoned_admissions),
            invalidations: load(&self.invalidations),
            preemptive_removes: load(&self.preemptive_removes),
            evictions,
            full_resets: load(&self.full_resets),
            filter_syncs: load(&self.filter_syncs),
            failed_filter_syncs: load(&self.failed_filter_syncs),
        }
    }
}
