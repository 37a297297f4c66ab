//! Hit/miss accounting for cache stores.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free hit/miss counters.
#[derive(Debug, Default)]
pub struct StatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Point-in-time copy of a [`StatsTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitStats {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub hit_rate: f64,
}

impl HitStats {
    /// Combine counters from several trackers; the rate is recomputed.
    pub fn merge(self, other: HitStats) -> HitStats {
        let hits = self.hits + other.hits;
        let misses = self.misses + other.misses;
        HitStats {
            hits,
            misses,
            total: hits + misses,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits(), self.misses())
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HitStats {
        let hits = self.hits();
        let misses = self.misses();
        HitStats {
            hits,
            misses,
            total: hits + misses,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_without_requests() {
        let stats = StatsTracker::new();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn hit_rate_counts_both_outcomes() {
        let stats = StatsTracker::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.total(), 4);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_recomputes_rate() {
        let a = HitStats {
            hits: 1,
            misses: 0,
            total: 1,
            hit_rate: 1.0,
        };
        let b = HitStats {
            hits: 0,
            misses: 3,
            total: 3,
            hit_rate: 0.0,
        };
        let merged = a.merge(b);
        assert_eq!(merged.total, 4);
        assert!((merged.hit_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_clears_counters() {
        let stats = StatsTracker::new();
        stats.record_miss();
        stats.reset();
        assert_eq!(stats.snapshot(), HitStats::default());
    }
}
