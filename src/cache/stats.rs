//! Cache Statistics Module
//!
//! In-memory counters for hits, misses, expiry and capacity eviction.
//! Counters start at zero each time a cache is opened.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads on absent or expired keys
    pub misses: u64,
    /// Expired rows removed lazily by `get`
    pub lazy_expirations: u64,
    /// Expired rows removed by the sweep after a write
    pub swept: u64,
    /// Rows removed to honour the capacity bound
    pub evictions: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_lazy_expiration(&mut self) {
        self.lazy_expirations += 1;
    }

    /// Adds the outcome of one post-write sweep.
    pub fn record_sweep(&mut self, expired: usize, evicted: usize) {
        self.swept += expired as u64;
        self.evictions += evicted as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_sweep_accumulates() {
        let mut stats = CacheStats::new();
        stats.record_sweep(2, 1);
        stats.record_sweep(0, 3);
        stats.record_lazy_expiration();
        assert_eq!(stats.swept, 2);
        assert_eq!(stats.evictions, 4);
        assert_eq!(stats.lazy_expirations, 1);
    }
}
