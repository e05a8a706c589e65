//! Cache Statistics Module
//!
//! Tracks cache performance counters: hits, misses, evictions, replacements.

use serde::Serialize;

// == Cache Stats ==
/// Performance counters for a cache instance.
///
/// Counters are observability state, not cache state: a lookup miss bumps
/// `misses` but leaves the cache's indices and age counters untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for absent keys
    pub misses: u64,
    /// Number of records evicted to make room for a new key
    pub evictions: u64,
    /// Number of resident keys overwritten in place
    pub replacements: u64,
    /// Current number of resident records
    pub resident: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the lookup hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Replacement ==
    /// Increments the replacement counter.
    pub fn record_replacement(&mut self) {
        self.replacements += 1;
    }

    // == Update Resident Count ==
    /// Updates the resident record count.
    pub fn set_resident(&mut self, count: usize) {
        self.resident = count;
    }
}
