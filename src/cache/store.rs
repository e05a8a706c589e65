//! Cache Store Module
//!
//! Main cache engine combining the key index and the age index with a
//! monotonic recency allocator.
//!
//! Every `get` hit and every `put` consumes one age from a strictly
//! increasing counter; the record involved is re-filed in the age index under
//! the fresh stamp. Eviction removes the record holding the smallest resident
//! age. That minimum is maintained lazily: `oldest_age` only ever walks
//! forward through the sparse age space, so the total scanning work over the
//! cache's lifetime is bounded by the number of ages ever issued, giving
//! amortized O(1) operations.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::record::{Record, RecordArena, RecordHandle};
use crate::cache::{Age, CacheStats, Key, Value, AGE_UNKNOWN};
use crate::error::{CacheError, Result};

// == Touch Kind ==
/// Operation kinds the recency allocator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touch {
    /// A key absent from the cache is being inserted
    Insert,
    /// A resident key is being overwritten; carries its current age
    Replace { current_age: Age },
    /// A resident key was read; its old age entry is already unfiled
    Hit { touched_age: Age },
}

// == Age LRU Cache ==
/// Fixed-capacity LRU cache without a linked list.
///
/// Recency is a monotonically increasing integer stamp. Two indices share
/// every record through its arena handle: `by_key` resolves lookups and
/// `by_age` resolves eviction victims. `oldest_age` is a lazily advanced
/// lower bound on the smallest resident age.
#[derive(Debug)]
pub struct AgeLruCache {
    /// Key index: cache key to arena handle
    by_key: HashMap<Key, RecordHandle>,
    /// Age index: recency stamp to arena handle
    by_age: HashMap<Age, RecordHandle>,
    /// Owns every live record; both indices store handles into it
    records: RecordArena,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of resident records
    capacity: usize,
    /// Most recently issued stamp; starts at 0, never reused
    newest_age: Age,
    /// Smallest resident age, or `AGE_UNKNOWN` until established
    oldest_age: Age,
}

impl AgeLruCache {
    // == Constructor ==
    /// Creates a cache holding at most `capacity` records.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `capacity` is zero: the eviction
    /// loop assumes at least one resident record can always be found.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(CacheError::InvalidConfiguration(format!(
                "capacity must be at least 1, got {}",
                capacity
            )));
        }

        Ok(Self {
            by_key: HashMap::with_capacity(capacity),
            by_age: HashMap::with_capacity(capacity),
            records: RecordArena::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            newest_age: 0,
            oldest_age: AGE_UNKNOWN,
        })
    }

    // == Get ==
    /// Retrieves the value stored under `key` and marks it most recently
    /// used.
    ///
    /// A hit re-files the record under a freshly allocated age. A miss
    /// returns `NotFound` before the allocator runs, so it consumes no age
    /// and leaves the indices untouched.
    pub fn get(&mut self, key: Key) -> Result<Value> {
        let handle = match self.by_key.get(&key) {
            Some(&handle) => handle,
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key));
            }
        };

        // Unfile the record from the age index before allocating, so the
        // allocator sees the age space without it.
        let touched_age = self.records[handle].age;
        self.by_age.remove(&touched_age);

        let new_age = self.allocate_age(Touch::Hit { touched_age });
        self.records[handle].age = new_age;
        self.by_age.insert(new_age, handle);

        self.stats.record_hit();
        let value = self.records[handle].value;
        trace!(key, old_age = touched_age, new_age, "cache hit");

        self.debug_check_counters();
        Ok(value)
    }

    // == Put ==
    /// Stores `value` under `key`, marking it most recently used.
    ///
    /// A resident key is replaced in place: the old record is discarded and a
    /// fresh one filed under the new age, without evicting a neighbor. An
    /// absent key evicts the least recently used record first when the cache
    /// is full.
    pub fn put(&mut self, key: Key, value: Value) {
        let new_age = match self.by_key.get(&key) {
            Some(&handle) => {
                let current_age = self.records[handle].age;
                self.allocate_age(Touch::Replace { current_age })
            }
            None => self.allocate_age(Touch::Insert),
        };

        let handle = self.records.insert(Record {
            key,
            value,
            age: new_age,
        });
        self.by_key.insert(key, handle);
        self.by_age.insert(new_age, handle);

        self.stats.set_resident(self.by_key.len());
        self.debug_check_counters();
    }

    // == Recency Allocator ==
    /// Issues the next recency stamp and keeps `oldest_age` current.
    ///
    /// Always increments `newest_age` first. A replace or an at-capacity
    /// insert then removes its victim from both indices and re-fixes the
    /// oldest-age bound; a hit re-fixes the bound only when the touched
    /// record owned it.
    fn allocate_age(&mut self, touch: Touch) -> Age {
        self.newest_age += 1;

        match touch {
            Touch::Insert if self.by_key.len() >= self.capacity => {
                self.establish_oldest_age();
                if let Some(victim) = self.unfile_record(self.oldest_age) {
                    debug!(
                        key = victim.key,
                        age = victim.age,
                        "evicted least recently used record"
                    );
                    self.stats.record_eviction();
                }
                self.refresh_oldest_age();
            }
            Touch::Replace { current_age } => {
                self.establish_oldest_age();
                if let Some(old) = self.unfile_record(current_age) {
                    trace!(key = old.key, age = old.age, "replacing resident record");
                    self.stats.record_replacement();
                }
                self.refresh_oldest_age();
            }
            Touch::Hit { touched_age } => {
                if self.by_age.is_empty() {
                    self.oldest_age = AGE_UNKNOWN;
                } else if touched_age == self.oldest_age || self.oldest_age == AGE_UNKNOWN {
                    // The touched age is absent from the index but belongs to
                    // a live record about to be re-filed, so skip it.
                    while !self.by_age.contains_key(&self.oldest_age)
                        || self.oldest_age == touched_age
                    {
                        self.oldest_age += 1;
                    }
                }
            }
            // Headroom insert: nothing was removed, the bound still holds.
            Touch::Insert => {}
        }

        self.newest_age
    }

    // == Unfile Record ==
    /// Removes the record filed under `age` from both indices and the arena.
    fn unfile_record(&mut self, age: Age) -> Option<Record> {
        let handle = self.by_age.remove(&age)?;
        let record = self.records.remove(handle)?;
        self.by_key.remove(&record.key);
        Some(record)
    }

    // == Establish Oldest Age ==
    /// Walks `oldest_age` forward from the sentinel to the first resident
    /// age, establishing the lower bound when it is still unknown.
    fn establish_oldest_age(&mut self) {
        if !self.by_age.is_empty() && self.oldest_age == AGE_UNKNOWN {
            while !self.by_age.contains_key(&self.oldest_age) {
                self.oldest_age += 1;
            }
        }
    }

    // == Refresh Oldest Age ==
    /// Re-fixes `oldest_age` after a removal: back to the sentinel when the
    /// index drained, otherwise forward to the next resident age.
    fn refresh_oldest_age(&mut self) {
        if self.by_age.is_empty() {
            self.oldest_age = AGE_UNKNOWN;
        } else {
            while !self.by_age.contains_key(&self.oldest_age) {
                self.oldest_age += 1;
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_resident(self.by_key.len());
        stats
    }

    // == Length ==
    /// Returns the number of resident records.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    // == Is Empty ==
    /// Returns true if no records are resident.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // == Capacity ==
    /// Returns the fixed capacity this cache was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Debug Checks ==
    /// Cheap structural checks, compiled out of release builds.
    fn debug_check_counters(&self) {
        debug_assert_eq!(self.by_key.len(), self.by_age.len());
        debug_assert!(self.by_key.len() <= self.capacity);
        debug_assert!(self.records.len() == self.by_key.len());
        debug_assert!(
            self.oldest_age == AGE_UNKNOWN
                || self.by_age.contains_key(&self.oldest_age)
        );
    }

    /// Exhaustive invariant sweep used by tests after every operation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(
            self.by_key.len(),
            self.by_age.len(),
            "index sizes diverged"
        );
        assert!(self.by_key.len() <= self.capacity, "capacity exceeded");
        assert_eq!(
            self.records.len(),
            self.by_key.len(),
            "arena out of step with indices"
        );

        for (&key, &handle) in &self.by_key {
            let record = &self.records[handle];
            assert_eq!(record.key, key, "key index points at a foreign record");
            assert_eq!(
                self.by_age.get(&record.age),
                Some(&handle),
                "age index disagrees with key index"
            );
            assert!(
                record.age <= self.newest_age,
                "record carries an unissued age"
            );
        }

        let min_age = self.by_age.keys().min().copied();
        if self.oldest_age != AGE_UNKNOWN {
            assert_eq!(
                Some(self.oldest_age),
                min_age,
                "known oldest age is not the minimum resident age"
            );
        }
        if self.by_age.is_empty() {
            assert_eq!(self.oldest_age, AGE_UNKNOWN, "oldest age survived a drain");
        }
    }

    /// Test-only view of the recency counter.
    #[cfg(test)]
    pub(crate) fn newest_age(&self) -> Age {
        self.newest_age
    }

    /// Test-only view of the oldest-age bound.
    #[cfg(test)]
    pub(crate) fn oldest_age(&self) -> Age {
        self.oldest_age
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> AgeLruCache {
        AgeLruCache::new(capacity).unwrap()
    }

    #[test]
    fn test_cache_new() {
        let cache = cache(4);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
        assert_eq!(cache.oldest_age(), AGE_UNKNOWN);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_rejects_zero_capacity() {
        let result = AgeLruCache::new(0);
        assert!(matches!(result, Err(CacheError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_cache_put_and_get() {
        let mut cache = cache(4);

        cache.put(1, 10);
        assert_eq!(cache.get(1).unwrap(), 10);
        assert_eq!(cache.len(), 1);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_get_missing() {
        let mut cache = cache(4);

        let result = cache.get(9);
        assert!(matches!(result, Err(CacheError::NotFound(9))));
    }

    #[test]
    fn test_cache_miss_consumes_no_age() {
        let mut cache = cache(4);
        cache.put(1, 10);
        assert_eq!(cache.newest_age(), 1);

        let _ = cache.get(9);

        // Only hits and puts advance the counter.
        assert_eq!(cache.newest_age(), 1);
        assert_eq!(cache.len(), 1);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_hit_consumes_age() {
        let mut cache = cache(4);
        cache.put(1, 10);

        cache.get(1).unwrap();
        assert_eq!(cache.newest_age(), 2);

        cache.get(1).unwrap();
        assert_eq!(cache.newest_age(), 3);
    }

    #[test]
    fn test_cache_replace_updates_value() {
        let mut cache = cache(4);

        cache.put(1, 10);
        cache.put(1, 11);

        assert_eq!(cache.get(1).unwrap(), 11);
        assert_eq!(cache.len(), 1);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_eviction_at_capacity() {
        let mut cache = cache(3);

        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);

        // Full; inserting a fourth key evicts key 1, the oldest.
        cache.put(4, 40);

        assert_eq!(cache.len(), 3);
        assert!(matches!(cache.get(1), Err(CacheError::NotFound(_))));
        assert_eq!(cache.get(2).unwrap(), 20);
        assert_eq!(cache.get(3).unwrap(), 30);
        assert_eq!(cache.get(4).unwrap(), 40);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_get_protects_key_from_eviction() {
        let mut cache = cache(3);

        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);

        // Touch key 1 so key 2 becomes the eviction victim.
        cache.get(1).unwrap();
        cache.put(4, 40);

        assert_eq!(cache.get(1).unwrap(), 10);
        assert!(matches!(cache.get(2), Err(CacheError::NotFound(_))));
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_replace_at_capacity_evicts_nothing() {
        let mut cache = cache(2);

        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(1, 11);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1).unwrap(), 11);
        assert_eq!(cache.get(2).unwrap(), 20);
        assert_eq!(cache.stats().evictions, 0);
        cache.assert_invariants();
    }

    #[test]
    fn test_oldest_age_stays_unknown_without_removal() {
        let mut cache = cache(2);

        // Plain inserts never establish the bound.
        cache.put(1, 10);
        cache.put(2, 20);

        assert_eq!(cache.oldest_age(), AGE_UNKNOWN);
        cache.assert_invariants();
    }

    #[test]
    fn test_oldest_age_established_by_touch() {
        let mut cache = cache(2);

        cache.put(1, 10); // age 1
        cache.put(2, 20); // age 2
        cache.get(1).unwrap(); // re-filed at age 3

        // The scan skipped the touched age 1 and landed on key 2's age.
        assert_eq!(cache.oldest_age(), 2);
        cache.assert_invariants();
    }

    #[test]
    fn test_oldest_age_advances_past_eviction() {
        let mut cache = cache(2);

        cache.put(1, 10); // age 1
        cache.put(2, 20); // age 2
        cache.get(1).unwrap(); // age 3, oldest fixed at 2
        cache.put(3, 30); // evicts key 2, inserted at age 4

        assert_eq!(cache.oldest_age(), 3);
        assert!(matches!(cache.get(2), Err(CacheError::NotFound(_))));
        cache.assert_invariants();
    }

    #[test]
    fn test_oldest_age_resets_when_only_record_touched() {
        let mut cache = cache(1);

        cache.put(2, 1);
        cache.get(2).unwrap();

        // The age index was momentarily empty mid-touch, so the bound
        // dropped back to the sentinel.
        assert_eq!(cache.oldest_age(), AGE_UNKNOWN);
        assert_eq!(cache.get(2).unwrap(), 1);
        cache.assert_invariants();
    }

    #[test]
    fn test_eviction_across_sparse_age_space() {
        let mut cache = cache(3);

        cache.put(1, 10); // age 1
        cache.put(2, 20); // age 2
        cache.put(3, 30); // age 3

        // Pile ages onto key 1 so the age space grows large gaps.
        for _ in 0..5 {
            cache.get(1).unwrap(); // ages 4..=8
        }

        cache.put(4, 40); // age 9, evicts key 2 at age 2
        assert!(matches!(cache.get(2), Err(CacheError::NotFound(_))));

        cache.put(5, 50); // age 10, evicts key 3 at age 3
        assert!(matches!(cache.get(3), Err(CacheError::NotFound(_))));

        assert_eq!(cache.get(1).unwrap(), 10);
        assert_eq!(cache.get(4).unwrap(), 40);
        assert_eq!(cache.get(5).unwrap(), 50);
        cache.assert_invariants();
    }

    #[test]
    fn test_replace_chain_keeps_neighbors() {
        let mut cache = cache(2);

        assert!(cache.get(2).is_err());
        cache.put(2, 6);
        assert!(cache.get(1).is_err());
        cache.put(1, 5);
        cache.put(1, 2);

        assert_eq!(cache.get(1).unwrap(), 2);
        assert_eq!(cache.get(2).unwrap(), 6);
        cache.assert_invariants();
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = cache(2);

        cache.put(1, 10);
        cache.put(2, 20);
        cache.get(1).unwrap(); // hit
        let _ = cache.get(9); // miss
        cache.put(1, 11); // replacement
        cache.put(3, 30); // eviction

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.resident, 2);
    }
}
