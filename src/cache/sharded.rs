//! Sharded Cache Module
//!
//! Partitions the key space across a fixed set of shards, each behind its
//! own lock, so operations on different keys proceed in parallel.
//!
//! `Mutex` rather than `RwLock`: every read is also a write here, since a
//! hit must update the entry's access metadata and its position in the
//! eviction orderings. Concurrency comes from the segmentation instead.

use parking_lot::Mutex;
use tracing::info;
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, Shard, Value};
use crate::error::{CacheError, Result};

// == Sharded Cache ==
/// A fixed-size array of independently locked cache shards.
///
/// Keys route to shards via `xxh3_64(key) % shard_count`, a pure function
/// of the key that is stable across process restarts. The shard count is
/// fixed at construction; a key's home shard never changes.
#[derive(Debug)]
pub struct ShardedCache {
    shards: Vec<Mutex<Shard>>,
    shard_count: usize,
}

impl ShardedCache {
    // == Constructor ==
    /// Creates `shard_count` shards, dividing `max_entries` evenly among
    /// them by integer division.
    ///
    /// Any division remainder is simply lost capacity; it is not
    /// redistributed. A `max_entries` smaller than `shard_count` therefore
    /// yields zero-capacity shards.
    ///
    /// # Errors
    /// `InvalidConfig` if `shard_count` is zero. Refusing to start beats
    /// silently clamping a caller bug.
    pub fn new(shard_count: usize, max_entries: usize, policy: EvictionPolicy) -> Result<Self> {
        if shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard_count must be at least 1".to_string(),
            ));
        }

        let per_shard = max_entries / shard_count;
        let shards = (0..shard_count)
            .map(|_| Mutex::new(Shard::new(per_shard, policy)))
            .collect();

        info!(shard_count, per_shard, ?policy, "sharded cache initialized");

        Ok(Self {
            shards,
            shard_count,
        })
    }

    // == Route ==
    /// Shard index for a key: `xxh3_64(key) % shard_count`.
    pub fn route(&self, key: &str) -> usize {
        (xxh3_64(key.as_bytes()) % self.shard_count as u64) as usize
    }

    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        &self.shards[self.route(key)]
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    // == Per-Key Operations ==

    pub fn get(&self, key: &str, now: u64) -> Option<Value> {
        self.shard_for(key).lock().get(key, now)
    }

    pub fn set(&self, key: String, value: Value, ttl_ms: i64, now: u64) {
        self.shard_for(&key).lock().set(key, value, ttl_ms, now);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.shard_for(key).lock().delete(key)
    }

    pub fn exists(&self, key: &str, now: u64) -> bool {
        self.shard_for(key).lock().exists(key, now)
    }

    pub fn increment(&self, key: &str, delta: i64, ttl_ms: i64, now: u64) -> Result<i64> {
        self.shard_for(key).lock().increment(key, delta, ttl_ms, now)
    }

    // == Whole-Cache Operations ==
    //
    // Each visits the shards one at a time and never holds more than one
    // shard lock, so they cannot deadlock against per-key traffic.

    /// Clears every shard and resets all counters.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.lock().flush();
        }
    }

    /// Total entry count across shards.
    pub fn total_size(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Merged statistics across shards.
    pub fn aggregate_stats(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for shard in &self.shards {
            total.merge(&shard.lock().stats());
        }
        total
    }

    /// All live keys matching the glob pattern, across shards.
    pub fn keys(&self, pattern: &str, now: u64) -> Result<Vec<String>> {
        let mut matches = Vec::new();
        for shard in &self.shards {
            matches.extend(shard.lock().keys(pattern, now)?);
        }
        Ok(matches)
    }

    /// Eagerly removes expired entries from every shard. Returns the total
    /// removed.
    pub fn purge_expired(&self, now: u64) -> usize {
        self.shards.iter().map(|s| s.lock().purge_expired(now)).sum()
    }

    // == Snapshot Support ==

    /// Copies every live entry out of every shard, taking one shard lock
    /// at a time. The view is per-shard-atomic, not cross-shard-atomic.
    pub fn collect_live_entries(&self, now: u64) -> Vec<(String, CacheEntry)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            out.extend(shard.lock().live_entries(now));
        }
        out
    }

    /// Re-inserts snapshot entries through normal routing, preserving each
    /// entry's original creation time and TTL.
    pub fn restore(&self, entries: Vec<(String, CacheEntry)>) -> usize {
        let count = entries.len();
        for (key, entry) in entries {
            self.shard_for(&key).lock().restore(key, entry);
        }
        count
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::now_ms;

    fn cache(shards: usize, max_entries: usize) -> ShardedCache {
        ShardedCache::new(shards, max_entries, EvictionPolicy::Lru).unwrap()
    }

    #[test]
    fn test_zero_shards_rejected() {
        let result = ShardedCache::new(0, 100, EvictionPolicy::Lru);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_routing_is_deterministic_and_in_range() {
        let a = cache(8, 800);
        let b = cache(8, 800);

        for i in 0..100 {
            let key = format!("key_{i}");
            let idx = a.route(&key);
            assert!(idx < 8);
            // Same key, same configuration, same shard, across instances.
            assert_eq!(idx, a.route(&key));
            assert_eq!(idx, b.route(&key));
        }
    }

    #[test]
    fn test_set_get_across_shards() {
        let c = cache(4, 400);
        let now = now_ms();

        for i in 0..50 {
            c.set(format!("key_{i}"), Value::Int(i), 0, now);
        }
        for i in 0..50 {
            assert_eq!(c.get(&format!("key_{i}"), now), Some(Value::Int(i)));
        }
        assert_eq!(c.total_size(), 50);
    }

    #[test]
    fn test_flush_clears_every_shard() {
        let c = cache(4, 400);
        let now = now_ms();

        for i in 0..20 {
            c.set(format!("key_{i}"), Value::Int(i), 0, now);
        }
        c.flush();
        assert_eq!(c.total_size(), 0);
        assert_eq!(c.aggregate_stats().hits, 0);
    }

    #[test]
    fn test_aggregate_stats_sums_shards() {
        let c = cache(4, 400);
        let now = now_ms();

        for i in 0..10 {
            c.set(format!("key_{i}"), Value::Int(i), 0, now);
        }
        for i in 0..10 {
            c.get(&format!("key_{i}"), now);
        }
        c.get("missing_1", now);
        c.get("missing_2", now);

        let stats = c.aggregate_stats();
        assert_eq!(stats.hits, 10);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total_entries, 10);
    }

    #[test]
    fn test_keys_across_shards() {
        let c = cache(4, 400);
        let now = now_ms();

        for i in 0..10 {
            c.set(format!("user:{i}"), Value::Int(i), 0, now);
        }
        c.set("other".to_string(), Value::Int(0), 0, now);

        let keys = c.keys("user:*", now).unwrap();
        assert_eq!(keys.len(), 10);
    }

    #[test]
    fn test_capacity_divided_evenly() {
        // 10 entries over 4 shards = 2 per shard; remainder lost.
        let c = cache(4, 10);
        let now = now_ms();

        for i in 0..100 {
            c.set(format!("key_{i}"), Value::Int(i), 0, now + i as u64);
        }
        assert!(c.total_size() <= 8);
    }

    #[test]
    fn test_purge_expired_across_shards() {
        let c = cache(4, 400);

        for i in 0..10 {
            c.set(format!("short_{i}"), Value::Int(i), 50, 1_000);
            c.set(format!("long_{i}"), Value::Int(i), 0, 1_000);
        }

        assert_eq!(c.purge_expired(2_000), 10);
        assert_eq!(c.total_size(), 10);
    }

    #[test]
    fn test_collect_and_restore_round_trip() {
        let c = cache(4, 400);

        c.set("a".to_string(), Value::Int(1), 5_000, 1_000);
        c.set("b".to_string(), Value::from("two"), 0, 1_000);
        c.set("expired".to_string(), Value::Int(3), 10, 1_000);

        let live = c.collect_live_entries(2_000);
        assert_eq!(live.len(), 2);

        let fresh = cache(4, 400);
        assert_eq!(fresh.restore(live), 2);
        assert_eq!(fresh.get("a", 2_000), Some(Value::Int(1)));
        assert_eq!(fresh.get("b", 2_000), Some(Value::from("two")));
        // Restored entries keep their original deadline.
        assert_eq!(fresh.get("a", 7_000), None);
    }

    #[test]
    fn test_parallel_access_different_shards() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(cache(8, 8_000));
        let mut handles = Vec::new();

        for t in 0..8 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                let now = now_ms();
                for i in 0..100 {
                    let key = format!("key_{t}_{i}");
                    c.set(key.clone(), Value::Int(i), 0, now);
                    assert_eq!(c.get(&key, now), Some(Value::Int(i)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(c.total_size(), 800);
    }
}
