//! Cache Shard Module
//!
//! One independent cache partition: an entry table, its eviction index and
//! its performance counters. All operations run under the shard's
//! exclusive lock, held by the caller ([`super::ShardedCache`]).

use std::collections::HashMap;

use globset::Glob;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EvictionIndex, EvictionPolicy, Value};
use crate::error::{CacheError, Result};

// == Shard ==
/// One partition of the key space with its own entry table, eviction state
/// and statistics.
#[derive(Debug)]
pub struct Shard {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Recency / frequency / expiry orderings over `entries`
    index: EvictionIndex,
    /// Performance counters
    stats: CacheStats,
    /// Maximum number of entries this shard may hold
    max_entries: usize,
    /// Capacity eviction policy
    policy: EvictionPolicy,
}

impl Shard {
    // == Constructor ==
    /// Creates an empty shard with the given capacity and policy.
    pub fn new(max_entries: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            index: EvictionIndex::new(),
            stats: CacheStats::new(),
            max_entries,
            policy,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit touches the entry's access metadata. An absent or expired key
    /// records a miss; an expired entry found here is removed on the spot.
    pub fn get(&mut self, key: &str, now: u64) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.index.on_remove(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let value = self.entries.get_mut(key).map(|entry| {
            entry.touch(now);
            entry.value.clone()
        });
        self.index.on_access(key);
        self.stats.record_hit();
        value
    }

    // == Set ==
    /// Stores a key-value pair, overwriting any existing entry outright.
    ///
    /// Overwrites reset all access metadata; old hit counts never carry
    /// over. The write triggers a maintenance pass: TTL eviction first,
    /// then the capacity policy if the shard now exceeds `max_entries`.
    pub fn set(&mut self, key: String, value: Value, ttl_ms: i64, now: u64) {
        let entry = CacheEntry::new(value, ttl_ms, now);
        self.index.on_insert(&key, entry.expires_at());
        self.entries.insert(key, entry);
        self.maintain(now);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Restore ==
    /// Re-inserts an entry from a snapshot, preserving its original
    /// creation time and TTL. Does not trigger maintenance; the caller
    /// restores into an empty or known-small shard.
    pub fn restore(&mut self, key: String, entry: CacheEntry) {
        self.index.on_insert(&key, entry.expires_at());
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if a key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.index.on_remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Exists ==
    /// Checks whether a live entry exists for the key.
    ///
    /// Shares `get`'s lazy-expiry behavior (an expired entry found here is
    /// removed) but deliberately does not count as using the entry: no
    /// touch, no hit/miss recording.
    pub fn exists(&mut self, key: &str, now: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.index.on_remove(key);
                self.stats.record_expiration();
                self.stats.set_total_entries(self.entries.len());
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Increment ==
    /// Adds `delta` to the integer value stored at `key`, treating an
    /// absent or expired key as 0, and returns the new value.
    ///
    /// The result is stored through the normal `set` path, so the entry's
    /// TTL and access metadata reset on every increment.
    pub fn increment(&mut self, key: &str, delta: i64, ttl_ms: i64, now: u64) -> Result<i64> {
        let current = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value.as_int().ok_or_else(|| CacheError::TypeMismatch {
                    key: key.to_string(),
                })?
            }
            _ => 0,
        };

        let next = current + delta;
        self.set(key.to_string(), Value::Int(next), ttl_ms, now);
        Ok(next)
    }

    // == Keys ==
    /// Returns all live keys matching the glob pattern.
    ///
    /// Expired entries are skipped, not removed; eager removal is the
    /// maintenance pass's job.
    pub fn keys(&self, pattern: &str, now: u64) -> Result<Vec<String>> {
        let matcher = Glob::new(pattern)
            .map_err(|e| CacheError::InvalidPattern(e.to_string()))?
            .compile_matcher();

        Ok(self
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && matcher.is_match(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    // == Flush ==
    /// Clears all entries and resets every counter to zero.
    pub fn flush(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.stats.reset();
    }

    // == Purge Expired ==
    /// Eagerly removes every expired entry. Returns the number removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let expired = self.index.expired_keys(now);
        for key in &expired {
            self.entries.remove(key);
            self.index.on_remove(key);
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    // == Maintenance ==
    /// Post-write maintenance pass: TTL eviction first (cheap and
    /// policy-independent), then capacity eviction down to `max_entries`.
    fn maintain(&mut self, now: u64) {
        for key in self.index.expired_keys(now) {
            self.entries.remove(&key);
            self.index.on_remove(&key);
            self.stats.record_expiration();
        }

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            let victims = self.index.victims(self.policy, excess);
            debug!(policy = ?self.policy, count = victims.len(), "capacity eviction");
            for key in victims {
                self.entries.remove(&key);
                self.index.on_remove(&key);
                self.stats.record_eviction();
            }
        }
    }

    // == Stats ==
    /// Returns current shard statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries, including any not yet
    /// detected as expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Live Entries ==
    /// Copies out every non-expired entry, for snapshotting.
    pub fn live_entries(&self, now: u64) -> Vec<(String, CacheEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}
