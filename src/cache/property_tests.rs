//! Property-Based Tests for the Cache Core
//!
//! Uses proptest to verify behavioral properties over random operation
//! sequences, including that the incremental eviction indexes pick exactly
//! the victims a naive full sort of the entry table would pick.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{EvictionPolicy, Shard, ShardedCache, Value};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

// == Strategies ==
/// Generates cache keys from a small pool so sequences revisit keys.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e][0-9]".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}".prop_map(|s| s)
}

/// A cache operation applied to both the real shard and a naive model.
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Naive Eviction Model ==
// Replays the same operations with a plain map and full-sort eviction on
// every write. The shard must end up with exactly the same live key set.

#[derive(Debug, Clone)]
struct NaiveEntry {
    touch_seq: u64,
    access_count: u64,
    insert_seq: u64,
}

#[derive(Debug)]
struct NaiveCache {
    entries: HashMap<String, NaiveEntry>,
    max_entries: usize,
    policy: EvictionPolicy,
    next_seq: u64,
}

impl NaiveCache {
    fn new(max_entries: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            policy,
            next_seq: 0,
        }
    }

    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn get(&mut self, key: &str) {
        let seq = self.seq();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.touch_seq = seq;
            entry.access_count += 1;
        }
    }

    fn set(&mut self, key: &str) {
        let seq = self.seq();
        self.entries.insert(
            key.to_string(),
            NaiveEntry {
                touch_seq: seq,
                access_count: 1,
                insert_seq: seq,
            },
        );

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            let mut ranked: Vec<(String, NaiveEntry)> = self
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect();
            match self.policy {
                EvictionPolicy::Lru => ranked.sort_by_key(|(_, e)| e.touch_seq),
                EvictionPolicy::Lfu => {
                    ranked.sort_by_key(|(_, e)| (e.access_count, e.insert_seq))
                }
            }
            for (victim, _) in ranked.into_iter().take(excess) {
                self.entries.remove(&victim);
            }
        }
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Runs ops against a real shard and the naive model, then compares the
/// surviving key sets. Timestamps increase by 1 per op so recency in the
/// shard matches the model's sequence order.
fn check_outcome_equivalence(policy: EvictionPolicy, max_entries: usize, ops: Vec<CacheOp>) {
    let mut shard = Shard::new(max_entries, policy);
    let mut naive = NaiveCache::new(max_entries, policy);
    let mut now = 1_000u64;

    for op in ops {
        now += 1;
        match op {
            CacheOp::Set { key, value } => {
                shard.set(key.clone(), Value::from(value), 0, now);
                naive.set(&key);
            }
            CacheOp::Get { key } => {
                shard.get(&key, now);
                naive.get(&key);
            }
            CacheOp::Delete { key } => {
                shard.delete(&key);
                naive.delete(&key);
            }
        }
    }

    let mut shard_keys = shard.keys("*", now).unwrap();
    let mut naive_keys: Vec<String> = naive.entries.keys().cloned().collect();
    shard_keys.sort();
    naive_keys.sort();
    assert_eq!(shard_keys, naive_keys, "eviction outcome diverged");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The incremental LRU index must evict exactly what a full sort by
    // recency would evict.
    #[test]
    fn prop_lru_outcome_matches_naive_sort(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        check_outcome_equivalence(EvictionPolicy::Lru, 4, ops);
    }

    // Same for the frequency ordering under LFU.
    #[test]
    fn prop_lfu_outcome_matches_naive_sort(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        check_outcome_equivalence(EvictionPolicy::Lfu, 4, ops);
    }

    // For any sequence of operations, hit and miss counters reflect
    // exactly the get outcomes observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut shard = Shard::new(TEST_MAX_ENTRIES, EvictionPolicy::Lru);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut now = 1_000u64;

        for op in ops {
            now += 1;
            match op {
                CacheOp::Set { key, value } => {
                    shard.set(key, Value::from(value), 0, now);
                }
                CacheOp::Get { key } => {
                    match shard.get(&key, now) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    shard.delete(&key);
                }
            }
        }

        let stats = shard.stats();
        prop_assert_eq!(stats.hits, expected_hits, "hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "misses mismatch");
        prop_assert_eq!(stats.total_entries, shard.len(), "entry count mismatch");
    }

    // Storing then reading a key returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let mut shard = Shard::new(TEST_MAX_ENTRIES, EvictionPolicy::Lru);
        let now = 1_000u64;

        shard.set(key.clone(), Value::from(value.clone()), 0, now);
        prop_assert_eq!(shard.get(&key, now), Some(Value::from(value)));
    }

    // After a delete, a get misses.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let mut shard = Shard::new(TEST_MAX_ENTRIES, EvictionPolicy::Lru);
        let now = 1_000u64;

        shard.set(key.clone(), Value::from(value), 0, now);
        prop_assert!(shard.delete(&key));
        prop_assert_eq!(shard.get(&key, now), None);
    }

    // The second of two writes to one key wins.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        v1 in value_strategy(),
        v2 in value_strategy(),
    ) {
        let mut shard = Shard::new(TEST_MAX_ENTRIES, EvictionPolicy::Lru);

        shard.set(key.clone(), Value::from(v1), 0, 1_000);
        shard.set(key.clone(), Value::from(v2.clone()), 0, 1_001);
        prop_assert_eq!(shard.get(&key, 1_002), Some(Value::from(v2)));
    }

    // The live entry count never exceeds the configured capacity.
    #[test]
    fn prop_capacity_never_exceeded(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let max_entries = 5;
        let mut shard = Shard::new(max_entries, EvictionPolicy::Lru);
        let mut now = 1_000u64;

        for op in ops {
            now += 1;
            match op {
                CacheOp::Set { key, value } => shard.set(key, Value::from(value), 0, now),
                CacheOp::Get { key } => { shard.get(&key, now); }
                CacheOp::Delete { key } => { shard.delete(&key); }
            }
            prop_assert!(shard.len() <= max_entries, "capacity exceeded");
        }
    }

    // Routing is a pure function of the key for a fixed shard count.
    #[test]
    fn prop_routing_determinism(key in "[a-zA-Z0-9_:]{1,32}", shard_count in 1usize..32) {
        let a = ShardedCache::new(shard_count, 1_000, EvictionPolicy::Lru).unwrap();
        let b = ShardedCache::new(shard_count, 1_000, EvictionPolicy::Lru).unwrap();

        let idx = a.route(&key);
        prop_assert!(idx < shard_count);
        prop_assert_eq!(idx, a.route(&key));
        prop_assert_eq!(idx, b.route(&key));
    }
}
