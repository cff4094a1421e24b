//! Eviction Module
//!
//! Maintains the auxiliary ordering structures a shard needs to pick
//! eviction victims without sorting its whole entry table, and the policy
//! selector choosing between them.
//!
//! The index answers three questions in O(k log n):
//! - which entries have outlived their TTL (expiry order),
//! - which entries were read longest ago (recency order),
//! - which entries were read least often (frequency order).
//!
//! Selection never mutates the entry table; the shard removes the returned
//! keys itself and then tells the index to forget them.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Eviction Policy ==
/// Capacity eviction policy applied once a shard exceeds `max_entries`.
///
/// TTL eviction is not listed here: it is policy-independent and always
/// runs first on any maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the entries read longest ago
    Lru,
    /// Evict the entries read least often
    Lfu,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            other => Err(format!("unknown eviction policy {other:?}")),
        }
    }
}

// == Key State ==
/// Per-key bookkeeping mirrored into the ordered sets below.
#[derive(Debug, Clone)]
struct KeyState {
    /// Monotonic sequence stamped on every successful read
    touch_seq: u64,
    /// Successful read count, starting at 1 on insertion
    access_count: u64,
    /// Monotonic sequence stamped once at insertion (LFU tie-break)
    insert_seq: u64,
    /// Absolute expiry deadline, if the entry has a TTL
    expires_at: Option<u64>,
}

// == Eviction Index ==
/// Incrementally maintained recency, frequency and expiry orderings over a
/// shard's key set.
///
/// Every mutation is O(log n); selecting k victims is O(k log n). The keys
/// returned match what a full sort of the entry table by `last_accessed`
/// (LRU) or `access_count` (LFU) would pick, with deterministic tie-breaks
/// by access order and insertion order respectively.
#[derive(Debug, Default)]
pub struct EvictionIndex {
    next_seq: u64,
    states: HashMap<String, KeyState>,
    /// (touch_seq, key) — smallest first = least recently read
    recency: BTreeSet<(u64, String)>,
    /// (access_count, insert_seq, key) — smallest first = least frequently read
    frequency: BTreeSet<(u64, u64, String)>,
    /// (expires_at, key) — smallest first = first to expire
    expiry: BTreeSet<(u64, String)>,
}

impl EvictionIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // == On Insert ==
    /// Registers a freshly written entry.
    ///
    /// A write replaces any previous entry for the key outright, so stale
    /// state for the same key is dropped first.
    pub fn on_insert(&mut self, key: &str, expires_at: Option<u64>) {
        self.on_remove(key);

        let seq = self.bump_seq();
        self.recency.insert((seq, key.to_string()));
        self.frequency.insert((1, seq, key.to_string()));
        if let Some(deadline) = expires_at {
            self.expiry.insert((deadline, key.to_string()));
        }
        self.states.insert(
            key.to_string(),
            KeyState {
                touch_seq: seq,
                access_count: 1,
                insert_seq: seq,
                expires_at,
            },
        );
    }

    // == On Access ==
    /// Records a successful read: moves the key to the most-recent end of
    /// the recency order and one bucket up in the frequency order.
    pub fn on_access(&mut self, key: &str) {
        let seq = self.bump_seq();
        let Some(state) = self.states.get_mut(key) else {
            return;
        };

        self.recency.remove(&(state.touch_seq, key.to_string()));
        self.frequency
            .remove(&(state.access_count, state.insert_seq, key.to_string()));

        state.touch_seq = seq;
        state.access_count += 1;

        self.recency.insert((seq, key.to_string()));
        self.frequency
            .insert((state.access_count, state.insert_seq, key.to_string()));
    }

    // == On Remove ==
    /// Forgets a key after the shard has removed its entry.
    pub fn on_remove(&mut self, key: &str) {
        if let Some(state) = self.states.remove(key) {
            self.recency.remove(&(state.touch_seq, key.to_string()));
            self.frequency
                .remove(&(state.access_count, state.insert_seq, key.to_string()));
            if let Some(deadline) = state.expires_at {
                self.expiry.remove(&(deadline, key.to_string()));
            }
        }
    }

    // == Expired Keys ==
    /// Every key whose expiry deadline lies strictly before `now`.
    ///
    /// An entry is live through its deadline itself (`now - created_at >
    /// ttl` is the expiry condition), so the range excludes `now`.
    pub fn expired_keys(&self, now: u64) -> Vec<String> {
        self.expiry
            .range(..(now, String::new()))
            .map(|(_, key)| key.clone())
            .collect()
    }

    // == LRU Victims ==
    /// The `count` least recently read keys, oldest first.
    pub fn lru_victims(&self, count: usize) -> Vec<String> {
        self.recency
            .iter()
            .take(count)
            .map(|(_, key)| key.clone())
            .collect()
    }

    // == LFU Victims ==
    /// The `count` least frequently read keys, coldest first.
    pub fn lfu_victims(&self, count: usize) -> Vec<String> {
        self.frequency
            .iter()
            .take(count)
            .map(|(_, _, key)| key.clone())
            .collect()
    }

    // == Victims ==
    /// Selects `count` victims under the given capacity policy.
    pub fn victims(&self, policy: EvictionPolicy, count: usize) -> Vec<String> {
        match policy {
            EvictionPolicy::Lru => self.lru_victims(count),
            EvictionPolicy::Lfu => self.lfu_victims(count),
        }
    }

    // == Clear ==
    /// Drops all tracked state.
    pub fn clear(&mut self) {
        self.states.clear();
        self.recency.clear();
        self.frequency.clear();
        self.expiry.clear();
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
