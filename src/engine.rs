//! Cache Engine Module
//!
//! The facade composing the sharded cache, the pub/sub hub and the
//! persistence manager into the single entry point consumers use.

use std::path::Path;

use tracing::info;

use crate::cache::{now_ms, CacheStats, ShardedCache, Value};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::persistence::PersistenceManager;
use crate::pubsub::{PubSubHub, Subscriber};

/// Notification channel for successful writes; the message is the key.
pub const CHANNEL_SET: &str = "cache:set";
/// Notification channel for successful deletes; the message is the key.
pub const CHANNEL_DEL: &str = "cache:del";

// == Cache Engine ==
/// Sharded in-memory cache engine with TTL expiry, capacity eviction,
/// change notifications and snapshot persistence.
///
/// All methods take `&self`; the engine is safe to share across threads
/// behind an `Arc`. Per-key operations lock only the owning shard, so
/// traffic to different shards proceeds in parallel. Change notifications
/// are always published after the shard lock has been released.
#[derive(Debug)]
pub struct CacheEngine {
    cache: ShardedCache,
    hub: PubSubHub,
    persistence: PersistenceManager,
    default_ttl_ms: i64,
}

impl CacheEngine {
    // == Constructor ==
    /// Builds an engine from a validated configuration.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails validation; the engine
    /// refuses to start rather than clamp.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let cache = ShardedCache::new(
            config.shard_count,
            config.max_entries,
            config.eviction_policy,
        )?;
        let persistence =
            PersistenceManager::new(config.snapshot_path, config.auto_save_interval_ms);

        info!(
            max_entries = config.max_entries,
            default_ttl_ms = config.default_ttl_ms,
            "cache engine initialized"
        );

        Ok(Self {
            cache,
            hub: PubSubHub::new(),
            persistence,
            default_ttl_ms: config.default_ttl_ms,
        })
    }

    // == Get ==
    /// Retrieves a value. `None` is a miss (absent or expired), not an
    /// error.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(key, now_ms())
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry.
    ///
    /// With `ttl_ms = None` the engine's configured default TTL applies.
    /// An explicit `ttl_ms <= 0` means the entry never expires. Publishes
    /// the key on [`CHANNEL_SET`] after the shard lock is released.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, ttl_ms: Option<i64>) {
        let key = key.into();
        let ttl_ms = ttl_ms.unwrap_or(self.default_ttl_ms);
        self.cache.set(key.clone(), value.into(), ttl_ms, now_ms());
        self.hub.publish(CHANNEL_SET, &key);
    }

    // == Delete ==
    /// Removes a key. Returns true if it was present. Publishes the key
    /// on [`CHANNEL_DEL`] when something was removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.cache.delete(key);
        if removed {
            self.hub.publish(CHANNEL_DEL, key);
        }
        removed
    }

    // == Exists ==
    /// Checks for a live entry without counting as a read.
    pub fn exists(&self, key: &str) -> bool {
        self.cache.exists(key, now_ms())
    }

    // == Increment ==
    /// Adds `delta` to the integer at `key`, treating absent or expired as
    /// 0, and returns the new value.
    ///
    /// The result is written through the normal `set` path, so the entry's
    /// TTL resets to the engine default on every increment.
    ///
    /// # Errors
    /// `TypeMismatch` when the key holds a non-integer value.
    pub fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let result = self
            .cache
            .increment(key, delta, self.default_ttl_ms, now_ms());
        if result.is_ok() {
            self.hub.publish(CHANNEL_SET, key);
        }
        result
    }

    // == Keys ==
    /// All live keys matching a glob pattern, across every shard.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.cache.keys(pattern, now_ms())
    }

    // == Size ==
    /// Total entry count across shards, possibly including entries whose
    /// expiry has not been detected yet.
    pub fn size(&self) -> usize {
        self.cache.total_size()
    }

    // == Stats ==
    /// Merged hit/miss/eviction statistics across shards.
    pub fn stats(&self) -> CacheStats {
        self.cache.aggregate_stats()
    }

    // == Flush ==
    /// Clears every shard and resets all counters.
    pub fn flush(&self) {
        self.cache.flush();
        info!("cache flushed");
    }

    // == Purge Expired ==
    /// Eagerly removes expired entries from every shard. Returns the
    /// number removed. Used by the background maintenance task.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired(now_ms())
    }

    // == Pub/Sub ==

    /// Registers a handler on a channel.
    pub fn subscribe(&self, channel: &str, handler: Subscriber) {
        self.hub.subscribe(channel, handler);
    }

    /// Removes a channel and all its handlers.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        self.hub.unsubscribe(channel)
    }

    /// Publishes a message, returning the number of handlers delivered to.
    pub fn publish(&self, channel: &str, message: &str) -> usize {
        self.hub.publish(channel, message)
    }

    // == Persistence ==

    /// Snapshots every shard's live entries to the configured path.
    ///
    /// The view is collected one shard lock at a time and serialized after
    /// all locks are released: per-shard-atomic, not cross-shard-atomic.
    pub fn save(&self) -> Result<()> {
        let now = now_ms();
        let entries = self.cache.collect_live_entries(now);
        let snapshot = self.persistence.build_snapshot(entries, now)?;
        self.persistence.save(&snapshot)
    }

    /// Restores entries from the snapshot file, if a verifiable one
    /// exists. Returns the number of entries restored (0 on a cold start).
    ///
    /// Entries re-route through normal key hashing and keep their original
    /// creation time and TTL; anything that expired while the process was
    /// down is dropped on arrival.
    pub fn load(&self) -> usize {
        let Some(entries) = self.persistence.load() else {
            return 0;
        };

        let now = now_ms();
        let restorable: Vec<_> = entries
            .into_iter()
            .map(|(key, snap)| (key, snap.into_entry()))
            .filter(|(_, entry)| !entry.is_expired(now))
            .collect();

        self.cache.restore(restorable)
    }

    /// True once the auto-save interval has elapsed since the last
    /// successful save.
    pub fn should_auto_save(&self) -> bool {
        self.persistence.should_auto_save(now_ms())
    }

    /// The snapshot file path.
    pub fn snapshot_path(&self) -> &Path {
        self.persistence.path()
    }
}
