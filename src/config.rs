//! Configuration Module
//!
//! Handles loading and validating engine configuration from environment
//! variables.

use std::env;
use std::path::PathBuf;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Cache engine configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Invalid combinations are rejected at engine construction
/// rather than silently clamped, so a caller bug surfaces immediately.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of entries across the whole cache; divided evenly
    /// among shards
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without an explicit TTL;
    /// `<= 0` means no TTL
    pub default_ttl_ms: i64,
    /// Capacity eviction policy
    pub eviction_policy: EvictionPolicy,
    /// Number of independent cache shards
    pub shard_count: usize,
    /// Auto-save check interval in milliseconds
    pub auto_save_interval_ms: u64,
    /// Snapshot file location
    pub snapshot_path: PathBuf,
}

impl EngineConfig {
    /// Creates an EngineConfig by loading values from environment
    /// variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 100000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms, 0 = none (default: 0)
    /// - `CACHE_EVICTION_POLICY` - "lru" or "lfu" (default: lru)
    /// - `CACHE_SHARD_COUNT` - Number of shards (default: 16)
    /// - `CACHE_AUTO_SAVE_INTERVAL_MS` - Auto-save interval (default: 60000)
    /// - `CACHE_SNAPSHOT_PATH` - Snapshot file (default: cache_snapshot.json)
    pub fn from_env() -> Self {
        Self {
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100_000),
            default_ttl_ms: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            eviction_policy: env::var("CACHE_EVICTION_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(EvictionPolicy::Lru),
            shard_count: env::var("CACHE_SHARD_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16),
            auto_save_interval_ms: env::var("CACHE_AUTO_SAVE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),
            snapshot_path: env::var("CACHE_SNAPSHOT_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cache_snapshot.json")),
        }
    }

    /// Rejects configurations the engine must refuse to start with.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            default_ttl_ms: 0,
            eviction_policy: EvictionPolicy::Lru,
            shard_count: 16,
            auto_save_interval_ms: 60_000,
            snapshot_path: PathBuf::from("cache_snapshot.json"),
        }
    }
}
