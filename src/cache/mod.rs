//! Cache Module
//!
//! The sharded key-value core: entries with TTL and access metadata,
//! incremental eviction orderings, per-shard storage and hash routing.

pub mod entry;
mod eviction;
mod shard;
mod sharded;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{now_ms, CacheEntry, Value};
pub use eviction::{EvictionIndex, EvictionPolicy};
pub use shard::Shard;
pub use sharded::ShardedCache;
pub use stats::CacheStats;
