//! Shardcache - A sharded in-memory cache engine
//!
//! Provides a hash-partitioned key-value store with per-key TTL expiry,
//! LRU/LFU eviction, synchronous pub/sub change notifications and
//! checksummed snapshot persistence.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod pubsub;
pub mod tasks;

pub use cache::{CacheStats, EvictionPolicy, Value};
pub use config::EngineConfig;
pub use engine::CacheEngine;
pub use error::{CacheError, Result};
pub use pubsub::Subscriber;
pub use tasks::{spawn_autosave_task, spawn_purge_task};
