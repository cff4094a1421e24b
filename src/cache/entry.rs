//! Cache Entry Module
//!
//! Defines the stored value type and the per-entry expiry/access metadata.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// == Value ==
/// A stored cache value.
///
/// The engine caches arbitrary application values without resorting to a
/// dynamically-typed payload: callers pick a variant and get it back
/// unchanged. `increment` operates on the `Int` variant only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the integer payload, if this value holds one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Rough in-memory size of the payload in bytes.
    pub fn size_estimate(&self) -> usize {
        match self {
            Value::Text(s) => s.len(),
            Value::Int(_) => std::mem::size_of::<i64>(),
            Value::Float(_) => std::mem::size_of::<f64>(),
            Value::Bool(_) => 1,
            Value::Bytes(b) => b.len(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

// == Cache Entry ==
/// A single stored value plus its expiry and access metadata.
///
/// The key is not duplicated here; the shard's entry table owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Time-to-live in milliseconds; `<= 0` means the entry never expires.
    ///
    /// A zero or negative TTL is a deliberate "no expiry" policy, not
    /// "expire immediately".
    pub ttl_ms: i64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read timestamp (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of successful reads, starting at 1 on creation
    pub access_count: u64,
    /// Rough payload size in bytes
    pub size_estimate: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    ///
    /// `created_at` and `last_accessed` both start at `now` and
    /// `access_count` starts at 1.
    pub fn new(value: Value, ttl_ms: i64, now: u64) -> Self {
        let size_estimate = value.size_estimate();
        Self {
            value,
            ttl_ms,
            created_at: now,
            last_accessed: now,
            access_count: 1,
            size_estimate,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived its TTL at time `now`.
    ///
    /// An entry is expired once strictly more than `ttl_ms` milliseconds
    /// have elapsed since creation. Entries with `ttl_ms <= 0` never
    /// expire.
    pub fn is_expired(&self, now: u64) -> bool {
        self.ttl_ms > 0 && now.saturating_sub(self.created_at) > self.ttl_ms as u64
    }

    /// Absolute expiry deadline in Unix milliseconds, if the entry has one.
    ///
    /// The entry is live through the deadline itself and expired after it.
    pub fn expires_at(&self) -> Option<u64> {
        if self.ttl_ms > 0 {
            Some(self.created_at + self.ttl_ms as u64)
        } else {
            None
        }
    }

    // == Touch ==
    /// Records a successful read at time `now`.
    ///
    /// Updates `last_accessed` and increments `access_count`. Has no other
    /// side effect; in particular it never extends or resets the TTL.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count += 1;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
