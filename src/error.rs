//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.
//!
//! A cache miss is not an error: `get` and friends return `Option` instead.
//! Errors cover configuration validation, persistence I/O, and operations
//! invoked with arguments the engine cannot honor.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Glob pattern passed to a key listing could not be compiled
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),

    /// Increment applied to a value that is not an integer
    #[error("Key {key:?} holds a non-integer value")]
    TypeMismatch { key: String },

    /// I/O failure while saving or loading a snapshot
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization failure
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
