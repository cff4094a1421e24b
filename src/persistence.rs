//! Persistence Module
//!
//! Builds point-in-time snapshots of live cache entries and recovers them
//! after a restart. Snapshots are JSON with a SHA-256 checksum over the
//! entries payload; a file that fails verification is treated as "no
//! snapshot" rather than an error, since a cache is a best-effort
//! accelerator and a cold start is always safe.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, Value};
use crate::error::Result;

// == Snapshot Entry ==
/// The persisted slice of a cache entry: enough to restore the value and
/// its expiry clock, nothing more. Access statistics are not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub value: Value,
    pub ttl_ms: i64,
    pub created_at: u64,
}

impl SnapshotEntry {
    fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            value: entry.value.clone(),
            ttl_ms: entry.ttl_ms,
            created_at: entry.created_at,
        }
    }

    /// Rebuilds a live entry. The original creation time and TTL carry
    /// over; access metadata restarts as if freshly created.
    pub fn into_entry(self) -> CacheEntry {
        CacheEntry {
            size_estimate: self.value.size_estimate(),
            value: self.value,
            ttl_ms: self.ttl_ms,
            created_at: self.created_at,
            last_accessed: self.created_at,
            access_count: 1,
        }
    }
}

// == Snapshot ==
/// A point-in-time, checksummed copy of live entries.
///
/// Entries live in a `BTreeMap` so the serialized payload is byte-stable:
/// the checksum computed at save time can be recomputed verbatim at load
/// time.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was built (Unix milliseconds)
    pub timestamp: u64,
    /// Live entries keyed by cache key
    pub entries: BTreeMap<String, SnapshotEntry>,
    /// SHA-256 hex digest of the JSON-serialized entries payload
    pub checksum: String,
}

/// SHA-256 hex digest of the serialized entries payload.
fn entries_checksum(entries: &BTreeMap<String, SnapshotEntry>) -> Result<String> {
    let payload = serde_json::to_vec(entries)?;
    Ok(hex::encode(Sha256::digest(&payload)))
}

// == Persistence Manager ==
/// Owns the snapshot file path and the auto-save clock.
#[derive(Debug)]
pub struct PersistenceManager {
    path: PathBuf,
    auto_save_interval_ms: u64,
    /// Unix ms of the last successful save
    last_save: Mutex<u64>,
}

impl PersistenceManager {
    // == Constructor ==
    pub fn new(path: impl Into<PathBuf>, auto_save_interval_ms: u64) -> Self {
        Self {
            path: path.into(),
            auto_save_interval_ms,
            last_save: Mutex::new(0),
        }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Build Snapshot ==
    /// Builds a snapshot from the given entries, dropping any that are
    /// already expired at `now`, and attaches the payload checksum.
    pub fn build_snapshot(
        &self,
        entries: Vec<(String, CacheEntry)>,
        now: u64,
    ) -> Result<Snapshot> {
        let live: BTreeMap<String, SnapshotEntry> = entries
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key, SnapshotEntry::from_entry(&entry)))
            .collect();

        let checksum = entries_checksum(&live)?;
        Ok(Snapshot {
            timestamp: now,
            entries: live,
            checksum,
        })
    }

    // == Save ==
    /// Writes a snapshot to the configured path and records the save time.
    ///
    /// The file is written to a temporary sibling and renamed into place,
    /// so a crash mid-write never leaves a truncated snapshot at the
    /// target path.
    ///
    /// # Errors
    /// Surfaces I/O and serialization failures to the caller; the
    /// auto-save task logs them and retries on its next interval.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;

        *self.last_save.lock() = snapshot.timestamp;
        info!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            "snapshot saved"
        );
        Ok(())
    }

    // == Load ==
    /// Reads the snapshot file and verifies its checksum.
    ///
    /// Returns `None` when there is no usable snapshot: missing file,
    /// unparseable JSON, or a checksum mismatch. None of these is an
    /// error; the caller proceeds with a cold start.
    pub fn load(&self) -> Option<BTreeMap<String, SnapshotEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no snapshot file");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "snapshot unreadable, cold start");
                return None;
            }
        };

        match entries_checksum(&snapshot.entries) {
            Ok(actual) if actual == snapshot.checksum => {
                info!(
                    path = %self.path.display(),
                    entries = snapshot.entries.len(),
                    "snapshot loaded"
                );
                Some(snapshot.entries)
            }
            _ => {
                warn!(path = %self.path.display(), "snapshot checksum mismatch, cold start");
                None
            }
        }
    }

    // == Auto-Save ==
    /// True once `auto_save_interval_ms` has elapsed since the last
    /// successful save.
    pub fn should_auto_save(&self, now: u64) -> bool {
        now.saturating_sub(*self.last_save.lock()) >= self.auto_save_interval_ms
    }
}
