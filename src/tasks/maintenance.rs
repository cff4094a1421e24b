//! Maintenance Tasks
//!
//! Background tasks that periodically purge expired cache entries and
//! auto-save snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::CacheEngine;

/// Spawns a background task that eagerly removes expired entries.
///
/// Expiry is otherwise detected lazily at read time; this sweep keeps
/// never-read entries from lingering. The task takes each shard's lock one
/// at a time, so it never stalls unrelated key traffic for long.
///
/// # Arguments
/// * `engine` - Shared engine handle
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle which can be used to abort the task during shutdown.
pub fn spawn_purge_task(engine: Arc<CacheEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting TTL purge task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = engine.purge_expired();
            if removed > 0 {
                info!(removed, "TTL purge removed expired entries");
            } else {
                debug!("TTL purge found no expired entries");
            }
        }
    })
}

/// Spawns a background task that saves a snapshot whenever the engine's
/// auto-save interval has elapsed.
///
/// A failed save is logged and retried on the next check; auto-save never
/// crashes the engine.
///
/// # Arguments
/// * `engine` - Shared engine handle
/// * `check_interval` - How often to check whether a save is due
pub fn spawn_autosave_task(engine: Arc<CacheEngine>, check_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval_ms = check_interval.as_millis() as u64,
            "starting auto-save task"
        );

        loop {
            tokio::time::sleep(check_interval).await;

            if !engine.should_auto_save() {
                continue;
            }

            match engine.save() {
                Ok(()) => debug!("auto-save completed"),
                Err(e) => warn!(error = %e, "auto-save failed, will retry next interval"),
            }
        }
    })
}
