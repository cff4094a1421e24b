//! Background Tasks Module
//!
//! Periodic maintenance tasks that run alongside the engine: eager TTL
//! purging and snapshot auto-save.

mod maintenance;

pub use maintenance::{spawn_autosave_task, spawn_purge_task};
