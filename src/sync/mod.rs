// src/sync/mod.rs

//! The sync engine and the per-run machinery it drives.

mod engine;
mod lock;
mod stats;
mod throttle;

pub use engine::{EntryFailure, SyncEngine, SyncOptions, SyncReport, SyncState};
pub use lock::RunLock;
pub use stats::{format_size, write_summary, SyncStats, SyncSummary};
pub use throttle::Throttle;
