// src/sync/stats.rs

use byte_unit::{Byte, UnitType};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-run counters. Safe to bump from worker threads.
#[derive(Debug, Default)]
pub struct SyncStats {
    checked: AtomicU64,
    downloaded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes_downloaded: AtomicU64,
    directories_created: AtomicU64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_checked(&self) {
        self.checked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_downloaded(&self, bytes: u64) {
        self.downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_directories(&self, count: u64) {
        self.directories_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Freezes the counters into a summary.
    pub fn snapshot(&self, elapsed: Duration) -> SyncSummary {
        let bytes = self.bytes_downloaded.load(Ordering::Relaxed);
        SyncSummary {
            checked: self.checked.load(Ordering::Relaxed),
            downloaded: self.downloaded(),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed(),
            bytes_downloaded: bytes,
            bytes_downloaded_formatted: format_size(bytes),
            directories_created: self.directories_created.load(Ordering::Relaxed),
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }
}

/// Final numbers of a run, as reported to the progress sink and printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub checked: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_downloaded: u64,
    pub bytes_downloaded_formatted: String,
    pub directories_created: u64,
    pub elapsed_seconds: f64,
}

/// Human-readable binary size, e.g. `1.5 KiB`.
pub fn format_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

/// Writes the plain-text summary block.
pub fn write_summary(writer: &mut dyn Write, summary: &SyncSummary) -> std::io::Result<()> {
    writeln!(writer, "\n=== Sync Summary ===")?;
    writeln!(writer, "Files checked: {}", summary.checked)?;
    writeln!(writer, "Files downloaded: {}", summary.downloaded)?;
    writeln!(writer, "Files skipped: {}", summary.skipped)?;
    writeln!(writer, "Files failed: {}", summary.failed)?;
    writeln!(writer, "Data transferred: {}", summary.bytes_downloaded_formatted)?;
    writeln!(writer, "Directories created: {}", summary.directories_created)?;
    writeln!(writer, "Elapsed: {:.2}s", summary.elapsed_seconds)?;
    Ok(())
}
