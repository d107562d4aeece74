// src/progress.rs

//! Per-file progress events and the sinks that consume them.
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::sync::SyncSummary;
use std::sync::Mutex;

/// What happened to one tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Event emitted once per blob entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub path: String,
    pub outcome: EntryOutcome,
    /// Bytes written, for downloads.
    pub bytes: Option<u64>,
}

/// Receives sync progress. Implementations must be callable from worker threads.
///
/// # Examples
///
/// ```
/// use treesync::progress::{EntryOutcome, ProgressSink, SyncEvent};
/// use treesync::sync::SyncSummary;
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct CountingSink {
///     failed: Mutex<u64>,
/// }
/// impl ProgressSink for CountingSink {
///     fn start(&self, _total: u64) {}
///     fn entry(&self, event: &SyncEvent) {
///         if event.outcome == EntryOutcome::Failed {
///             *self.failed.lock().unwrap() += 1;
///         }
///     }
///     fn finish(&self, _summary: &SyncSummary) {}
/// }
///
/// let sink = CountingSink::default();
/// sink.entry(&SyncEvent { path: "a".into(), outcome: EntryOutcome::Failed, bytes: None });
/// assert_eq!(*sink.failed.lock().unwrap(), 1);
/// ```
pub trait ProgressSink: Send + Sync {
    /// Called once the number of blob entries is known.
    fn start(&self, total: u64);
    fn entry(&self, event: &SyncEvent);
    fn finish(&self, summary: &SyncSummary);
}

/// A `ProgressSink` that does nothing.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn start(&self, _total: u64) {}
    fn entry(&self, _event: &SyncEvent) {}
    fn finish(&self, _summary: &SyncSummary) {}
}

/// Collects every event in memory. Handy for tests and embedding.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<SyncEvent>>,
    summary: Mutex<Option<SyncSummary>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn summary(&self) -> Option<SyncSummary> {
        self.summary.lock().ok().and_then(|s| s.clone())
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, _total: u64) {}

    fn entry(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn finish(&self, summary: &SyncSummary) {
        if let Ok(mut slot) = self.summary.lock() {
            *slot = Some(summary.clone());
        }
    }
}

/// A progress bar on stderr, counting entries and showing the running totals.
#[cfg(feature = "progress")]
#[derive(Clone)]
pub struct IndicatifProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl IndicatifProgress {
    /// Creates a new progress bar with a default style.
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Self { bar: pb }
    }
}

#[cfg(feature = "progress")]
impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl ProgressSink for IndicatifProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn entry(&self, event: &SyncEvent) {
        self.bar.inc(1);
        if event.outcome == EntryOutcome::Failed {
            self.bar.println(format!("failed: {}", event.path));
        }
        self.bar.set_message(event.path.clone());
    }

    fn finish(&self, summary: &SyncSummary) {
        self.bar.finish_with_message(format!(
            "downloaded {}, skipped {}, failed {}",
            summary.downloaded, summary.skipped, summary.failed
        ));
    }
}

/// Picks the progress bar when enabled and stderr is a terminal.
pub fn default_sink(show_progress: bool) -> Box<dyn ProgressSink> {
    #[cfg(feature = "progress")]
    {
        if show_progress && atty::is(atty::Stream::Stderr) {
            return Box::new(IndicatifProgress::new());
        }
    }
    let _ = show_progress;
    Box::new(NoOpProgress)
}
