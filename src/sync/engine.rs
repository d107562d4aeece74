// src/sync/engine.rs

//! The sync run: connect, resolve, list, then bring every blob entry up to date.

use super::lock::RunLock;
use super::stats::{SyncStats, SyncSummary};
use super::throttle::Throttle;
use crate::cancellation::CancellationToken;
use crate::constants::{DEFAULT_REF, DEFAULT_THROTTLE_EVERY, DEFAULT_THROTTLE_PAUSE_MS, STATE_DIR_NAME};
use crate::core_types::TreeEntry;
use crate::errors::{io_error_with_path, ConfigError, Error, NetworkError, Result, SecurityError};
use crate::github::{ContentFetcher, FetchLimits, GitHubApi, TreeFetcher};
use crate::hash_cache::HashCache;
use crate::progress::{EntryOutcome, NoOpProgress, ProgressSink, SyncEvent};
use crate::security::resolve_safe_path;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Connecting,
    Resolving,
    Listing,
    Syncing,
    Finalizing,
    Done,
    Failed,
}

/// Tuning knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub recursive: bool,
    pub limits: FetchLimits,
    /// Pause after every this many downloads.
    pub throttle_every: u64,
    pub throttle_pause: Duration,
    /// Entries processed in parallel; 1 means sequential.
    pub workers: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            limits: FetchLimits::default(),
            throttle_every: DEFAULT_THROTTLE_EVERY,
            throttle_pause: Duration::from_millis(DEFAULT_THROTTLE_PAUSE_MS),
            workers: 1,
        }
    }
}

/// One entry that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// No entry failed and the cache was saved.
    pub success: bool,
    /// The ref that resolved (may be the `master` fallback).
    pub reference: String,
    pub commit: String,
    pub truncated: bool,
    pub summary: SyncSummary,
    pub failures: Vec<EntryFailure>,
}

/// Mirrors one repository into one local directory.
pub struct SyncEngine {
    api: GitHubApi,
    root: PathBuf,
    options: SyncOptions,
    cancel: CancellationToken,
    state: SyncState,
}

/// Shared, per-run state used by the entry loop.
struct RunContext<'a> {
    fetcher: ContentFetcher<'a>,
    cache: Mutex<HashCache>,
    stats: SyncStats,
    throttle: Throttle,
    failures: Mutex<Vec<EntryFailure>>,
    // Held while counting and creating parent directories.
    dirs: Mutex<()>,
    progress: &'a dyn ProgressSink,
}

impl RunContext<'_> {
    fn cache(&self) -> MutexGuard<'_, HashCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SyncEngine {
    pub fn new(api: GitHubApi, root: impl Into<PathBuf>, options: SyncOptions) -> Self {
        Self {
            api,
            root: root.into(),
            options,
            cancel: CancellationToken::new(),
            state: SyncState::Idle,
        }
    }

    /// Uses `token` to stop the run between entries.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn api(&self) -> &GitHubApi {
        &self.api
    }

    /// Runs a sync and reports plain success, logging any fatal error.
    pub fn sync(&mut self, reference: &str) -> bool {
        match self.run(reference, &NoOpProgress) {
            Ok(report) => report.success,
            Err(e) => {
                log::error!("Sync failed: {}", e);
                false
            }
        }
    }

    /// Runs a full sync of `reference` (empty means `main`).
    ///
    /// # Errors
    /// Fatal conditions only: connection, authentication, missing repository or
    /// ref, listing failures, a held run lock, and cancellation. Individual
    /// entries that fail are counted in the report instead.
    pub fn run(&mut self, reference: &str, progress: &dyn ProgressSink) -> Result<SyncReport> {
        let result = self.run_inner(reference, progress);
        self.state = match &result {
            Ok(_) => SyncState::Done,
            Err(_) => SyncState::Failed,
        };
        result
    }

    fn run_inner(&mut self, reference: &str, progress: &dyn ProgressSink) -> Result<SyncReport> {
        let started = Instant::now();
        let reference = if reference.trim().is_empty() {
            DEFAULT_REF
        } else {
            reference.trim()
        };
        log::info!(
            "Starting sync of {} (ref: {}) to {}",
            self.api.repository(),
            reference,
            self.root.display()
        );

        self.state = SyncState::Connecting;
        self.api.check_connection()?;

        fs::create_dir_all(&self.root).map_err(|e| io_error_with_path(e, &self.root))?;
        let _lock = RunLock::acquire(&self.root)?;

        self.state = SyncState::Resolving;
        let trees = TreeFetcher::new(&self.api);
        let (resolved_ref, commit) = trees.resolve(reference)?.ok_or_else(|| Error::RefNotFound {
            reference: reference.to_string(),
        })?;
        log::info!("Resolved '{}' to commit {}", resolved_ref, commit.short());

        self.state = SyncState::Listing;
        let tree = trees
            .list(resolved_ref, commit.clone(), self.options.recursive)?
            .ok_or_else(|| Error::RefNotFound {
                reference: reference.to_string(),
            })?;
        let blobs: Vec<TreeEntry> = tree.blobs().cloned().collect();
        log::info!("Found {} files to sync", blobs.len());

        self.state = SyncState::Syncing;
        let ctx = RunContext {
            fetcher: ContentFetcher::new(&self.api, &commit, self.options.limits),
            cache: Mutex::new(HashCache::load(&self.root)),
            stats: SyncStats::new(),
            throttle: Throttle::new(self.options.throttle_every, self.options.throttle_pause),
            failures: Mutex::new(Vec::new()),
            dirs: Mutex::new(()),
            progress,
        };
        progress.start(blobs.len() as u64);
        self.sync_entries(&ctx, &blobs)?;

        self.state = SyncState::Finalizing;
        let saved = match ctx.cache().save() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save hash cache: {}", e);
                false
            }
        };
        let summary = ctx.stats.snapshot(started.elapsed());
        progress.finish(&summary);
        self.log_rate_limit();

        if let Err(e) = self.cancel.check() {
            log::warn!(
                "Sync interrupted after {} of {} files",
                summary.checked,
                blobs.len()
            );
            return Err(e);
        }

        let failures = ctx.failures.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok(SyncReport {
            success: saved && summary.failed == 0,
            reference: tree.reference,
            commit: commit.as_str().to_string(),
            truncated: tree.truncated,
            summary,
            failures,
        })
    }

    fn sync_entries(&self, ctx: &RunContext<'_>, blobs: &[TreeEntry]) -> Result<()> {
        if self.options.workers <= 1 {
            for entry in blobs {
                if self.cancel.is_cancelled() {
                    break;
                }
                self.sync_entry(ctx, entry);
            }
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                option: "--workers".to_string(),
                reason: e.to_string(),
            })?;
        pool.install(|| {
            blobs.par_iter().for_each(|entry| {
                if !self.cancel.is_cancelled() {
                    self.sync_entry(ctx, entry);
                }
            })
        });
        Ok(())
    }

    /// Brings one blob entry up to date. Never fails the run.
    fn sync_entry(&self, ctx: &RunContext<'_>, entry: &TreeEntry) {
        ctx.stats.record_checked();

        if !ctx.cache().should_fetch(&entry.path, &entry.blob_id) {
            log::debug!("Unchanged: {}", entry.path);
            ctx.stats.record_skipped();
            ctx.progress.entry(&SyncEvent {
                path: entry.path.clone(),
                outcome: EntryOutcome::Skipped,
                bytes: None,
            });
            return;
        }

        match self.download_entry(ctx, entry) {
            Ok(bytes) => {
                ctx.cache().record(&entry.path, &entry.blob_id);
                ctx.stats.record_downloaded(bytes);
                ctx.throttle.after_download();
                log::debug!("Downloaded {} ({} bytes)", entry.path, bytes);
                ctx.progress.entry(&SyncEvent {
                    path: entry.path.clone(),
                    outcome: EntryOutcome::Downloaded,
                    bytes: Some(bytes),
                });
            }
            Err(e) => {
                log::error!("Failed to sync {}: {}", entry.path, e);
                ctx.stats.record_failed();
                ctx.failures
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(EntryFailure {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                ctx.progress.entry(&SyncEvent {
                    path: entry.path.clone(),
                    outcome: EntryOutcome::Failed,
                    bytes: None,
                });
            }
        }
    }

    /// Downloads one entry and writes it into place. Returns bytes written.
    fn download_entry(&self, ctx: &RunContext<'_>, entry: &TreeEntry) -> Result<u64> {
        // Checked before downloading so a hostile path costs no request.
        if is_state_path(&entry.path) {
            return Err(SecurityError::ReservedPath {
                path: entry.path.clone(),
            }
            .into());
        }
        let target = resolve_safe_path(&self.root, &entry.path)?;

        let fetched = ctx
            .fetcher
            .get(&entry.path, &entry.blob_id, entry.size)?
            .ok_or_else(|| NetworkError::Status {
                url: self.api.repo_url(&["git/blobs", &entry.blob_id]),
                status: 404,
            })?;

        let created = {
            let _guard = ctx.dirs.lock().unwrap_or_else(|e| e.into_inner());
            ensure_parent_dirs(&target)?
        };
        ctx.stats.record_directories(created);
        write_atomically(&target, &fetched.bytes)?;
        Ok(fetched.bytes.len() as u64)
    }

    fn log_rate_limit(&self) {
        match self.api.rate_limit() {
            Ok(Some(rate)) => log::info!(
                "API rate limit: {}/{} requests remaining",
                rate.remaining,
                rate.limit
            ),
            Ok(None) => {}
            Err(e) => log::warn!("Failed to get rate limit: {}", e),
        }
    }
}

/// True if `path` lands in the engine's own state directory.
fn is_state_path(path: &str) -> bool {
    Path::new(path)
        .components()
        .find(|c| !matches!(c, Component::CurDir))
        .is_some_and(|c| c.as_os_str() == STATE_DIR_NAME)
}

/// Creates missing parent directories of `target` and returns how many were made.
fn ensure_parent_dirs(target: &Path) -> Result<u64> {
    let Some(parent) = target.parent() else {
        return Ok(0);
    };
    let missing = parent
        .ancestors()
        .take_while(|dir| !dir.exists())
        .count() as u64;
    if missing > 0 {
        fs::create_dir_all(parent).map_err(|e| io_error_with_path(e, parent))?;
    }
    Ok(missing)
}

/// Writes `bytes` to a temp file beside `target`, then renames it into place.
fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error_with_path(e, dir))?;
    tmp.write_all(bytes)
        .map_err(|e| io_error_with_path(e, tmp.path()))?;
    tmp.persist(target)
        .map_err(|e| io_error_with_path(e.error, target))?;
    Ok(())
}
