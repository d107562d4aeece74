// src/status.rs

//! The `status` report: what the remote says and what the local mirror holds.

use crate::config::Config;
use crate::github::{GitHubApi, RateLimitStatus, RepositoryInfo};
use crate::hash_cache::HashCache;
use serde::Serialize;
use std::io::Write;

/// Snapshot of a repository/mirror pair. Never fails; problems are recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub repository: String,
    pub local_path: String,
    pub reference: String,
    pub local_exists: bool,
    /// Files recorded in the hash cache.
    pub tracked_files: usize,
    pub connected: bool,
    pub repository_info: Option<RepositoryInfo>,
    pub connection_error: Option<String>,
    pub rate_limit: Option<RateLimitStatus>,
}

/// Collects a [`StatusReport`] using `api`.
pub fn collect_status(config: &Config, api: &GitHubApi) -> StatusReport {
    let (repository_info, connection_error) = match api.check_connection() {
        Ok(info) => (Some(info), None),
        Err(e) => {
            log::warn!("Connection check failed: {}", e);
            (None, Some(e.to_string()))
        }
    };
    let rate_limit = match api.rate_limit() {
        Ok(rate) => rate,
        Err(e) => {
            log::debug!("Failed to get rate limit: {}", e);
            None
        }
    };

    StatusReport {
        repository: config.repo.to_string(),
        local_path: config.local_path.display().to_string(),
        reference: config.reference.clone(),
        local_exists: config.local_path.is_dir(),
        tracked_files: HashCache::load(&config.local_path).len(),
        connected: repository_info.is_some(),
        repository_info,
        connection_error,
        rate_limit,
    }
}

/// Writes the plain-text status block.
pub fn write_status(writer: &mut dyn Write, status: &StatusReport) -> std::io::Result<()> {
    writeln!(writer, "Repository: {}", status.repository)?;
    writeln!(writer, "Local path: {}", status.local_path)?;
    writeln!(writer, "Reference: {}", status.reference)?;
    match &status.connection_error {
        None => writeln!(writer, "API connection: OK")?,
        Some(e) => writeln!(writer, "API connection: FAILED ({})", e)?,
    }
    if let Some(branch) = status
        .repository_info
        .as_ref()
        .and_then(|info| info.default_branch.as_deref())
    {
        writeln!(writer, "Default branch: {}", branch)?;
    }
    if let Some(rate) = &status.rate_limit {
        writeln!(
            writer,
            "API rate limit: {}/{} requests remaining",
            rate.remaining, rate.limit
        )?;
    }
    if status.local_exists {
        writeln!(writer, "Tracked files: {}", status.tracked_files)?;
    } else {
        writeln!(writer, "Local directory does not exist yet")?;
    }
    Ok(())
}
