// src/github/content.rs
//! Downloads file content through the contents endpoint or the blobs endpoint.
//!
//! Small files come back inline (base64 inside a JSON document) from
//! `contents/{path}`. Large files, and anything the contents endpoint refuses,
//! are streamed raw from `git/blobs/{sha}` with a hard byte ceiling.

use super::api::{rate_limit_error, GitHubApi};
use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INLINE_THRESHOLD, DEFAULT_MAX_FILE_SIZE, GITHUB_RAW_MEDIA_TYPE,
};
use crate::core_types::ResolvedCommit;
use crate::errors::{NetworkError, Result, SecurityError};
use base64::Engine;
use serde::Deserialize;
use std::io::Read;

/// Size thresholds applied to every download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Above this size the contents endpoint is skipped.
    pub inline_threshold: u64,
    /// No download may exceed this many bytes.
    pub max_file_size: u64,
    /// Read buffer size for streamed downloads.
    pub chunk_size: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Result of the inline strategy. Anything but `Content`/`NotFound` sends
/// the caller to the blob strategy.
#[derive(Debug, PartialEq, Eq)]
enum FetchOutcome {
    Content(Vec<u8>),
    TooLarge(Option<u64>),
    RateLimited,
    NotFound,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Which endpoint served a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Inline,
    Blob,
}

/// Downloaded bytes plus the path that served them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    pub via: FetchPath,
}

pub struct ContentFetcher<'a> {
    api: &'a GitHubApi,
    commit: &'a ResolvedCommit,
    limits: FetchLimits,
}

impl<'a> ContentFetcher<'a> {
    /// Fetches content as of `commit`.
    pub fn new(api: &'a GitHubApi, commit: &'a ResolvedCommit, limits: FetchLimits) -> Self {
        Self { api, commit, limits }
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// Downloads the file at `path` (blob `blob_id`). `size_hint` is the size
    /// reported by the tree listing, if any.
    ///
    /// Returns `Ok(None)` when the object does not exist.
    ///
    /// # Errors
    /// * `Security(SizeLimit)` when the content exceeds `max_file_size`.
    /// * `RateLimit` when the blob endpoint is rate limited.
    /// * `Network` for transport failures and unexpected statuses.
    pub fn get(&self, path: &str, blob_id: &str, size_hint: Option<u64>) -> Result<Option<FetchedContent>> {
        if let Some(size) = size_hint {
            if size > self.limits.max_file_size {
                return Err(self.size_limit(path, Some(size)).into());
            }
            if size > self.limits.inline_threshold {
                log::debug!("{} is {} bytes, using blob download", path, size);
                return self.fetch_blob_tagged(blob_id);
            }
        }

        match self.fetch_inline(path)? {
            FetchOutcome::Content(bytes) => Ok(Some(FetchedContent {
                bytes,
                via: FetchPath::Inline,
            })),
            FetchOutcome::NotFound => {
                log::error!("File not found at ref {}: {}", self.commit.short(), path);
                Ok(None)
            }
            FetchOutcome::TooLarge(size) => {
                log::debug!(
                    "{} too large for inline download ({:?} bytes), falling back to blob",
                    path,
                    size
                );
                self.fetch_blob_tagged(blob_id)
            }
            FetchOutcome::RateLimited => {
                log::warn!("Contents endpoint refused {}, falling back to blob", path);
                self.fetch_blob_tagged(blob_id)
            }
        }
    }

    fn fetch_blob_tagged(&self, blob_id: &str) -> Result<Option<FetchedContent>> {
        Ok(self.fetch_blob(blob_id)?.map(|bytes| FetchedContent {
            bytes,
            via: FetchPath::Blob,
        }))
    }

    fn fetch_inline(&self, path: &str) -> Result<FetchOutcome> {
        let url = self.api.repo_url(&["contents", path]);
        let response = self.api.get(&url, &[("ref", self.commit.as_str())])?;
        match response.status {
            200..=299 => {}
            404 => return Ok(FetchOutcome::NotFound),
            403 | 429 => {
                return Ok(if rate_limit_error(&response).is_some() {
                    FetchOutcome::RateLimited
                } else {
                    FetchOutcome::TooLarge(None)
                })
            }
            status => return Err(NetworkError::Status { url, status }.into()),
        }

        let data: ContentsResponse = response.json(&url)?;
        if data.size > self.limits.inline_threshold {
            return Ok(FetchOutcome::TooLarge(Some(data.size)));
        }
        let content = match (data.content.as_deref(), data.encoding.as_deref()) {
            (Some(content), Some("base64")) => content,
            (Some(""), _) | (None, _) if data.size == 0 => return Ok(FetchOutcome::Content(Vec::new())),
            // The contents API answers large files with encoding "none" and no content.
            _ => return Ok(FetchOutcome::TooLarge(Some(data.size))),
        };

        let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| NetworkError::Transport {
                url: url.clone(),
                reason: format!("invalid base64 content: {}", e),
            })?;
        if bytes.len() as u64 > self.limits.max_file_size {
            return Err(self.size_limit(path, Some(bytes.len() as u64)).into());
        }
        Ok(FetchOutcome::Content(bytes))
    }

    /// Streams a blob's raw bytes, enforcing the byte ceiling while reading.
    ///
    /// A HEAD request is tried first so an oversized blob can be refused
    /// before any body is read; if it fails, the ceiling is enforced per chunk.
    pub fn fetch_blob(&self, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let url = self.api.repo_url(&["git/blobs", blob_id]);
        let headers = [("Accept", GITHUB_RAW_MEDIA_TYPE)];

        match self.api.head(&url, &headers) {
            Ok(head) if head.is_success() => {
                if let Some(size) = head.content_length() {
                    if size > self.limits.max_file_size {
                        return Err(self.size_limit(blob_id, Some(size)).into());
                    }
                }
            }
            Ok(head) => log::debug!("HEAD {} returned {}, streaming anyway", url, head.status),
            Err(e) => log::debug!("HEAD {} failed ({}), streaming anyway", url, e),
        }

        let response = self.api.get_with_headers(&url, &[], &headers)?;
        match response.status {
            200..=299 => {}
            404 => {
                log::error!("Blob {} not found", blob_id);
                return Ok(None);
            }
            status => {
                return Err(rate_limit_error(&response)
                    .unwrap_or_else(|| NetworkError::Status { url, status }.into()))
            }
        }
        if let Some(size) = response.content_length() {
            if size > self.limits.max_file_size {
                return Err(self.size_limit(blob_id, Some(size)).into());
            }
        }

        let mut body = response.into_body();
        let mut buf = vec![0u8; self.limits.chunk_size.max(1)];
        let mut bytes = Vec::new();
        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(NetworkError::Transport {
                        url,
                        reason: format!("failed while streaming blob: {}", e),
                    }
                    .into())
                }
            };
            if (bytes.len() + n) as u64 > self.limits.max_file_size {
                return Err(self.size_limit(blob_id, Some((bytes.len() + n) as u64)).into());
            }
            bytes.extend_from_slice(&buf[..n]);
        }
        Ok(Some(bytes))
    }

    fn size_limit(&self, object: &str, size: Option<u64>) -> SecurityError {
        log::warn!(
            "Refusing '{}': exceeds size limit of {} bytes",
            object,
            self.limits.max_file_size
        );
        SecurityError::SizeLimit {
            object: object.to_string(),
            size,
            limit: self.limits.max_file_size,
        }
    }
}
