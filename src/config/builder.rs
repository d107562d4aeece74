// src/config/builder.rs

use super::{
    parsing::{expand_local_path, normalize_ref, parse_size},
    validation::{validate_builder_options, validate_limits},
    Config,
};
use crate::cli::SyncArgs;
use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_CHUNK_SIZE, DEFAULT_INLINE_THRESHOLD, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_THROTTLE_EVERY, DEFAULT_THROTTLE_PAUSE_MS, DEFAULT_TIMEOUT_SECS,
};
use crate::errors::{ConfigError, Result};
use crate::github::{host_of_api_base, parse_repository_url_for_hosts, FetchLimits, GITHUB_HOSTS};
use crate::security::validate_proxy_url;
use crate::session::{SessionConfig, TlsTrust};
use crate::sync::SyncOptions;
use std::time::Duration;

/// Collects settings from any source and validates them into a [`Config`].
///
/// Every field is optional; unset fields take their defaults in [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use treesync::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .repo_url("https://github.com/octo/hello")
///     .local_path("/tmp/hello")
///     .reference("refs/tags/v1.0")
///     .max_file_size("5MiB")
///     .build()
///     .unwrap();
/// assert_eq!(config.repo.to_string(), "octo/hello");
/// assert_eq!(config.reference, "v1.0");
/// assert_eq!(config.sync.limits.max_file_size, 5 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    pub(super) repo_url: Option<String>,
    pub(super) local_path: Option<String>,
    pub(super) reference: Option<String>,
    pub(super) token: Option<String>,
    pub(super) api_url: Option<String>,
    pub(super) recursive: Option<bool>,
    pub(super) proxy: Option<String>,
    pub(super) auto_proxy: Option<bool>,
    pub(super) ca_bundle: Option<String>,
    pub(super) auto_cert: Option<bool>,
    pub(super) no_ssl_verify: Option<bool>,
    pub(super) timeout_secs: Option<u64>,
    pub(super) inline_threshold: Option<String>,
    pub(super) max_file_size: Option<String>,
    pub(super) chunk_size: Option<String>,
    pub(super) throttle_every: Option<u64>,
    pub(super) throttle_pause: Option<Duration>,
    pub(super) workers: Option<usize>,
    pub(super) json: Option<bool>,
    pub(super) progress: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a builder from parsed command-line arguments.
    pub fn from_cli(args: SyncArgs) -> Self {
        Self {
            repo_url: args.repo_url,
            local_path: args.local_path,
            reference: args.reference,
            token: args.token.filter(|t| !t.trim().is_empty()),
            api_url: args.api_url,
            recursive: Some(!args.no_recursive),
            proxy: args.proxy,
            auto_proxy: Some(args.auto_proxy),
            ca_bundle: args.ca_bundle,
            auto_cert: Some(args.auto_cert),
            no_ssl_verify: Some(args.no_ssl_verify),
            timeout_secs: args.timeout,
            inline_threshold: args.inline_threshold,
            max_file_size: args.max_file_size,
            chunk_size: args.chunk_size,
            throttle_every: args.throttle_every,
            throttle_pause: None,
            workers: args.workers,
            json: Some(args.json),
            progress: Some(!args.no_progress),
        }
    }

    pub fn repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    pub fn local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    pub fn auto_proxy(mut self, enabled: bool) -> Self {
        self.auto_proxy = Some(enabled);
        self
    }

    pub fn ca_bundle(mut self, path: impl Into<String>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    pub fn auto_cert(mut self, enabled: bool) -> Self {
        self.auto_cert = Some(enabled);
        self
    }

    pub fn no_ssl_verify(mut self, disabled: bool) -> Self {
        self.no_ssl_verify = Some(disabled);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn inline_threshold(mut self, size: impl Into<String>) -> Self {
        self.inline_threshold = Some(size.into());
        self
    }

    pub fn max_file_size(mut self, size: impl Into<String>) -> Self {
        self.max_file_size = Some(size.into());
        self
    }

    pub fn chunk_size(mut self, size: impl Into<String>) -> Self {
        self.chunk_size = Some(size.into());
        self
    }

    pub fn throttle_every(mut self, every: u64) -> Self {
        self.throttle_every = Some(every);
        self
    }

    pub fn throttle_pause(mut self, pause: Duration) -> Self {
        self.throttle_pause = Some(pause);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validates every setting and produces an immutable [`Config`].
    ///
    /// # Errors
    /// `Config` errors for missing or malformed values and conflicting options;
    /// `Security` errors for a rejected proxy URL.
    pub fn build(self) -> Result<Config> {
        validate_builder_options(&self)?;

        let repo_url = self
            .repo_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingValue {
                option: "--repo (or GITHUB_REPO_URL)".to_string(),
            })?
            .to_string();
        let local_path = self
            .local_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(expand_local_path)
            .ok_or_else(|| ConfigError::MissingValue {
                option: "--local (or TREESYNC_LOCAL_PATH)".to_string(),
            })?;

        let api_base = self
            .api_url
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let mut hosts: Vec<String> = GITHUB_HOSTS.iter().map(|h| h.to_string()).collect();
        if api_base != DEFAULT_API_BASE {
            if let Some(host) = host_of_api_base(&api_base) {
                hosts.push(host);
            }
        }
        let host_refs: Vec<&str> = hosts.iter().map(String::as_str).collect();
        let repo = parse_repository_url_for_hosts(&repo_url, &host_refs)?;

        let proxy = self.proxy.as_deref().map(validate_proxy_url).transpose()?;

        let tls = if self.no_ssl_verify.unwrap_or(false) {
            TlsTrust::Disabled
        } else if let Some(bundle) = &self.ca_bundle {
            let path = expand_local_path(bundle);
            if !path.is_file() {
                return Err(ConfigError::InvalidValue {
                    option: "--ca-bundle".to_string(),
                    reason: format!("'{}' is not a readable file", path.display()),
                }
                .into());
            }
            TlsTrust::Bundle(path)
        } else {
            TlsTrust::Verify
        };

        let limits = FetchLimits {
            inline_threshold: parse_size("--inline-threshold", self.inline_threshold.as_deref())?
                .unwrap_or(DEFAULT_INLINE_THRESHOLD),
            max_file_size: parse_size("--max-file-size", self.max_file_size.as_deref())?
                .unwrap_or(DEFAULT_MAX_FILE_SIZE),
            chunk_size: parse_size("--chunk-size", self.chunk_size.as_deref())?
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(DEFAULT_CHUNK_SIZE),
        };
        validate_limits(limits.chunk_size as u64, limits.max_file_size)?;

        Ok(Config {
            repo,
            repo_url,
            api_base,
            local_path,
            reference: normalize_ref(self.reference.as_deref()),
            session: SessionConfig {
                token: self.token,
                tls,
                proxy,
                timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            },
            auto_proxy: self.auto_proxy.unwrap_or(false),
            auto_cert: self.auto_cert.unwrap_or(false),
            sync: SyncOptions {
                recursive: self.recursive.unwrap_or(true),
                limits,
                throttle_every: self.throttle_every.unwrap_or(DEFAULT_THROTTLE_EVERY),
                throttle_pause: self
                    .throttle_pause
                    .unwrap_or(Duration::from_millis(DEFAULT_THROTTLE_PAUSE_MS)),
                workers: self.workers.unwrap_or(1),
            },
            json: self.json.unwrap_or(false),
            show_progress: self.progress.unwrap_or(true),
        })
    }
}
