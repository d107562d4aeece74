//! `treesync` is a library and command-line tool that mirrors a GitHub
//! repository's file tree into a local directory using only the REST API.
//!
//! It is meant for networks where git protocol access is blocked but HTTPS to
//! the API is allowed, typically behind corporate proxies and TLS-intercepting
//! middleboxes.
//!
//! A sync run goes through four stages:
//! 1.  **Connect**: build an HTTP session (token, proxy, CA trust) and check the
//!     repository is reachable.
//! 2.  **Resolve**: turn a branch, tag, or commit id into a full commit id.
//! 3.  **List**: fetch the recursive tree of that commit.
//! 4.  **Sync**: download every file whose remote id changed since the last
//!     run, and record the new ids in a hash cache under `.synccache/`.
//!
//! # Example: Library Usage
//!
//! The transport is a trait, so the engine can run against any HTTP client.
//! Here a small scripted transport stands in for the GitHub API.
//!
//! ```
//! use treesync::http::{HttpResponse, HttpTransport};
//! use treesync::{run_with_transport, CancellationToken, ConfigBuilder, Result};
//! use treesync::progress::NoOpProgress;
//! use std::sync::Arc;
//!
//! struct Scripted;
//!
//! impl HttpTransport for Scripted {
//!     fn get(&self, url: &str, _params: &[(&str, &str)], _headers: &[(&str, &str)]) -> Result<HttpResponse> {
//!         let sha = "0123456789abcdef0123456789abcdef01234567";
//!         let body = if url.ends_with("/repos/octo/hello") {
//!             r#"{"full_name": "octo/hello"}"#.to_string()
//!         } else if url.ends_with("/git/ref/heads/main") {
//!             format!(r#"{{"object": {{"sha": "{}", "type": "commit"}}}}"#, sha)
//!         } else if url.contains("/git/trees/") {
//!             r#"{"tree": [{"path": "hello.txt", "type": "blob", "sha": "b1", "size": 5}]}"#.to_string()
//!         } else if url.ends_with("/contents/hello.txt") {
//!             r#"{"size": 5, "encoding": "base64", "content": "aGVsbG8="}"#.to_string()
//!         } else {
//!             return Ok(HttpResponse::from_bytes(404, vec![], b"{}".to_vec()));
//!         };
//!         Ok(HttpResponse::from_bytes(200, vec![], body.into_bytes()))
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = ConfigBuilder::new()
//!     .repo_url("https://github.com/octo/hello")
//!     .local_path(dir.path().to_string_lossy())
//!     .build()
//!     .unwrap();
//!
//! let report = run_with_transport(&config, Arc::new(Scripted), &CancellationToken::new(), &NoOpProgress).unwrap();
//! assert!(report.success);
//! assert_eq!(std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(), "hello");
//! ```

// Make modules public if they contain public types used in the API
pub mod cancellation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod errors;
pub mod github;
pub mod hash_cache;
pub mod http;
pub mod prelude;
pub mod progress;
pub mod security;
pub mod session;
pub mod signal;
pub mod status;
pub mod sync;

// Re-export key public types for easier use as a library
pub use cancellation::CancellationToken;
pub use config::{Config, ConfigBuilder};
pub use core_types::{RepositoryRef, ResolvedCommit, TreeEntry};
pub use errors::{Error, Result};
pub use status::StatusReport;
pub use sync::{SyncEngine, SyncOptions, SyncReport, SyncState, SyncSummary};

use crate::github::GitHubApi;
use crate::hash_cache::HashCache;
use crate::http::HttpTransport;
use crate::progress::ProgressSink;
use crate::session::{AllProxyEnvProvider, SessionBuilder, SystemBundleProvider, TempCertRegistry};
use crate::sync::RunLock;
use std::path::Path;
use std::sync::Arc;

/// Builds the HTTP session described by `config`.
///
/// Temporary certificate bundles created by auto-detection are tracked in
/// `registry` and removed when it is cleaned up or dropped.
pub fn connect(config: &Config, registry: &Arc<TempCertRegistry>) -> Result<Arc<dyn HttpTransport>> {
    let mut builder = SessionBuilder::new(config.session.clone());
    if config.auto_proxy {
        builder = builder.auto_proxy(AllProxyEnvProvider);
    }
    if config.auto_cert {
        builder = builder.auto_cert(SystemBundleProvider::new(Arc::clone(registry)));
    }
    Ok(Arc::new(builder.build()?))
}

/// Runs a complete sync as described by `config`.
///
/// This mirrors the command-line `sync` subcommand: it builds the session,
/// runs the engine, and cleans up any temporary certificate bundle afterwards.
///
/// # Errors
/// Fatal conditions only (session setup, authentication, missing repository or
/// ref, a held run lock, cancellation). Per-file failures are counted in the
/// returned [`SyncReport`], whose `success` flag is `false` if any occurred.
pub fn run(config: &Config, token: &CancellationToken, progress: &dyn ProgressSink) -> Result<SyncReport> {
    let registry = Arc::new(TempCertRegistry::new());
    let result = connect(config, &registry)
        .and_then(|transport| run_with_transport(config, transport, token, progress));
    let removed = registry.cleanup_all();
    if removed > 0 {
        log::debug!("Removed {} temporary certificate bundle(s)", removed);
    }
    result
}

/// Runs a sync over an already built transport.
pub fn run_with_transport(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
    token: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<SyncReport> {
    let api = GitHubApi::new(transport, &config.api_base, config.repo.clone())?;
    let mut engine = SyncEngine::new(api, &config.local_path, config.sync.clone())
        .with_cancellation(token.clone());
    engine.run(&config.reference, progress)
}

/// Collects the `status` report for `config`.
pub fn status(config: &Config) -> Result<StatusReport> {
    let registry = Arc::new(TempCertRegistry::new());
    let transport = connect(config, &registry)?;
    status_with_transport(config, transport)
}

/// Collects the `status` report over an already built transport.
pub fn status_with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<StatusReport> {
    let api = GitHubApi::new(transport, &config.api_base, config.repo.clone())?;
    Ok(status::collect_status(config, &api))
}

/// Removes the hash cache under `local_path`, forcing a full download next run.
/// Returns how many entries were forgotten.
///
/// # Errors
/// `Error::Locked` while a sync holds the directory, or an I/O error.
pub fn clear_cache(local_path: &Path) -> Result<usize> {
    if !HashCache::cache_file(local_path).exists() {
        return Ok(0);
    }
    let _lock = RunLock::acquire(local_path)?;
    let mut cache = HashCache::load(local_path);
    let count = cache.clear()?;
    log::info!("Cleared {} cached entries in {}", count, local_path.display());
    Ok(count)
}
