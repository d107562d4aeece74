//! The `treesync` prelude for convenient library usage.
//!
//! This module re-exports the most commonly used types, traits, and functions
//! from the `treesync` library.
//!
//! # Example
//!
//! ```no_run
//! use treesync::prelude::*;
//! # fn main() -> Result<()> {
//!
//! let config = ConfigBuilder::new()
//!     .repo_url("https://github.com/octo/hello")
//!     .local_path("./hello")
//!     .build()?;
//! let token = CancellationToken::new();
//! let report = run(&config, &token, &NoOpProgress)?;
//! println!("{} files downloaded", report.summary.downloaded);
//!
//! # Ok(())
//! # }
//! ```

pub use crate::cancellation::CancellationToken;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::core_types::{EntryKind, RepositoryRef, ResolvedCommit, TreeEntry};
pub use crate::errors::{Error, Result, SecurityError, SecurityErrorKind};
pub use crate::github::{
    parse_repository_url, ContentFetcher, FetchLimits, GitHubApi, RefResolver, TreeFetcher,
};
pub use crate::hash_cache::HashCache;
pub use crate::http::{HttpResponse, HttpTransport};
pub use crate::progress::{NoOpProgress, ProgressSink, SyncEvent};
pub use crate::security::{resolve_safe_path, validate_proxy_url};
pub use crate::session::{SessionBuilder, SessionConfig, TempCertRegistry, TlsTrust};
pub use crate::sync::{SyncEngine, SyncOptions, SyncReport, SyncSummary};
pub use crate::{clear_cache, run, run_with_transport, status};
