//! Defines the core `Config` struct for a sync run.
//!
//! All settings parsed and validated from the CLI or set programmatically through
//! [`ConfigBuilder`] end up here, grouped by the component that consumes them.

use crate::core_types::RepositoryRef;
use crate::session::SessionConfig;
use crate::sync::SyncOptions;
use std::path::PathBuf;

pub use builder::ConfigBuilder;
mod builder;
mod parsing;
mod validation;

/// Immutable settings for one repository and one local directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository owner and name, parsed from `repo_url`.
    pub repo: RepositoryRef,
    /// The repository URL as given.
    pub repo_url: String,
    /// REST API base, without a trailing slash.
    pub api_base: String,
    /// Directory the repository is mirrored into.
    pub local_path: PathBuf,
    /// Branch, tag or commit to sync, already normalized.
    pub reference: String,
    /// Token, TLS trust, explicit proxy and timeout for the HTTP session.
    pub session: SessionConfig,
    /// Detect a proxy when none is configured.
    pub auto_proxy: bool,
    /// Build a CA bundle from the system stores when none is configured.
    pub auto_cert: bool,
    /// Options handed to the sync engine.
    pub sync: SyncOptions,
    /// Print the summary as JSON.
    pub json: bool,
    pub show_progress: bool,
}
