//! Defines application-specific error types.
//!
//! This module provides the top-level `Error` enum plus the narrower
//! `SecurityError`, `ConfigError` and `NetworkError` types it wraps. Fatal
//! run-level failures and per-entry failures share the same taxonomy; the sync
//! engine decides which ones abort a run.

use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Application-specific errors used throughout `treesync`.
#[derive(Error, Debug)]
pub enum Error {
    // --- Remote / API Errors ---
    /// The remote rejected our credentials (HTTP 401).
    #[error("Authentication failed (HTTP 401). Check your token.")]
    Authentication,

    /// The repository does not exist or is not visible with the current credentials.
    #[error("Repository not found: {owner}/{name}")]
    RepositoryNotFound {
        /// Repository owner.
        owner: String,
        /// Repository name.
        name: String,
    },

    /// The remote refused the request because the API rate limit is exhausted.
    #[error("GitHub API rate limit exceeded{}", reset_hint(.reset_at))]
    RateLimit {
        /// Unix timestamp at which the limit resets, if the remote reported one.
        reset_at: Option<u64>,
    },

    /// A connection, timeout, or unexpected HTTP status.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The requested branch, tag or commit could not be resolved.
    #[error("Reference '{reference}' not found in repository")]
    RefNotFound {
        /// The reference as given by the user.
        reference: String,
    },

    // --- Local Errors ---
    /// A path-safety, size-limit or proxy-validation violation.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// Invalid configuration settings or combinations.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error occurring during file or directory access (read, write, metadata).
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        /// The path that caused the I/O error.
        path: String,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// A response or side-file could not be (de)serialized.
    #[error("Failed to parse {context}: {source}")]
    Json {
        /// What was being parsed.
        context: String,
        /// The underlying `serde_json::Error`.
        #[source]
        source: serde_json::Error,
    },

    /// Another run holds the lock on this sync root.
    #[error("Another sync is already running for '{path}'")]
    Locked {
        /// The lock file path.
        path: String,
    },

    /// The operation was cancelled by the user (e.g., Ctrl+C).
    #[error("Operation cancelled by user (Ctrl+C)")]
    Interrupted,
}

fn reset_hint(reset_at: &Option<u64>) -> String {
    match reset_at {
        Some(ts) => format!(" (resets at unix time {})", ts),
        None => String::new(),
    }
}

/// Connection-level and HTTP-status failures. Never retried automatically.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The request did not complete (DNS, connect, TLS, timeout, body read).
    #[error("Network error for '{url}': {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The remote answered with a status the caller could not handle.
    #[error("Unexpected HTTP status {status} from '{url}'")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

/// Machine-readable category of a [`SecurityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityErrorKind {
    PathTraversal,
    SizeLimit,
    InvalidProxyScheme,
    InvalidProxyHost,
    InvalidProxyUrl,
}

impl SecurityErrorKind {
    /// The stable string form used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityErrorKind::PathTraversal => "path_traversal",
            SecurityErrorKind::SizeLimit => "size_limit",
            SecurityErrorKind::InvalidProxyScheme => "invalid_proxy_scheme",
            SecurityErrorKind::InvalidProxyHost => "invalid_proxy_host",
            SecurityErrorKind::InvalidProxyUrl => "invalid_proxy_url",
        }
    }
}

impl fmt::Display for SecurityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security violations. On a single entry these are that entry's failure, never fatal for a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// A repository path would resolve outside the sync root.
    #[error("path_traversal: '{path}' resolves outside of '{root}'")]
    PathTraversal {
        /// The offending repository-relative path.
        path: String,
        /// The sync root.
        root: String,
    },

    /// A repository path points into the local state directory.
    #[error("path_traversal: '{path}' is inside the reserved state directory")]
    ReservedPath {
        /// The offending repository-relative path.
        path: String,
    },

    /// A download exceeded (or announced it would exceed) the byte ceiling.
    #[error("size_limit: '{object}' exceeded size limit of {limit} bytes{}", size_hint(.size))]
    SizeLimit {
        /// Blob id or path being downloaded.
        object: String,
        /// Known or accumulated size when the limit tripped.
        size: Option<u64>,
        /// The configured ceiling.
        limit: u64,
    },

    /// Proxy URL uses a scheme other than http, https, or socks.
    #[error("invalid_proxy_scheme: '{scheme}' is not an allowed proxy scheme")]
    InvalidProxyScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// Proxy hostname contains characters no hostname may contain.
    #[error("invalid_proxy_host: proxy hostname contains suspicious characters")]
    InvalidProxyHost,

    /// A proxy URL component contains control characters.
    #[error("invalid_proxy_url: proxy {component} contains control characters")]
    ControlCharacters {
        /// Which component ("url", "username", "password", "hostname").
        component: &'static str,
    },
}

fn size_hint(size: &Option<u64>) -> String {
    match size {
        Some(s) => format!(" (size: {} bytes, exceeds limit)", s),
        None => String::new(),
    }
}

impl SecurityError {
    /// Returns the category of this violation.
    pub fn kind(&self) -> SecurityErrorKind {
        match self {
            SecurityError::PathTraversal { .. } | SecurityError::ReservedPath { .. } => {
                SecurityErrorKind::PathTraversal
            }
            SecurityError::SizeLimit { .. } => SecurityErrorKind::SizeLimit,
            SecurityError::InvalidProxyScheme { .. } => SecurityErrorKind::InvalidProxyScheme,
            SecurityError::InvalidProxyHost => SecurityErrorKind::InvalidProxyHost,
            SecurityError::ControlCharacters { .. } => SecurityErrorKind::InvalidProxyUrl,
        }
    }
}

/// Errors related to invalid configuration values or combinations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An option has a value that cannot be used.
    #[error("Invalid value for {option}: {reason}")]
    InvalidValue {
        /// The option name (e.g., "--workers").
        option: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required option was not provided by any source.
    #[error("Missing required value: {option}")]
    MissingValue {
        /// The option name.
        option: String,
    },

    /// Two options cannot be used together.
    #[error("Cannot use {option1} and {option2} simultaneously")]
    Conflict {
        /// First option.
        option1: String,
        /// Second option.
        option2: String,
    },

    /// A proxy URL has no hostname.
    #[error("Invalid proxy URL '{url}': missing hostname")]
    MissingProxyHostname {
        /// The rejected URL.
        url: String,
    },

    /// A proxy URL has a port outside 1..=65535.
    #[error("Invalid proxy port: {port} (port out of range 1-65535)")]
    InvalidProxyPort {
        /// The port as written.
        port: String,
    },

    /// The repository URL is not a recognizable GitHub repository URL.
    #[error("Invalid GitHub repository URL: '{url}'")]
    InvalidRepositoryUrl {
        /// The rejected URL.
        url: String,
    },

    /// The repository URL points at a host that is not GitHub.
    #[error("Not a GitHub URL: '{url}'")]
    NotGitHubUrl {
        /// The rejected URL.
        url: String,
    },
}

/// Helper function to create an `Error::Io` with path context.
pub fn io_error_with_path<P: AsRef<std::path::Path>>(source: std::io::Error, path: P) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

impl Error {
    /// Whether a per-entry failure of this kind could succeed on a later run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::RateLimit { .. })
    }
}
