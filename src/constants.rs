// src/constants.rs

/// Public GitHub REST API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Ref synced when none is given.
pub const DEFAULT_REF: &str = "main";

/// The one ref substituted when the default ref does not exist.
pub const FALLBACK_REF: &str = "master";

/// Files larger than this skip the contents endpoint (1 MiB).
pub const DEFAULT_INLINE_THRESHOLD: u64 = 1024 * 1024;

/// Hard ceiling on any single download (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read size for streamed blob downloads (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pause after every this many downloads.
pub const DEFAULT_THROTTLE_EVERY: u64 = 100;

pub const DEFAULT_THROTTLE_PAUSE_MS: u64 = 100;

/// Directory under the sync root holding engine state.
pub const STATE_DIR_NAME: &str = ".synccache";

pub const HASH_CACHE_FILE_NAME: &str = "file_hashes.json";

pub const LOCK_FILE_NAME: &str = "sync.lock";

pub const GITHUB_JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Makes the blobs endpoint return raw bytes instead of base64 JSON.
pub const GITHUB_RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

pub const USER_AGENT: &str = concat!("treesync/", env!("CARGO_PKG_VERSION"));

/// Page size for the commit-prefix search.
pub const COMMIT_SEARCH_PAGE_SIZE: &str = "100";
