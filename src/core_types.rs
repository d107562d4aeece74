//! Defines core data structures shared by the resolver, fetchers and sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a repository on the remote as `owner/name`.
///
/// Both parts are non-empty and contain no path separators. Instances are
/// built by [`crate::github::parse_repository_url`] or [`RepositoryRef::new`].
///
/// # Examples
///
/// ```
/// use treesync::core_types::RepositoryRef;
///
/// let repo = RepositoryRef::new("rust-lang", "cargo").unwrap();
/// assert_eq!(repo.to_string(), "rust-lang/cargo");
/// assert!(RepositoryRef::new("rust-lang", "").is_none());
/// assert!(RepositoryRef::new("a/b", "c").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Returns `None` if either part is empty or contains a separator.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let owner = owner.into();
        let name = name.into();
        let valid = |s: &str| !s.is_empty() && !s.contains(['/', '\\']) && s != "." && s != "..";
        if valid(&owner) && valid(&name) {
            Some(Self { owner, name })
        } else {
            None
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A remote-verified commit id: exactly 40 lowercase hex characters.
///
/// Only the resolver creates these from remote responses; there is no way to
/// build one from an arbitrary string without passing the format check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedCommit(String);

impl ResolvedCommit {
    /// Accepts a full commit id. Uppercase hex is normalized to lowercase.
    pub(crate) fn from_remote(sha: &str) -> Option<Self> {
        let lower = sha.to_ascii_lowercase();
        is_full_commit_id(&lower).then_some(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The conventional 7-character abbreviation, for display.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for ResolvedCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True if `s` is exactly 40 lowercase hex characters.
pub fn is_full_commit_id(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// True if `s` could be an abbreviated commit id (7 to 39 hex characters).
pub fn is_abbreviated_commit_id(s: &str) -> bool {
    (7..40).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A directory.
    Tree,
    /// A submodule pointer.
    Commit,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative POSIX path (non-empty, no leading '/').
    pub path: String,
    /// Remote object id; doubles as the "last synced version" token.
    #[serde(rename = "sha")]
    pub blob_id: String,
    /// Object kind. Only blobs participate in sync.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes, reported for blobs only.
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}
