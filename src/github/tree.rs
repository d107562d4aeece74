// src/github/tree.rs
//! Retrieves the recursive file listing of a commit.

use super::api::GitHubApi;
use super::refs::RefResolver;
use crate::constants::{DEFAULT_REF, FALLBACK_REF};
use crate::core_types::{ResolvedCommit, TreeEntry};
use crate::errors::{NetworkError, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// A tree listing together with the commit it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTree {
    /// The ref that actually resolved (`master` after a fallback).
    pub reference: String,
    pub commit: ResolvedCommit,
    /// Entries in the order the remote returned them.
    pub entries: Vec<TreeEntry>,
    /// The remote cut the listing short.
    pub truncated: bool,
}

impl RepositoryTree {
    /// Blob entries only; directories and submodules are not synced.
    pub fn blobs(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|e| e.is_blob())
    }
}

pub struct TreeFetcher<'a> {
    api: &'a GitHubApi,
}

impl<'a> TreeFetcher<'a> {
    pub fn new(api: &'a GitHubApi) -> Self {
        Self { api }
    }

    /// Resolves `reference` and lists the tree of the resulting commit.
    ///
    /// If `main` does not resolve, `master` is tried once instead. Returns
    /// `None` when neither resolves or the tree object is missing.
    ///
    /// # Errors
    /// Transport failures, and non-404 error statuses on the tree endpoint.
    pub fn fetch(&self, reference: &str, recursive: bool) -> Result<Option<RepositoryTree>> {
        match self.resolve(reference)? {
            Some((reference, commit)) => self.list(reference, commit, recursive),
            None => Ok(None),
        }
    }

    /// Resolves `reference`, substituting `master` once for a missing `main`.
    /// Returns the ref that resolved together with its commit.
    pub fn resolve(&self, reference: &str) -> Result<Option<(String, ResolvedCommit)>> {
        let resolver = RefResolver::new(self.api);
        if let Some(commit) = resolver.resolve(reference)? {
            return Ok(Some((reference.to_string(), commit)));
        }
        if reference != DEFAULT_REF {
            log::error!("Reference '{}' not found", reference);
            return Ok(None);
        }
        log::info!(
            "Reference '{}' not found, trying '{}'",
            DEFAULT_REF,
            FALLBACK_REF
        );
        Ok(resolver
            .resolve(FALLBACK_REF)?
            .map(|commit| (FALLBACK_REF.to_string(), commit)))
    }

    /// Lists the tree of an already resolved commit.
    pub fn list(
        &self,
        reference: String,
        commit: ResolvedCommit,
        recursive: bool,
    ) -> Result<Option<RepositoryTree>> {
        let url = self.api.repo_url(&["git/trees", commit.as_str()]);
        let params: &[(&str, &str)] = if recursive { &[("recursive", "1")] } else { &[] };
        let response = self.api.get(&url, params)?;
        match response.status {
            200..=299 => {}
            404 | 409 => {
                log::error!("Tree for commit {} not found", commit);
                return Ok(None);
            }
            status => return Err(NetworkError::Status { url, status }.into()),
        }

        let parsed: TreeResponse = response.json(&url)?;
        if parsed.truncated {
            log::warn!(
                "The remote truncated the file listing for {}; some files will not be synced",
                commit.short()
            );
        }
        log::debug!(
            "Listed {} entries at {} ({})",
            parsed.tree.len(),
            reference,
            commit.short()
        );
        Ok(Some(RepositoryTree {
            reference,
            commit,
            entries: parsed.tree,
            truncated: parsed.truncated,
        }))
    }
}
