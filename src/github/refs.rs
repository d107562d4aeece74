// src/github/refs.rs
//! Resolves a branch, tag, or commit-ish string to a verified commit id.

use super::api::GitHubApi;
use crate::constants::COMMIT_SEARCH_PAGE_SIZE;
use crate::core_types::{is_abbreviated_commit_id, is_full_commit_id, ResolvedCommit};
use crate::errors::Result;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct GitObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Response of `git/ref/...` and `git/tags/{sha}`: both carry an `object`.
#[derive(Deserialize, Debug)]
struct ObjectPointer {
    object: GitObject,
}

#[derive(Deserialize, Debug)]
struct CommitSummary {
    sha: String,
}

/// Resolves refs using an ordered set of strategies.
///
/// 1. A 40-hex ref is verified as a commit and never reinterpreted as a name.
/// 2. Branch `heads/<ref>`.
/// 3. Tag `tags/<ref>`, dereferencing an annotated tag once.
/// 4. A 7-39 hex ref is matched as a commit id prefix.
///
/// A non-2xx answer at one stage moves on to the next. Transport failures
/// (connection, timeout) are returned as errors.
pub struct RefResolver<'a> {
    api: &'a GitHubApi,
}

impl<'a> RefResolver<'a> {
    pub fn new(api: &'a GitHubApi) -> Self {
        Self { api }
    }

    /// Returns the commit `reference` points at, or `None` if nothing matches.
    pub fn resolve(&self, reference: &str) -> Result<Option<ResolvedCommit>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        if is_full_commit_id(reference) {
            let resolved = self.verify_commit(reference)?;
            if resolved.is_none() {
                log::error!("Commit {} not found", reference);
            }
            return Ok(resolved);
        }

        if let Some(commit) = self.resolve_branch(reference)? {
            log::debug!("Resolved '{}' as branch -> {}", reference, commit.short());
            return Ok(Some(commit));
        }

        if let Some(commit) = self.resolve_tag(reference)? {
            log::debug!("Resolved '{}' as tag -> {}", reference, commit.short());
            return Ok(Some(commit));
        }

        if is_abbreviated_commit_id(reference) {
            if let Some(commit) = self.resolve_prefix(reference)? {
                log::debug!("Resolved '{}' as commit prefix -> {}", reference, commit);
                return Ok(Some(commit));
            }
        }

        Ok(None)
    }

    fn verify_commit(&self, sha: &str) -> Result<Option<ResolvedCommit>> {
        let url = self.api.repo_url(&["git/commits", sha]);
        let response = self.api.get(&url, &[])?;
        if !response.is_success() {
            return Ok(None);
        }
        Ok(ResolvedCommit::from_remote(sha))
    }

    fn resolve_branch(&self, name: &str) -> Result<Option<ResolvedCommit>> {
        Ok(self
            .fetch_pointer(&["git/ref/heads", name])?
            .and_then(|p| ResolvedCommit::from_remote(&p.object.sha)))
    }

    fn resolve_tag(&self, name: &str) -> Result<Option<ResolvedCommit>> {
        let Some(pointer) = self.fetch_pointer(&["git/ref/tags", name])? else {
            return Ok(None);
        };
        if pointer.object.kind == "commit" {
            return Ok(ResolvedCommit::from_remote(&pointer.object.sha));
        }

        // Annotated tag: the ref points at a tag object, which points at the commit.
        let Some(tag) = self.fetch_pointer(&["git/tags", &pointer.object.sha])? else {
            return Ok(None);
        };
        if tag.object.kind != "commit" {
            log::warn!(
                "Tag '{}' points at a {} object, not a commit",
                name,
                tag.object.kind
            );
            return Ok(None);
        }
        Ok(ResolvedCommit::from_remote(&tag.object.sha))
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<Option<ResolvedCommit>> {
        let url = self.api.repo_url(&["commits"]);
        let response = self
            .api
            .get(&url, &[("sha", prefix), ("per_page", COMMIT_SEARCH_PAGE_SIZE)])?;
        if !response.is_success() {
            return Ok(None);
        }
        let commits: Vec<CommitSummary> = match response.json(&url) {
            Ok(commits) => commits,
            Err(e) => {
                log::debug!("Ignoring unreadable commit listing: {}", e);
                return Ok(None);
            }
        };
        let prefix = prefix.to_ascii_lowercase();
        Ok(commits
            .iter()
            .find(|c| c.sha.to_ascii_lowercase().starts_with(&prefix))
            .and_then(|c| ResolvedCommit::from_remote(&c.sha)))
    }

    fn fetch_pointer(&self, segments: &[&str]) -> Result<Option<ObjectPointer>> {
        let url = self.api.repo_url(segments);
        let response = self.api.get(&url, &[])?;
        if !response.is_success() {
            return Ok(None);
        }
        // A prefix match on `git/ref` returns an array; only exact matches count.
        match response.json::<ObjectPointer>(&url) {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                log::debug!("Ignoring non-exact ref response from {}: {}", url, e);
                Ok(None)
            }
        }
    }
}
