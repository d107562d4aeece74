// src/github/mod.rs
//! Talks to the GitHub REST API.
//!
//! This module provides:
//! - Repository URL parsing into a [`RepositoryRef`](crate::core_types::RepositoryRef).
//! - [`GitHubApi`], which builds endpoint URLs and performs repository-level calls.
//! - [`RefResolver`], [`TreeFetcher`] and [`ContentFetcher`], the three stages
//!   a sync goes through before anything is written locally.

mod api;
mod content;
mod refs;
mod tree;
mod url;

pub use api::{rate_limit_error, GitHubApi, RateLimitStatus, RepositoryInfo};
pub use content::{ContentFetcher, FetchLimits, FetchPath, FetchedContent};
pub use refs::RefResolver;
pub use tree::{RepositoryTree, TreeFetcher};
pub use self::url::{host_of_api_base, parse_repository_url, parse_repository_url_for_hosts, GITHUB_HOSTS};
