// src/github/api.rs
//! Endpoint construction and repository-level calls against the GitHub REST API.

use crate::core_types::RepositoryRef;
use crate::errors::{ConfigError, Error, NetworkError, Result};
use crate::http::{HttpResponse, HttpTransport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Repository metadata returned by `GET /repos/{owner}/{repo}`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// The core rate-limit bucket from `GET /rate_limit`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp of the next reset.
    pub reset: u64,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    rate: RateLimitStatus,
}

/// A handle on one repository of one API server.
///
/// Cheap to clone; the transport is shared.
#[derive(Clone)]
pub struct GitHubApi {
    transport: Arc<dyn HttpTransport>,
    base: Url,
    repo: RepositoryRef,
}

impl GitHubApi {
    /// Creates a handle for `repo` on the API server at `api_base`.
    pub fn new(transport: Arc<dyn HttpTransport>, api_base: &str, repo: RepositoryRef) -> Result<Self> {
        let base = Url::parse(api_base).map_err(|e| ConfigError::InvalidValue {
            option: "--api-url".to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                option: "--api-url".to_string(),
                reason: format!("'{}' is not an http(s) base URL", api_base),
            }
            .into());
        }
        Ok(Self {
            transport,
            base,
            repo,
        })
    }

    pub fn repository(&self) -> &RepositoryRef {
        &self.repo
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Builds `<base>/<segments...>`. Each segment is split on `/` and
    /// percent-encoded separately.
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(
                segments
                    .iter()
                    .flat_map(|s| s.split('/'))
                    .filter(|s| !s.is_empty()),
            );
        }
        url.to_string()
    }

    /// Builds `<base>/repos/<owner>/<name>/<segments...>`.
    pub fn repo_url(&self, segments: &[&str]) -> String {
        let mut all = vec!["repos", self.repo.owner(), self.repo.name()];
        all.extend_from_slice(segments);
        self.url(&all)
    }

    pub fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        self.transport.get(url, params, &[])
    }

    pub fn get_with_headers(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        self.transport.get(url, params, headers)
    }

    pub fn head(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.transport.head(url, headers)
    }

    /// Verifies the repository is reachable with the current credentials.
    ///
    /// # Errors
    /// `Authentication` on 401, `RepositoryNotFound` on 404, `RateLimit` on a
    /// rate-limited 403, `Network` for anything else.
    pub fn check_connection(&self) -> Result<RepositoryInfo> {
        let url = self.repo_url(&[]);
        let response = self.get(&url, &[])?;
        match response.status {
            200..=299 => {
                let info: RepositoryInfo = response.json(&url)?;
                log::info!("Successfully connected to {}", self.repo);
                Ok(info)
            }
            401 => Err(Error::Authentication),
            404 => Err(Error::RepositoryNotFound {
                owner: self.repo.owner().to_string(),
                name: self.repo.name().to_string(),
            }),
            _ => Err(rate_limit_error(&response).unwrap_or_else(|| {
                NetworkError::Status {
                    url,
                    status: response.status,
                }
                .into()
            })),
        }
    }

    /// Fetches the core rate-limit bucket. `None` if the server does not report one.
    pub fn rate_limit(&self) -> Result<Option<RateLimitStatus>> {
        let url = self.url(&["rate_limit"]);
        let response = self.get(&url, &[])?;
        if !response.is_success() {
            log::debug!("Rate limit endpoint returned HTTP {}", response.status);
            return Ok(None);
        }
        let parsed: RateLimitResponse = response.json(&url)?;
        Ok(Some(parsed.rate))
    }
}

impl std::fmt::Debug for GitHubApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApi")
            .field("base", &self.base.as_str())
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// Returns `Error::RateLimit` if `response` is a 403/429 carrying GitHub's
/// exhausted-quota signal.
pub fn rate_limit_error(response: &HttpResponse) -> Option<Error> {
    if !matches!(response.status, 403 | 429) {
        return None;
    }
    let exhausted = response
        .header("x-ratelimit-remaining")
        .map(|v| v.trim() == "0")
        .unwrap_or(false);
    if !exhausted && response.status != 429 {
        return None;
    }
    let reset_at = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse().ok());
    Some(Error::RateLimit { reset_at })
}
