//! Handles parsing of GitHub repository URLs.

use crate::core_types::RepositoryRef;
use crate::errors::{ConfigError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts accepted for github.com repositories.
pub const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Regex for scp-style SSH remotes: `git@host:owner/repo(.git)`
static SSH_REMOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@([^:/]+):([^/]+)/([^/]+?)(?:\.git)?/?$").unwrap()
});

/// Parses a github.com repository URL into a [`RepositoryRef`].
///
/// Accepts `https://github.com/owner/repo`, optional `www.`, a `.git` suffix,
/// trailing slashes, extra path segments (`/tree/main/src`), `ssh://` URLs,
/// and scp-style `git@github.com:owner/repo.git` remotes.
///
/// # Examples
/// ```
/// use treesync::github::parse_repository_url;
///
/// let repo = parse_repository_url("https://github.com/rust-lang/cargo/tree/master/src").unwrap();
/// assert_eq!(repo.owner(), "rust-lang");
/// assert_eq!(repo.name(), "cargo");
///
/// let repo = parse_repository_url("git@github.com:octo/hello-world.git").unwrap();
/// assert_eq!(repo.name(), "hello-world");
///
/// assert!(parse_repository_url("https://gitlab.com/owner/repo").is_err());
/// ```
pub fn parse_repository_url(url: &str) -> Result<RepositoryRef> {
    parse_repository_url_for_hosts(url, GITHUB_HOSTS)
}

/// Like [`parse_repository_url`], but accepts the given hosts (e.g. a GitHub
/// Enterprise server) instead of github.com.
pub fn parse_repository_url_for_hosts(url: &str, hosts: &[&str]) -> Result<RepositoryRef> {
    let trimmed = url.trim();
    let invalid = || ConfigError::InvalidRepositoryUrl {
        url: url.to_string(),
    };
    let host_ok = |host: &str| hosts.iter().any(|h| h.eq_ignore_ascii_case(host));

    if let Some(caps) = SSH_REMOTE_RE.captures(trimmed) {
        let host = caps.get(1).map_or("", |m| m.as_str());
        if !host_ok(host) {
            return Err(ConfigError::NotGitHubUrl {
                url: url.to_string(),
            }
            .into());
        }
        let owner = caps.get(2).map_or("", |m| m.as_str());
        let name = caps.get(3).map_or("", |m| m.as_str());
        return RepositoryRef::new(owner, name).ok_or_else(|| invalid().into());
    }

    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https" | "ssh") {
        return Err(invalid().into());
    }
    match parsed.host_str() {
        Some(host) if host_ok(host) => {}
        _ => {
            return Err(ConfigError::NotGitHubUrl {
                url: url.to_string(),
            }
            .into())
        }
    }

    let mut segments = parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(invalid)?;
    let name = segments.next().ok_or_else(invalid)?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    RepositoryRef::new(owner, name).ok_or_else(|| invalid().into())
}

/// Derives the web host of a GitHub Enterprise server from its API base URL
/// (`https://ghe.example.com/api/v3` -> `ghe.example.com`).
pub fn host_of_api_base(api_base: &str) -> Option<String> {
    let parsed = Url::parse(api_base).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("api.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    fn owner_name(url: &str) -> (String, String) {
        let repo = parse_repository_url(url).unwrap();
        (repo.owner().to_string(), repo.name().to_string())
    }

    #[test]
    fn test_parse_basic_urls() {
        let expected = ("owner".to_string(), "repo".to_string());
        assert_eq!(owner_name("https://github.com/owner/repo"), expected);
        assert_eq!(owner_name("https://www.github.com/owner/repo"), expected);
        assert_eq!(owner_name("https://github.com/owner/repo.git"), expected);
        assert_eq!(owner_name("https://github.com/owner/repo/"), expected);
        assert_eq!(owner_name("https://github.com/owner/repo/tree/main/src"), expected);
        assert_eq!(owner_name("git@github.com:owner/repo.git"), expected);
        assert_eq!(owner_name("ssh://git@github.com/owner/repo.git"), expected);
        assert_eq!(owner_name("ssh://git@github.com:22/owner/repo"), expected);
        assert_eq!(owner_name("  https://github.com/owner/repo  "), expected);
    }

    #[test]
    fn test_parse_rejects_other_hosts() {
        let err = parse_repository_url("https://gitlab.com/owner/repo").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotGitHubUrl { .. })));
        assert!(err.to_string().contains("Not a GitHub URL"));

        let err = parse_repository_url("git@gitlab.com:owner/repo.git").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotGitHubUrl { .. })));

        let err = parse_repository_url("ssh://git@gitlab.com/owner/repo.git").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotGitHubUrl { .. })));
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        for url in ["https://github.com/owner", "https://github.com/", "not a url", "ftp://github.com/o/r"] {
            let err = parse_repository_url(url).unwrap_err();
            assert!(
                err.to_string().contains("Invalid GitHub repository URL"),
                "{}: {}",
                url,
                err
            );
        }
    }

    #[test]
    fn test_parse_enterprise_host() {
        let host = host_of_api_base("https://ghe.example.com/api/v3").unwrap();
        assert_eq!(host, "ghe.example.com");
        let repo = parse_repository_url_for_hosts("https://ghe.example.com/team/tool", &[&host]).unwrap();
        assert_eq!(repo.to_string(), "team/tool");
        assert!(parse_repository_url_for_hosts("https://github.com/a/b", &[&host]).is_err());

        assert_eq!(host_of_api_base("https://api.github.com").as_deref(), Some("github.com"));
    }
}
