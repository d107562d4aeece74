// src/config/parsing.rs

use crate::constants::DEFAULT_REF;
use crate::errors::{ConfigError, Error, Result};
use byte_unit::Byte;
use std::path::PathBuf;
use std::str::FromStr;

/// Parses an optional human-readable size ("10k", "2MiB", "8192") into bytes.
pub(super) fn parse_size(option: &str, value: Option<&str>) -> Result<Option<u64>> {
    value
        .map(|s| {
            Byte::from_str(s.trim())
                .map(|b| b.as_u64())
                .map_err(|_| {
                    Error::from(ConfigError::InvalidValue {
                        option: option.to_string(),
                        reason: format!("Invalid size format: '{}'", s),
                    })
                })
        })
        .transpose()
}

/// Strips the `refs/heads/` or `refs/tags/` prefix CI systems put on refs.
/// Blank input means the default branch.
pub(super) fn normalize_ref(reference: Option<&str>) -> String {
    let reference = reference.map(str::trim).unwrap_or_default();
    let stripped = reference
        .strip_prefix("refs/heads/")
        .or_else(|| reference.strip_prefix("refs/tags/"))
        .unwrap_or(reference);
    if stripped.is_empty() {
        DEFAULT_REF.to_string()
    } else {
        stripped.to_string()
    }
}

/// Expands a leading `~` to the home directory.
pub(super) fn expand_local_path(raw: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}
