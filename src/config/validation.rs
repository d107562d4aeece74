// src/config/validation.rs

use super::ConfigBuilder;
use crate::errors::{ConfigError, Result};

/// Validates combinations and ranges of options that clap cannot express.
pub(super) fn validate_builder_options(builder: &ConfigBuilder) -> Result<()> {
    if builder.no_ssl_verify.unwrap_or(false) && builder.ca_bundle.is_some() {
        return Err(ConfigError::Conflict {
            option1: "--no-ssl-verify".to_string(),
            option2: "--ca-bundle".to_string(),
        }
        .into());
    }
    if builder.workers == Some(0) {
        return Err(invalid("--workers", "must be 1 or greater"));
    }
    if builder.throttle_every == Some(0) {
        return Err(invalid("--throttle-every", "must be 1 or greater"));
    }
    if builder.timeout_secs == Some(0) {
        return Err(invalid("--timeout", "must be 1 second or more"));
    }
    Ok(())
}

/// Checks parsed byte limits.
pub(super) fn validate_limits(chunk_size: u64, max_file_size: u64) -> Result<()> {
    if chunk_size == 0 {
        return Err(invalid("--chunk-size", "must be greater than 0"));
    }
    if max_file_size == 0 {
        return Err(invalid("--max-file-size", "must be greater than 0"));
    }
    Ok(())
}

fn invalid(option: &str, reason: &str) -> crate::errors::Error {
    ConfigError::InvalidValue {
        option: option.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
