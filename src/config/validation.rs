//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout > 0, addresses parse)
//! - Check the endpoint prefix can be embedded in URLs
//! - Compile eligibility patterns once so typos fail at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DevLazyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::codec::KEY_DELIMITER;
use crate::config::schema::DevLazyConfig;
use crate::selection::PatternMatcher;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("lazy.unused_timeout_ms must be greater than zero")]
    ZeroUnusedTimeout,

    #[error("lazy.base_uri '{0}' must be a non-empty path without '@', '?' or '#'")]
    InvalidBaseUri(String),

    #[error("lazy.public_url '{url}' is not a valid URL: {reason}")]
    InvalidPublicUrl { url: String, reason: String },

    #[error("lazy.test: {0}")]
    InvalidPattern(String),

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &DevLazyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let lazy = &config.lazy;

    if lazy.unused_timeout_ms == 0 {
        errors.push(ValidationError::ZeroUnusedTimeout);
    }

    let base = lazy.base_uri.trim_matches('/');
    if base.is_empty() || base.contains(|c: char| matches!(c, KEY_DELIMITER | '?' | '#')) {
        errors.push(ValidationError::InvalidBaseUri(lazy.base_uri.clone()));
    }

    if let Some(public_url) = &lazy.public_url {
        if let Err(e) = url::Url::parse(public_url) {
            errors.push(ValidationError::InvalidPublicUrl {
                url: public_url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if let Some(patterns) = &lazy.test {
        if let Err(e) = PatternMatcher::new(patterns.iter(), &config.server.context) {
            errors.push(ValidationError::InvalidPattern(e.to_string()));
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
