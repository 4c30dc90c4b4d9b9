//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the base URL and endpoint shapes
//! - Validate value ranges (attempts ≥ 1, delays ordered, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the client

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => errors.push(ValidationError::new(
            "api.base_url",
            format!("scheme must be http or https, got '{}'", url.scheme()),
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("api.base_url", format!("invalid URL: {}", e))),
    }

    for (field, endpoint) in [
        ("csrf.cookie_endpoint", &config.csrf.cookie_endpoint),
        ("csrf.token_endpoint", &config.csrf.token_endpoint),
    ] {
        if !endpoint.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    for (field, name) in [
        ("csrf.header_name", &config.csrf.header_name),
        ("csrf.meta_name", &config.csrf.meta_name),
        ("csrf.cookie_name", &config.csrf.cookie_name),
    ] {
        if name.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must be greater than or equal to base_delay_ms",
        ));
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be greater than 0"));
    }
    if config.csrf.timeout_ms == 0 {
        errors.push(ValidationError::new("csrf.timeout_ms", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
