//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the admin application lives.
    pub api: ApiConfig,

    /// Anti-forgery token recovery settings.
    pub csrf: CsrfConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Location of the application and its API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Same-origin base URL (e.g., "https://pos.example.com").
    pub base_url: String,

    /// Prefix joined between the base URL and request paths.
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            prefix: "/api/v1".to_string(),
        }
    }
}

impl ApiConfig {
    /// Base URL and prefix joined, without a trailing slash.
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }
}

/// CSRF endpoints and names.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CsrfConfig {
    /// Endpoint that sets the anti-forgery cookie.
    pub cookie_endpoint: String,

    /// Endpoint that returns `{token}`.
    pub token_endpoint: String,

    /// Header carrying the token on mutating requests.
    pub header_name: String,

    /// Page meta tag holding the current token.
    pub meta_name: String,

    /// Cookie the server stores the token in.
    pub cookie_name: String,

    /// Timeout for each recovery call in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_endpoint: "/sanctum/csrf-cookie".to_string(),
            token_endpoint: "/csrf-token".to_string(),
            header_name: "X-CSRF-TOKEN".to_string(),
            meta_name: "csrf-token".to_string(),
            cookie_name: "XSRF-TOKEN".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Default per-attempt request timeout in milliseconds. Effectively
    /// unbounded; callers needing responsive cancellation override it.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, first one included.
    pub max_attempts: u32,

    /// Base delay for CSRF retries and exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to backoff delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
