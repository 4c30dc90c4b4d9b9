//! Transport error surfaced to every caller of the client.

use serde_json::Value;
use thiserror::Error;

/// Message used for every connection-level failure.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Status reserved for failures that never produced an HTTP response.
pub const STATUS_NETWORK: u16 = 0;
/// Status used when a request exceeded its deadline.
pub const STATUS_TIMEOUT: u16 = 408;
/// Laravel's "page expired" status, raised on anti-forgery mismatch.
pub const STATUS_CSRF_MISMATCH: u16 = 419;
/// Status used for structured validation failures.
pub const STATUS_VALIDATION: u16 = 422;

/// Closed set of failure kinds a request can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No HTTP response was received (DNS, refused, reset).
    Network,
    /// The request exceeded its timeout.
    Timeout,
    /// The server rejected the anti-forgery token.
    CsrfMismatch,
    /// The server rejected the payload with field-level messages.
    Validation,
    /// Any other 4xx response.
    Client,
    /// Any 5xx response.
    Server,
    /// A non-2xx status outside 4xx/5xx, e.g. an unfollowed redirect.
    Http,
    /// A 2xx response whose body could not be decoded.
    MalformedResponse,
    /// The request was rejected before reaching the network.
    InvalidRequest,
    /// A transport failure outside every known category.
    Unexpected,
}

impl ErrorKind {
    /// Kind implied by an HTTP status code alone.
    pub fn from_status(status: u16) -> Self {
        match status {
            STATUS_NETWORK => ErrorKind::Network,
            STATUS_TIMEOUT => ErrorKind::Timeout,
            STATUS_CSRF_MISMATCH => ErrorKind::CsrfMismatch,
            STATUS_VALIDATION => ErrorKind::Validation,
            400..=499 => ErrorKind::Client,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Http,
        }
    }
}

/// The single error type returned by the request layer.
///
/// Classification predicates are derived from `status` only, so they can
/// never disagree with it. `kind` refines the status for the cases a status
/// code cannot express (malformed bodies, rejected requests).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    status: u16,
    message: String,
    payload: Option<Value>,
    kind: ErrorKind,
}

impl TransportError {
    /// Create an error whose kind follows from the status code.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
            kind: ErrorKind::from_status(status),
        }
    }

    /// Create an error for an HTTP response, keeping the raw server payload.
    pub fn http(status: u16, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            payload,
            ..Self::new(status, message)
        }
    }

    pub fn network() -> Self {
        Self::new(STATUS_NETWORK, NETWORK_ERROR_MESSAGE)
    }

    pub fn timeout() -> Self {
        Self::new(STATUS_TIMEOUT, "Request timeout")
    }

    pub fn csrf_mismatch(message: impl Into<String>) -> Self {
        Self::new(STATUS_CSRF_MISMATCH, message)
    }

    /// A request that was rejected before any network call (status 400).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            ..Self::new(400, message)
        }
    }

    /// A success response whose body could not be decoded (status 500).
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::MalformedResponse,
            ..Self::new(500, message)
        }
    }

    /// A transport failure that fits no other category (status 500).
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unexpected,
            ..Self::new(500, message)
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_network(&self) -> bool {
        self.status == STATUS_NETWORK
    }

    pub fn is_client(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_auth(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    pub fn is_csrf(&self) -> bool {
        self.status == STATUS_CSRF_MISMATCH
    }

    pub fn is_timeout(&self) -> bool {
        self.status == STATUS_TIMEOUT
    }

    pub fn is_validation(&self) -> bool {
        self.status == STATUS_VALIDATION
    }
}
