//! Normalization of captured failures into one displayable result.
//!
//! # Responsibilities
//! - Accept any failure the application can capture (`Failure`)
//! - Fold framework validation envelopes into field-error mappings
//! - Guarantee a non-empty message for every input
//!
//! # Design Decisions
//! - `classify` is pure and total; it never panics and never performs I/O
//! - Failure sources are a closed enum, so callers match exhaustively
//!   instead of probing shapes

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::transport::{TransportError, NETWORK_ERROR_MESSAGE, STATUS_NETWORK, STATUS_VALIDATION};

/// Field name → ordered messages, in the order the server sent them.
pub type FieldErrors = IndexMap<String, Vec<String>>;

const VALIDATION_FAILED: &str = "Validation failed";
const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";
const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// One issue reported by client-side schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: Vec<String>,
    pub message: String,
}

/// A client-side schema validation failure: a list of structured issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue for the dotted `path`.
    pub fn issue(mut self, path: &str, message: impl Into<String>) -> Self {
        let path = path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        self.issues.push(SchemaIssue {
            path,
            message: message.into(),
        });
        self
    }

    /// Messages of the issues reported for the dotted `path`, e.g. to show
    /// them next to the matching form field.
    pub fn messages_for(&self, path: &str) -> Vec<&str> {
        let wanted: Vec<&str> = path.split('.').filter(|segment| !segment.is_empty()).collect();
        self.issues
            .iter()
            .filter(|issue| issue.path.iter().map(String::as_str).eq(wanted.iter().copied()))
            .map(|issue| issue.message.as_str())
            .collect()
    }

    fn joined_messages(&self) -> String {
        self.issues
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.joined_messages())
    }
}

impl std::error::Error for SchemaError {}

/// Response attached to a failed direct HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyResponse {
    pub status: u16,
    pub data: Value,
}

/// Failure of a call made directly with an HTTP library rather than through
/// `ApiClient`. `response` is `None` when the server was never reached.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyCallError {
    pub message: String,
    pub response: Option<LegacyResponse>,
}

impl fmt::Display for LegacyCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LegacyCallError {}

impl From<reqwest::Error> for LegacyCallError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            response: err.status().map(|status| LegacyResponse {
                status: status.as_u16(),
                data: Value::Null,
            }),
        }
    }
}

/// Every failure shape the application can hand to `classify`.
#[derive(Debug)]
pub enum Failure {
    Transport(TransportError),
    Schema(SchemaError),
    Legacy(LegacyCallError),
    Error(Box<dyn std::error::Error + Send + Sync>),
    Unknown(Value),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Transport(err)
    }
}

impl From<SchemaError> for Failure {
    fn from(err: SchemaError) -> Self {
        Failure::Schema(err)
    }
}

impl From<LegacyCallError> for Failure {
    fn from(err: LegacyCallError) -> Self {
        Failure::Legacy(err)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::Legacy(err.into())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Failure {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Failure::Error(err)
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::Error(Box::new(err))
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        Failure::Unknown(value)
    }
}

impl From<&str> for Failure {
    fn from(value: &str) -> Self {
        Failure::Unknown(Value::String(value.to_owned()))
    }
}

impl From<String> for Failure {
    fn from(value: String) -> Self {
        Failure::Unknown(Value::String(value))
    }
}

/// The displayable result of classifying any failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl NormalizedError {
    fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            field_errors: None,
        }
    }

    fn validation(errors: FieldErrors) -> Self {
        Self {
            message: join_field_errors(&errors),
            status: Some(STATUS_VALIDATION),
            field_errors: Some(errors),
        }
    }
}

impl TransportError {
    /// Shortcut for `classify(&Failure::Transport(..))`.
    pub fn normalize(&self) -> NormalizedError {
        classify_transport(self)
    }
}

/// The framework's JSON error body: `{message, errors?}`.
struct Envelope {
    message: String,
    errors: Option<FieldErrors>,
}

fn parse_envelope(value: &Value) -> Option<Envelope> {
    let object = value.as_object()?;
    let message = object.get("message")?.as_str()?.to_owned();
    let errors = object.get("errors").and_then(Value::as_object).map(|fields| {
        fields
            .iter()
            .map(|(field, messages)| (field.clone(), field_messages(messages)))
            .collect()
    });
    Some(Envelope { message, errors })
}

fn field_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Join a field-error mapping as `"field: m1, m2; other: m3"`.
pub fn join_field_errors(errors: &FieldErrors) -> String {
    if errors.is_empty() {
        return VALIDATION_FAILED.to_string();
    }
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn non_empty(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

fn classify_transport(err: &TransportError) -> NormalizedError {
    if err.status() == STATUS_VALIDATION {
        if let Some(Envelope {
            errors: Some(errors),
            ..
        }) = err.payload().and_then(parse_envelope)
        {
            return NormalizedError::validation(errors);
        }
    }
    NormalizedError::new(non_empty(err.message(), UNEXPECTED_ERROR), err.status())
}

fn classify_legacy(err: &LegacyCallError) -> NormalizedError {
    let Some(response) = &err.response else {
        return NormalizedError::new(NETWORK_ERROR_MESSAGE, STATUS_NETWORK);
    };

    if let Some(envelope) = parse_envelope(&response.data) {
        return match envelope.errors {
            Some(errors) if response.status == STATUS_VALIDATION => NormalizedError::validation(errors),
            _ => NormalizedError::new(non_empty(&envelope.message, UNEXPECTED_ERROR), response.status),
        };
    }

    NormalizedError::new(
        format!("Request failed with status code {}", response.status),
        response.status,
    )
}

/// Turn any captured failure into a `NormalizedError`.
pub fn classify(failure: &Failure) -> NormalizedError {
    match failure {
        Failure::Transport(err) => classify_transport(err),
        Failure::Schema(err) => NormalizedError::new(err.to_string(), 400),
        Failure::Legacy(err) => classify_legacy(err),
        Failure::Error(err) => NormalizedError::new(non_empty(&err.to_string(), UNEXPECTED_ERROR), 500),
        Failure::Unknown(Value::String(message)) => NormalizedError::new(non_empty(message, UNKNOWN_ERROR), 500),
        Failure::Unknown(_) => NormalizedError::new(UNKNOWN_ERROR, 500),
    }
}
