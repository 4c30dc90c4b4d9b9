//! Request description for one logical API call.
//!
//! # Responsibilities
//! - Describe target, method, query, headers and body of a call
//! - Carry per-call overrides (timeout, retry budget, credentials)
//! - Resolve the final URL and reject malformed requests early

use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::TransportError;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Methods that change server state and must carry the CSRF token.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }

    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Head | Method::Options)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Logical serialization mode of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Form,
    Text,
    Blob,
    ByteBuffer,
}

impl ContentKind {
    pub fn header_value(&self) -> &'static str {
        match self {
            ContentKind::Json => "application/json",
            ContentKind::Form => "application/x-www-form-urlencoded",
            ContentKind::Text => "text/plain",
            ContentKind::Blob | ContentKind::ByteBuffer => "application/octet-stream",
        }
    }
}

/// Request payload tagged with its serialization mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Form(Value),
    Text(String),
    Blob(Bytes),
    ByteBuffer(Bytes),
}

impl Body {
    pub fn kind(&self) -> ContentKind {
        match self {
            Body::Json(_) => ContentKind::Json,
            Body::Form(_) => ContentKind::Form,
            Body::Text(_) => ContentKind::Text,
            Body::Blob(_) => ContentKind::Blob,
            Body::ByteBuffer(_) => ContentKind::ByteBuffer,
        }
    }
}

/// Where a request goes: a path under the API root, or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    Url(String),
}

/// Whether cookies travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    /// Only for URLs on the configured base origin.
    #[default]
    SameOrigin,
    Include,
}

/// A primitive query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(value) => f.write_str(value),
            ParamValue::Int(value) => write!(f, "{}", value),
            ParamValue::Float(value) => write!(f, "{}", value),
            ParamValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Caller-supplied post-processing of a decoded success payload.
pub type ResponseTransform = Arc<dyn Fn(Value) -> Result<Value, TransportError> + Send + Sync>;

/// Optional per-call settings shared by the convenience wrappers.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, Option<ParamValue>)>,
    pub headers: Vec<(String, String)>,
    pub transform: Option<ResponseTransform>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub credentials: Option<Credentials>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((key.into(), Some(value.into())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("transform", &self.transform.is_some())
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// One logical outbound call.
///
/// `None` for `timeout`, `retries` and `retry_delay` means "use the client
/// defaults".
#[derive(Clone)]
pub struct RequestConfig {
    pub target: Target,
    pub method: Method,
    pub params: Vec<(String, Option<ParamValue>)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub transform: Option<ResponseTransform>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub credentials: Credentials,
}

impl RequestConfig {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            target,
            method,
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            transform: None,
            timeout: None,
            retries: None,
            retry_delay: None,
            credentials: Credentials::default(),
        }
    }

    /// Request a path relative to the API root.
    pub fn path(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, Target::Path(path.into()))
    }

    /// Request an absolute URL.
    pub fn url(method: Method, url: impl Into<String>) -> Self {
        Self::new(method, Target::Url(url.into()))
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((key.into(), Some(value.into())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(Body::Json(value))
    }

    pub fn form(self, value: Value) -> Self {
        self.body(Body::Form(value))
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Merge convenience-wrapper options into this config.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.params.extend(options.params);
        self.headers.extend(options.headers);
        self.transform = options.transform.or(self.transform);
        self.timeout = options.timeout.or(self.timeout);
        self.retries = options.retries.or(self.retries);
        self.retry_delay = options.retry_delay.or(self.retry_delay);
        if let Some(credentials) = options.credentials {
            self.credentials = credentials;
        }
        self
    }

    /// Reject requests that are malformed before any network call.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.body.is_some() && !self.method.allows_body() {
            return Err(TransportError::invalid_request(format!(
                "Request body is not allowed for {} requests",
                self.method
            )));
        }
        Ok(())
    }

    /// Resolve the full URL (with query string) against `api_root`.
    pub fn resolve_url(&self, api_root: &str) -> Result<Url, TransportError> {
        let raw = match &self.target {
            Target::Url(url) if !url.trim().is_empty() => url.trim().to_string(),
            Target::Path(path) if !path.trim().is_empty() => format!(
                "{}/{}",
                api_root.trim_end_matches('/'),
                path.trim().trim_start_matches('/')
            ),
            _ => return Err(TransportError::invalid_request("No URL provided")),
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| TransportError::invalid_request(format!("Invalid URL '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::invalid_request(format!(
                "Invalid URL scheme: {}",
                url.scheme()
            )));
        }

        let present: Vec<(&str, String)> = self
            .params
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.as_str(), value.to_string())))
            .collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in present {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("target", &self.target)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(Body::kind))
            .field("transform", &self.transform.is_some())
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const ROOT: &str = "http://pos.test/api/v1";

    #[test]
    fn test_path_is_joined_under_api_root() {
        let config = RequestConfig::path(Method::Get, "/products")
            .param("page", 2)
            .param("search", "flat white");
        let url = config.resolve_url(ROOT).unwrap();
        assert_eq!(url.as_str(), "http://pos.test/api/v1/products?page=2&search=flat+white");
    }

    #[test]
    fn test_absent_params_are_skipped() {
        let mut config = RequestConfig::path(Method::Get, "orders").param("status", "open");
        config.params.push(("customer".into(), None));
        let url = config.resolve_url(ROOT).unwrap();
        assert_eq!(url.query(), Some("status=open"));
    }

    #[test]
    fn test_absolute_url_bypasses_root() {
        let config = RequestConfig::url(Method::Get, "https://cdn.pos.test/receipts/1.pdf");
        let url = config.resolve_url(ROOT).unwrap();
        assert_eq!(url.as_str(), "https://cdn.pos.test/receipts/1.pdf");
    }

    #[test]
    fn test_missing_target_is_invalid() {
        let err = RequestConfig::path(Method::Get, "  ").resolve_url(ROOT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "No URL provided");
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let err = RequestConfig::url(Method::Get, "ftp://pos.test/file")
            .resolve_url(ROOT)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.message().contains("scheme"));
    }

    #[test]
    fn test_body_on_get_is_rejected() {
        let config = RequestConfig::path(Method::Get, "products").json(json!({"a": 1}));
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "Request body is not allowed for GET requests");

        let config = RequestConfig::path(Method::Post, "products").json(json!({"a": 1}));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_options_override_config() {
        let options = RequestOptions::new()
            .param("page", 1)
            .header("X-Store", "12")
            .retries(5)
            .timeout(Duration::from_secs(3));
        let config = RequestConfig::path(Method::Get, "products")
            .retries(1)
            .with_options(options);
        assert_eq!(config.retries, Some(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.headers, vec![("X-Store".to_string(), "12".to_string())]);
        assert_eq!(config.params.len(), 1);
    }

    #[test]
    fn test_content_kind_headers() {
        assert_eq!(Body::Json(json!({})).kind().header_value(), "application/json");
        assert_eq!(
            Body::Form(json!({})).kind().header_value(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(Body::Text(String::new()).kind().header_value(), "text/plain");
        assert_eq!(
            Body::ByteBuffer(Bytes::new()).kind().header_value(),
            "application/octet-stream"
        );
        assert!(Method::Delete.is_mutating());
        assert!(!Method::Head.is_mutating());
    }
}
