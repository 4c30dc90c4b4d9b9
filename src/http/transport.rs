//! HTTP transport seam.
//!
//! # Responsibilities
//! - Execute one fully-built request and return the raw response
//! - Keep a cookie jar and apply the credentials policy
//! - Map low-level client errors into `TransportFailure`
//!
//! # Design Decisions
//! - The executor only talks to the `Transport` trait, so retry and CSRF
//!   logic are testable without sockets
//! - Response bodies are read fully inside the transport; the caller's
//!   timeout therefore covers the body as well as the headers

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, SET_COOKIE};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::{Origin, Url};

use crate::error::TransportError;
use crate::http::request::{Credentials, Method};

/// A request ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub credentials: Credentials,
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RawResponse {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a header, matched case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP layer: no usable response was produced.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// The server could not be reached or the connection dropped.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The underlying client gave up waiting.
    #[error("transport timed out")]
    Timeout,

    /// Anything the client could not categorize.
    #[error("{0}")]
    Other(String),
}

impl From<TransportFailure> for TransportError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Connect(_) => TransportError::network(),
            TransportFailure::Timeout => TransportError::timeout(),
            TransportFailure::Other(message) => TransportError::unexpected(message),
        }
    }
}

/// Executes raw requests. Implemented by `ReqwestTransport` and by test doubles.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse, TransportFailure>;
}

/// `Transport` backed by a pooled `reqwest::Client` and a cookie jar.
pub struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    origin: Origin,
}

impl ReqwestTransport {
    /// Build a transport for the application at `base_url`.
    pub fn new(base_url: &Url, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pos-api-client/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            jar: Arc::new(Jar::default()),
            origin: base_url.origin(),
        })
    }

    fn sends_cookies(&self, request: &RawRequest) -> bool {
        match request.credentials {
            Credentials::Omit => false,
            Credentials::SameOrigin => request.url.origin() == self.origin,
            Credentials::Include => true,
        }
    }

    fn map_error(error: reqwest::Error) -> TransportFailure {
        if error.is_timeout() {
            return TransportFailure::Timeout;
        }
        if error.is_connect() || error.is_request() {
            return TransportFailure::Connect(error.to_string());
        }
        TransportFailure::Other(error.to_string())
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("origin", &self.origin.ascii_serialization())
            .finish()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse, TransportFailure> {
        let with_cookies = self.sends_cookies(&request);
        let mut builder = self.client.request(request.method.into(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if with_cookies {
            if let Some(cookies) = self.jar.cookies(&request.url) {
                builder = builder.header(COOKIE, cookies);
            }
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(Self::map_error)?;

        if with_cookies {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            self.jar.set_cookies(&mut set_cookies, &request.url);
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(Self::map_error)?;

        Ok(RawResponse { status, headers, body })
    }
}
