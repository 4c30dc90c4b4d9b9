//! Token recovery sources.
//!
//! # Responsibilities
//! - Call the cookie-issuing endpoint and mirror the cookie into page meta
//! - Call the token-issuing endpoint and return its token
//! - Read the token the page currently exposes

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::CsrfConfig;
use crate::csrf::meta::{cookie_value, PageMeta};
use crate::error::TransportError;
use crate::http::response::error_from_response;
use crate::http::transport::{RawRequest, RawResponse, Transport};
use crate::http::{Credentials, Method};
use crate::resilience::timeouts::with_timeout;

/// The two independent issuance mechanisms plus the page fallback.
#[async_trait]
pub trait TokenSources: Send + Sync {
    /// Ask the server to (re)issue the anti-forgery cookie.
    async fn request_cookie(&self) -> Result<(), TransportError>;

    /// Ask the dedicated endpoint for a token.
    async fn request_token(&self) -> Result<String, TransportError>;

    /// Token currently exposed by the page, if any.
    fn meta_token(&self) -> Option<String>;
}

/// `TokenSources` that talks to the application over a `Transport`.
pub struct HttpTokenSources {
    transport: Arc<dyn Transport>,
    meta: Arc<PageMeta>,
    cookie_url: Url,
    token_url: Url,
    cookie_name: String,
    meta_name: String,
    timeout: Duration,
}

impl HttpTokenSources {
    pub fn new(
        transport: Arc<dyn Transport>,
        meta: Arc<PageMeta>,
        base_url: &Url,
        config: &CsrfConfig,
    ) -> Result<Self, TransportError> {
        let join = |endpoint: &str| {
            base_url
                .join(endpoint)
                .map_err(|e| TransportError::invalid_request(format!("Invalid CSRF endpoint '{}': {}", endpoint, e)))
        };

        Ok(Self {
            transport,
            meta,
            cookie_url: join(&config.cookie_endpoint)?,
            token_url: join(&config.token_endpoint)?,
            cookie_name: config.cookie_name.clone(),
            meta_name: config.meta_name.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let request = RawRequest {
            method: Method::Get,
            url: url.clone(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ],
            body: None,
            credentials: Credentials::SameOrigin,
        };
        let response = with_timeout(self.timeout, self.transport.execute(request)).await?;
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        Ok(response)
    }
}

#[async_trait]
impl TokenSources for HttpTokenSources {
    async fn request_cookie(&self) -> Result<(), TransportError> {
        let response = self.get(&self.cookie_url).await?;
        let token = response
            .header_values("set-cookie")
            .find_map(|header| cookie_value(header, &self.cookie_name));
        if let Some(token) = token {
            self.meta.set(&self.meta_name, token);
        }
        Ok(())
    }

    async fn request_token(&self) -> Result<String, TransportError> {
        let response = self.get(&self.token_url).await?;
        let body: Value = serde_json::from_slice(&response.body)
            .map_err(|e| TransportError::malformed_response(format!("Invalid token response: {}", e)))?;
        body.get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| TransportError::malformed_response("Token endpoint returned no token"))
    }

    fn meta_token(&self) -> Option<String> {
        self.meta.get(&self.meta_name)
    }
}
