//! Request executor.
//!
//! # Responsibilities
//! - Validate and resolve a `RequestConfig` once, before any network call
//! - Run attempts: CSRF token, headers, body, transport under timeout
//! - Drive the retry state machine from tagged `RetryDecision`s
//! - Capture CSRF cookie rotations from successful responses
//!
//! # Design Decisions
//! - One attempt counter is shared by CSRF recovery and backoff retries
//! - A failed token refresh during CSRF recovery is raised immediately
//! - The request ID is fixed per logical request, not per attempt

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::csrf::meta::cookie_value;
use crate::csrf::{CsrfTokenManager, HttpTokenSources, PageMeta, TokenSources};
use crate::error::TransportError;
use crate::http::response::{error_from_response, parse_success};
use crate::http::serializer::serialize_body;
use crate::http::transport::{RawRequest, RawResponse, ReqwestTransport, Transport};
use crate::http::RequestConfig;
use crate::observability::metrics;
use crate::observability::tracing::request_span;
use crate::resilience::timeouts::with_timeout;
use crate::resilience::{RetryDecision, RetryPolicy};

/// Message raised when the attempt budget allowed no attempt at all.
pub const EXHAUSTED_MESSAGE: &str = "Request failed after all retry attempts";

/// Resilient client for the admin API.
///
/// Cheap to clone; clones share the transport, cookie jar and CSRF token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    api_root: String,
    transport: Arc<dyn Transport>,
    csrf: Arc<CsrfTokenManager>,
    meta: Arc<PageMeta>,
    policy: RetryPolicy,
    timeout: Duration,
}

/// Builder for `ApiClient`; collaborators default to the HTTP implementations.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    token_sources: Option<Arc<dyn TokenSources>>,
    page_meta: Option<Arc<PageMeta>>,
}

impl ApiClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_sources(mut self, sources: Arc<dyn TokenSources>) -> Self {
        self.token_sources = Some(sources);
        self
    }

    /// Page meta tags of the hosting page, e.g. from `PageMeta::from_html`.
    pub fn page_meta(mut self, meta: Arc<PageMeta>) -> Self {
        self.page_meta = Some(meta);
        self
    }

    pub fn build(self) -> Result<ApiClient, TransportError> {
        let config = self.config;
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            TransportError::invalid_request(format!("Invalid base URL '{}': {}", config.api.base_url, e))
        })?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &base_url,
                Duration::from_secs(config.timeouts.connect_secs),
            )?),
        };
        let meta = self.page_meta.unwrap_or_default();
        let sources: Arc<dyn TokenSources> = match self.token_sources {
            Some(sources) => sources,
            None => Arc::new(HttpTokenSources::new(
                transport.clone(),
                meta.clone(),
                &base_url,
                &config.csrf,
            )?),
        };

        tracing::debug!(api_root = %config.api.api_root(), "API client initialized");

        Ok(ApiClient {
            inner: Arc::new(Inner {
                api_root: config.api.api_root(),
                policy: RetryPolicy::from_config(&config.retries),
                timeout: Duration::from_millis(config.timeouts.request_ms),
                csrf: Arc::new(CsrfTokenManager::new(sources)),
                transport,
                meta,
                config,
            }),
        })
    }
}

impl ApiClient {
    /// Client with the reqwest transport and HTTP token sources.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            transport: None,
            token_sources: None,
            page_meta: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The token manager shared by every request of this client.
    pub fn csrf(&self) -> &CsrfTokenManager {
        &self.inner.csrf
    }

    pub fn page_meta(&self) -> &PageMeta {
        &self.inner.meta
    }

    /// Execute one logical request and return its decoded payload.
    pub async fn send(&self, request: RequestConfig) -> Result<Value, TransportError> {
        let url = request.resolve_url(&self.inner.api_root)?;
        request.validate()?;

        let request_id = Uuid::new_v4();
        let span = request_span(&request_id, request.method, &url);
        self.run(&request, &url, &request_id).instrument(span).await
    }

    /// `send`, deserializing the payload into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, request: RequestConfig) -> Result<T, TransportError> {
        let value = self.send(request).await?;
        serde_json::from_value(value)
            .map_err(|e| TransportError::malformed_response(format!("Unexpected response shape: {}", e)))
    }

    fn policy_for(&self, request: &RequestConfig) -> RetryPolicy {
        let defaults = &self.inner.policy;
        RetryPolicy {
            attempts: request.retries.unwrap_or(defaults.attempts),
            delay: request.retry_delay.unwrap_or(defaults.delay),
            ..defaults.clone()
        }
    }

    async fn run(&self, request: &RequestConfig, url: &Url, request_id: &Uuid) -> Result<Value, TransportError> {
        let policy = self.policy_for(request);
        let timeout = request.timeout.unwrap_or(self.inner.timeout);
        let started = Instant::now();

        for attempt in 0..policy.attempts {
            tracing::debug!(attempt = attempt + 1, max_attempts = policy.attempts, url = %url, "Sending request");

            let err = match self.attempt(request, url, request_id, timeout).await {
                Ok((status, value)) => {
                    tracing::debug!(attempt = attempt + 1, status, "Request succeeded");
                    metrics::record_request(request.method, status, started);
                    return Ok(value);
                }
                Err(err) => err,
            };

            match policy.decide(&err, attempt) {
                RetryDecision::RefreshCsrf { delay } => {
                    tracing::warn!(attempt = attempt + 1, "CSRF token mismatch, refreshing token");
                    self.inner.csrf.clear_token();
                    if let Err(refresh_err) = self.inner.csrf.refresh_token().await {
                        tracing::error!(error = %refresh_err, "CSRF token refresh failed");
                        metrics::record_request(request.method, refresh_err.status(), started);
                        return Err(refresh_err);
                    }
                    metrics::record_retry("csrf");
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Backoff(delay) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = err.status(),
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    metrics::record_retry("backoff");
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    tracing::warn!(attempt = attempt + 1, status = err.status(), error = %err, "Request failed");
                    metrics::record_request(request.method, err.status(), started);
                    return Err(err);
                }
            }
        }

        tracing::error!(max_attempts = policy.attempts, "No attempt was made");
        Err(TransportError::unexpected(EXHAUSTED_MESSAGE))
    }

    async fn attempt(
        &self,
        request: &RequestConfig,
        url: &Url,
        request_id: &Uuid,
        timeout: Duration,
    ) -> Result<(u16, Value), TransportError> {
        let token = if request.method.is_mutating() {
            Some(self.inner.csrf.ensure_valid_token().await?)
        } else {
            None
        };
        let body = request.body.as_ref().map(serialize_body).transpose()?;

        let raw = RawRequest {
            method: request.method,
            url: url.clone(),
            headers: self.build_headers(request, request_id, token),
            body,
            credentials: request.credentials,
        };
        let response = with_timeout(timeout, self.inner.transport.execute(raw)).await?;

        if !response.is_success() {
            return Err(error_from_response(&response));
        }

        let mut value = parse_success(request.method, &response)?;
        if let Some(transform) = &request.transform {
            value = transform(value)?;
        }
        self.capture_rotated_token(&response);
        Ok((response.status, value))
    }

    fn build_headers(&self, request: &RequestConfig, request_id: &Uuid, token: Option<String>) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("X-Request-ID".to_string(), request_id.to_string()),
        ];
        if let Some(body) = &request.body {
            headers.push(("Content-Type".to_string(), body.kind().header_value().to_string()));
        }
        if let Some(token) = token {
            headers.push((self.inner.config.csrf.header_name.clone(), token));
        }

        for (name, value) in &request.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    fn capture_rotated_token(&self, response: &RawResponse) {
        let cookie_name = &self.inner.config.csrf.cookie_name;
        let rotated = response
            .header_values("set-cookie")
            .find_map(|header| cookie_value(header, cookie_name));

        if let Some(token) = rotated {
            if self.inner.csrf.get_token().as_deref() != Some(token.as_str()) {
                tracing::debug!("CSRF token rotated by response cookie");
                self.inner.csrf.set_token(token);
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.inner.api_root)
            .field("policy", &self.inner.policy)
            .field("timeout", &self.inner.timeout)
            .field("csrf", &self.inner.csrf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::transport::TransportFailure;
    use crate::http::{Method, RequestOptions};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Step = Result<RawResponse, TransportFailure>;

    /// Replays a fixed script of outcomes and records what it was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Step>>,
        hang: Option<Duration>,
        seen: Mutex<Vec<(tokio::time::Instant, RawRequest)>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                ..Self::default()
            })
        }

        fn requests(&self) -> Vec<RawRequest> {
            self.seen.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
        }

        fn times(&self) -> Vec<tokio::time::Instant> {
            self.seen.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: RawRequest) -> Result<RawResponse, TransportFailure> {
            self.seen.lock().unwrap().push((tokio::time::Instant::now(), request));
            if let Some(hang) = self.hang {
                tokio::time::sleep(hang).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(response(500, json!({"message": "script exhausted"}))))
        }
    }

    /// Token endpoint hands out the queued tokens; the cookie endpoint always fails.
    #[derive(Default)]
    struct QueuedSources {
        tokens: Mutex<VecDeque<&'static str>>,
        token_calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSources for QueuedSources {
        async fn request_cookie(&self) -> Result<(), TransportError> {
            Err(TransportError::network())
        }

        async fn request_token(&self) -> Result<String, TransportError> {
            self.token_calls.fetch_add(1, Ordering::SeqCst);
            self.tokens
                .lock()
                .unwrap()
                .pop_front()
                .map(str::to_owned)
                .ok_or_else(|| TransportError::new(500, "Server Error"))
        }

        fn meta_token(&self) -> Option<String> {
            None
        }
    }

    fn response(status: u16, body: Value) -> RawResponse {
        RawResponse {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: Bytes::from(body.to_string()),
        }
    }

    fn client(transport: Arc<ScriptedTransport>, tokens: Vec<&'static str>) -> (ApiClient, Arc<QueuedSources>) {
        let sources = Arc::new(QueuedSources {
            tokens: Mutex::new(tokens.into()),
            ..QueuedSources::default()
        });
        let mut config = ClientConfig::default();
        config.api.base_url = "http://pos.test".into();
        let client = ApiClient::builder(config)
            .transport(transport)
            .token_sources(sources.clone())
            .build()
            .unwrap();
        (client, sources)
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn header<'a>(request: &'a RawRequest, name: &str) -> Vec<&'a str> {
        request
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_csrf_mismatch_refreshes_once_and_retries() {
        let transport = ScriptedTransport::new(vec![
            Ok(response(419, json!({"message": "CSRF token mismatch."}))),
            Ok(response(201, json!({"id": "17", "status": "open"}))),
        ]);
        let (client, sources) = client(transport.clone(), vec!["fresh"]);
        client.csrf().set_token("stale");

        let started = tokio::time::Instant::now();
        let order = client
            .send(RequestConfig::path(Method::Post, "orders").json(json!({"table": "4"})))
            .await
            .unwrap();

        assert_eq!(order, json!({"id": 17, "status": "open"}));
        assert_eq!(sources.token_calls.load(Ordering::SeqCst), 1);
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(header(&requests[0], "X-CSRF-TOKEN"), vec!["stale"]);
        assert_eq!(header(&requests[1], "X-CSRF-TOKEN"), vec!["fresh"]);
        assert_near(started.elapsed(), Duration::from_millis(1000));
        assert_eq!(client.csrf().get_token().as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_back_off_exponentially() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportFailure::Connect("connection refused".into())),
            Err(TransportFailure::Connect("connection refused".into())),
            Err(TransportFailure::Connect("connection refused".into())),
        ]);
        let (client, _) = client(transport.clone(), vec![]);

        let err = client.send(RequestConfig::path(Method::Get, "products")).await.unwrap_err();

        assert_eq!(err.status(), 0);
        assert_eq!(err.message(), "Network error. Please check your connection.");
        let times = transport.times();
        assert_eq!(times.len(), 3);
        assert_near(times[1] - times[0], Duration::from_millis(1000));
        assert_near(times[2] - times[1], Duration::from_millis(2000));

        let requests = transport.requests();
        let ids: Vec<_> = requests.iter().map(|r| header(r, "X-Request-ID")).collect();
        assert!(ids.iter().all(|id| id == &ids[0] && id.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried_then_raised() {
        let transport = Arc::new(ScriptedTransport {
            hang: Some(Duration::from_secs(30)),
            ..ScriptedTransport::default()
        });
        let (client, _) = client(transport.clone(), vec![]);

        let err = client
            .send(
                RequestConfig::path(Method::Get, "reports/daily")
                    .timeout(Duration::from_secs(1))
                    .retries(2)
                    .retry_delay(Duration::from_millis(10)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), 408);
        assert_eq!(err.message(), "Request timeout");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_get_with_body_never_reaches_transport() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _) = client(transport.clone(), vec![]);

        let err = client
            .send(RequestConfig::path(Method::Get, "products").json(json!({"q": "tea"})))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 400);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "Request body is not allowed for GET requests");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_url_is_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _) = client(transport.clone(), vec![]);

        let err = client.send(RequestConfig::path(Method::Get, "")).await.unwrap_err();
        assert_eq!(err.message(), "No URL provided");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_http_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(response(404, json!({"message": "Product not found"})))]);
        let (client, _) = client(transport.clone(), vec![]);

        let err = client.send(RequestConfig::path(Method::Get, "products/9")).await.unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.message(), "Product not found");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_never_sends() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _) = client(transport.clone(), vec![]);

        let err = client
            .send(RequestConfig::path(Method::Get, "products").retries(0))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), EXHAUSTED_MESSAGE);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_raised() {
        let transport = ScriptedTransport::new(vec![Ok(response(419, json!({})))]);
        let (client, _) = client(transport.clone(), vec![]);
        client.csrf().set_token("stale");

        let err = client.send(RequestConfig::path(Method::Delete, "orders/3")).await.unwrap_err();
        assert!(err.is_csrf());
        assert_eq!(err.message(), crate::csrf::NO_TOKEN_MESSAGE);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(client.csrf().get_token(), None);
    }

    #[tokio::test]
    async fn test_headers_and_caller_precedence() {
        let transport = ScriptedTransport::new(vec![Ok(response(200, json!([])))]);
        let (client, _) = client(transport.clone(), vec![]);

        client
            .send(
                RequestConfig::path(Method::Get, "/reports")
                    .param("from", "2024-01-01")
                    .header("accept", "text/csv"),
            )
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.url.as_str(), "http://pos.test/api/v1/reports?from=2024-01-01");
        assert_eq!(header(request, "Accept"), vec!["text/csv"]);
        assert_eq!(header(request, "X-Requested-With"), vec!["XMLHttpRequest"]);
        assert!(header(request, "X-CSRF-TOKEN").is_empty());
        assert!(header(request, "Content-Type").is_empty());
    }

    #[tokio::test]
    async fn test_form_body_is_encoded_with_content_type() {
        let transport = ScriptedTransport::new(vec![Ok(response(200, json!({"ok": true})))]);
        let (client, _) = client(transport.clone(), vec!["tok"]);

        client
            .send(RequestConfig::path(Method::Put, "settings").form(json!({"tax": {"rate": "16"}})))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(header(request, "Content-Type"), vec!["application/x-www-form-urlencoded"]);
        assert_eq!(header(request, "X-CSRF-TOKEN"), vec!["tok"]);
        let body = String::from_utf8(request.body.clone().unwrap().to_vec()).unwrap();
        assert_eq!(body, "tax%5Brate%5D=16");
    }

    #[tokio::test]
    async fn test_transform_runs_after_normalization() {
        let transport = ScriptedTransport::new(vec![Ok(response(200, json!({"data": {"total": "42.50"}})))]);
        let (client, _) = client(transport, vec![]);

        let total = client
            .send(RequestConfig::path(Method::Get, "summary").transform(|value| Ok(value["data"]["total"].clone())))
            .await
            .unwrap();
        assert_eq!(total, json!(42.5));
    }

    #[tokio::test]
    async fn test_rotated_cookie_updates_token() {
        let mut ok = response(200, json!({"saved": true}));
        ok.headers
            .push(("set-cookie".into(), "XSRF-TOKEN=rotated%3D%3D; path=/; samesite=lax".into()));
        let transport = ScriptedTransport::new(vec![Ok(ok)]);
        let (client, _) = client(transport, vec!["initial"]);

        client
            .send(RequestConfig::path(Method::Patch, "products/1").json(json!({"price": 3})))
            .await
            .unwrap();
        assert_eq!(client.csrf().get_token().as_deref(), Some("rotated=="));
    }

    #[tokio::test]
    async fn test_send_as_deserializes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Product {
            id: u64,
            name: String,
        }

        let transport = ScriptedTransport::new(vec![Ok(response(200, json!({"id": "5", "name": "Latte"})))]);
        let (client, _) = client(transport, vec![]);

        let product: Product = client
            .send_as(RequestConfig::path(Method::Get, "products/5").with_options(RequestOptions::new()))
            .await
            .unwrap();
        assert_eq!(
            product,
            Product {
                id: 5,
                name: "Latte".into()
            }
        );
    }
}
