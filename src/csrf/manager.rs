//! Anti-forgery token lifecycle.
//!
//! # Responsibilities
//! - Own the single cached token for the whole client
//! - Recover a token from the cookie endpoint, the token endpoint, or the page
//! - Coalesce concurrent refreshes into one recovery
//!
//! # State Transitions
//! ```text
//! absent ──refresh/ensure──▶ cached ──419 (clear)──▶ absent
//!                              ▲  │
//!                              └──┘ set_token (rotated cookie)
//! ```

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::csrf::sources::TokenSources;
use crate::error::TransportError;
use crate::observability::metrics;

/// Message raised when every recovery source came back empty.
pub const NO_TOKEN_MESSAGE: &str = "No CSRF token available after refresh attempts";

/// Sole owner of the cached anti-forgery token.
pub struct CsrfTokenManager {
    token: ArcSwapOption<String>,
    /// Bumped on every successful store; lets queued refreshers detect that
    /// a refresh completed while they waited.
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    sources: Arc<dyn TokenSources>,
}

impl CsrfTokenManager {
    pub fn new(sources: Arc<dyn TokenSources>) -> Self {
        Self {
            token: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            sources,
        }
    }

    /// Current token without any network call.
    pub fn get_token(&self) -> Option<String> {
        self.token.load_full().map(|token| token.as_ref().clone())
    }

    /// Replace the cached token. An empty token clears the cache.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            self.clear_token();
            return;
        }
        self.token.store(Some(Arc::new(token)));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn clear_token(&self) {
        self.token.store(None);
    }

    /// Cached token, or a freshly recovered one when nothing is cached.
    pub async fn ensure_valid_token(&self) -> Result<String, TransportError> {
        if let Some(token) = self.get_token() {
            return Ok(token);
        }
        self.refresh_token().await
    }

    /// Recover a token even if one is cached.
    ///
    /// Callers that queued behind an in-flight refresh reuse its result.
    pub async fn refresh_token(&self) -> Result<String, TransportError> {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(token) = self.get_token() {
                tracing::debug!("Reusing CSRF token from concurrent refresh");
                return Ok(token);
            }
        }

        match self.recover().await {
            Some(token) => {
                self.set_token(token.clone());
                metrics::record_csrf_refresh(true);
                tracing::debug!("CSRF token refreshed");
                Ok(token)
            }
            None => {
                metrics::record_csrf_refresh(false);
                tracing::warn!("CSRF token recovery exhausted every source");
                Err(TransportError::csrf_mismatch(NO_TOKEN_MESSAGE))
            }
        }
    }

    async fn recover(&self) -> Option<String> {
        match self.sources.request_cookie().await {
            Ok(()) => {
                if let Some(token) = self.sources.meta_token() {
                    return Some(token);
                }
                tracing::debug!("Cookie endpoint succeeded but page exposes no token");
            }
            Err(e) => tracing::warn!(error = %e, "CSRF cookie endpoint failed"),
        }

        match self.sources.request_token().await {
            Ok(token) if !token.is_empty() => return Some(token),
            Ok(_) => tracing::warn!("CSRF token endpoint returned an empty token"),
            Err(e) => tracing::warn!(error = %e, "CSRF token endpoint failed"),
        }

        self.sources.meta_token()
    }
}

impl std::fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenManager")
            .field("has_token", &self.token.load().is_some())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
