//! Resilient API request layer for the POS admin application.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │ get/post/put/patch/delete/head, send(RequestConfig)
//!       ▼
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │ client::ApiClient                                            │
//!  │   resolve + validate ──▶ attempt loop ──▶ RetryDecision      │
//!  │                            │    ▲           │                │
//!  │         ┌──────────────────┘    │           ▼                │
//!  │         ▼                       │    RefreshCsrf / Backoff   │
//!  │  ┌─────────────┐   ┌────────────┴──┐   / GiveUp              │
//!  │  │ csrf        │   │ http          │                         │
//!  │  │ token mgr   │   │ serializer    │──▶ Transport ──▶ server │
//!  │  │ + sources   │   │ response      │    (reqwest, cookies)   │
//!  │  └─────────────┘   └───────────────┘                         │
//!  └──────────────────────────────────────────────────────────────┘
//!       │ TransportError
//!       ▼
//!  error::classify ──▶ NormalizedError {message, status, field_errors}
//!
//!  Cross-cutting: config (TOML), resilience (timeouts, backoff),
//!                 observability (tracing, metrics)
//! ```

// Core
pub mod client;
pub mod csrf;
pub mod error;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{classify, Failure, NormalizedError, TransportError};
pub use http::{Body, Method, RequestConfig, RequestOptions};
