//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client, csrf, resilience produce:
//!     → logging.rs (structured log events)
//!     → tracing.rs (one span per logical request)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - Recording is always on; exposition (subscriber, exporter) is opt-in
//!   by the embedding binary
//! - The request ID flows into the span and the `X-Request-ID` header

pub mod logging;
pub mod metrics;
pub mod tracing;
