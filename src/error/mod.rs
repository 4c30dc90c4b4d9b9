//! Error taxonomy.
//!
//! # Data Flow
//! ```text
//! executor failure ──────────┐
//! direct reqwest call ───────┼─▶ Failure ─▶ classify() ─▶ NormalizedError
//! client-side schema check ──┘                              {message, status, field_errors}
//! ```
//!
//! # Design Decisions
//! - `TransportError` is the only error the request layer returns
//! - Predicates derive from the status code, `ErrorKind` refines it
//! - Classification never fails, so every caller can always show a message

pub mod classify;
pub mod transport;

pub use classify::{
    classify, join_field_errors, Failure, FieldErrors, LegacyCallError, LegacyResponse, NormalizedError,
    SchemaError, SchemaIssue,
};
pub use transport::{ErrorKind, TransportError, NETWORK_ERROR_MESSAGE};
