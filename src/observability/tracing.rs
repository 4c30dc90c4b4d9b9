//! Request spans.
//!
//! Every logical request runs inside one span carrying its request ID, so
//! attempt, retry and CSRF events correlate in the logs.

use ::tracing::Span;
use url::Url;
use uuid::Uuid;

use crate::http::Method;

/// Span for one logical request, across all of its attempts.
pub fn request_span(request_id: &Uuid, method: Method, url: &Url) -> Span {
    ::tracing::info_span!(
        "api_request",
        request_id = %request_id,
        method = %method,
        path = %url.path(),
    )
}
