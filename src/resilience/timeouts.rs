//! Timeout enforcement.
//!
//! Expiry drops the wrapped future, which cancels the in-flight transport
//! call; nothing from a timed-out attempt completes after this returns.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::TransportError;

/// Run `fut` under `duration`, mapping expiry to a 408 `TransportError`.
pub async fn with_timeout<T, E, F>(duration: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TransportError>,
{
    match timeout(duration, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(TransportError::timeout()),
    }
}
