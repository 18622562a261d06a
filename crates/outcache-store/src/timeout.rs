//! Timeout wrapper for store calls.

use outcache_core::OutcacheError;
use std::time::Duration;

/// Wraps an async store operation with a deadline.
pub async fn with_timeout<F, Fut, T>(duration: Duration, f: F) -> Result<T, OutcacheError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, OutcacheError>>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| OutcacheError::Timeout(format!("Store call timed out after {:?}", duration)))?
}
