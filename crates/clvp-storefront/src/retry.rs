//! Retry with exponential backoff for storefront page fetches.
//!
//! Only transient conditions are retried: 429 responses, 5xx responses and
//! network-level failures. Everything else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::StorefrontError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`StorefrontError::RateLimited`]: HTTP 429.
/// - [`StorefrontError::UnexpectedStatus`] with a 5xx status.
/// - [`StorefrontError::Http`]: connection reset, request timeout and similar.
///
/// A 404 or a page missing its anchors returns the same result on every try.
fn is_retriable(err: &StorefrontError) -> bool {
    match err {
        StorefrontError::RateLimited { .. } | StorefrontError::Http(_) => true,
        StorefrontError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times.
///
/// The wait before retry `n` (1-based) is `backoff_base_ms * 2^(n-1)`
/// milliseconds. With `max_retries = 1` and `backoff_base_ms = 250` a failing
/// fetch is attempted twice, 250ms apart.
///
/// Dropping the returned future (for example when a navigation is
/// superseded) cancels any pending sleep and attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, StorefrontError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorefrontError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient storefront error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
