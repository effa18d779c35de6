//! Retry utilities for supplier HTTP calls.
//!
//! Provides exponential backoff retry logic for transient HTTP errors such as
//! 429 responses and network failures (including per-call timeouts).
//! Non-retriable errors (parse failures, 404s, other statuses) are propagated
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`SourceError::RateLimited`]: HTTP 429.
/// - [`SourceError::Http`]: connection reset, timeout, TLS failure.
///
/// Everything else is returned to the caller on the first occurrence.
fn is_retriable(err: &SourceError) -> bool {
    matches!(err, SourceError::RateLimited { .. } | SourceError::Http(_))
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_secs * 2^attempt`
/// seconds and tries again, up to `max_retries` additional attempts after the
/// first try. If all retries are exhausted the last error is returned.
///
/// With `max_retries = 2` the operation is attempted at most 3 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %last_err,
            "transient source error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> SourceError {
        SourceError::RateLimited {
            domain: "supplier.example".to_owned(),
            retry_after_secs: 0,
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, SourceError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, SourceError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(rate_limited())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(SourceError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(SourceError::NotFound {
                    url: "https://supplier.example/products".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_unexpected_status() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(SourceError::UnexpectedStatus {
                    status: 503,
                    url: "https://supplier.example/products".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
