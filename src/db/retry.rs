//! Bounded retry with exponential backoff for idempotent store reads.
//!
//! Only `TrellisError::Database` is considered transient. Writes never go
//! through this helper; a lost status race must surface as a conflict, not
//! be papered over by a retry.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::types::{Result, TrellisError};

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(100);

/// Run `f` up to [`MAX_ATTEMPTS`] times, doubling the delay between
/// attempts. Non-transient errors return immediately.
pub async fn with_backoff<T, F, Fut>(op: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_backoff_cfg(op, MAX_ATTEMPTS, BASE_DELAY, f).await
}

pub(crate) async fn with_backoff_cfg<T, F, Fut>(
    op: &str,
    attempts: u32,
    base_delay: Duration,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = base_delay;
    let mut last_err: Option<TrellisError> = None;

    for attempt in 1..=attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e @ TrellisError::Database(_)) => {
                warn!(
                    op = op,
                    attempt = attempt,
                    error = %e,
                    "transient store failure"
                );
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| TrellisError::Internal(format!("{}: retry exhausted", op))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff_cfg("test", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_backoff_cfg("test", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TrellisError::Database("connection reset".into()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff_cfg("test", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TrellisError::Database("down".into())) }
        })
        .await;

        assert!(matches!(result, Err(TrellisError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff_cfg("test", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TrellisError::NotFound("missing".into())) }
        })
        .await;

        assert!(matches!(result, Err(TrellisError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
