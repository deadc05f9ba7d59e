//! Bounded retry with exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use checkout_types::ProviderError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Retries `call` on transient failures only, a small fixed number of times
/// with doubling backoff. Configuration and permanent errors return
/// immediately.
pub async fn with_retry<T, F, Fut>(operation: &str, mut call: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %err,
                    "transient provider failure, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
