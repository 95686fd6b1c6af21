//! Bounded retry with exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::{RagError, Result};

/// Default attempt budget for remote calls.
pub(crate) const DEFAULT_ATTEMPTS: u32 = 5;

/// Base delay unit for backoff.
pub(crate) const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Failure classification for one remote call attempt.
pub(crate) enum CallError {
    /// Transient server or network trouble; worth retrying.
    Transient(RagError),
    /// Provider rate limiting; worth retrying with a harsher backoff.
    RateLimited(RagError),
    /// Permanent rejection; retrying would never change the outcome.
    Fatal(RagError),
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// Rate limits back off quadratically (`base · n²`), other transient
/// failures linearly (`base · n`). Fatal failures return immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    op_name: &str,
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, CallError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(CallError::Fatal(error)) => return Err(error),
            Err(CallError::RateLimited(error)) if attempt < attempts => {
                let wait = base_delay * attempt * attempt;
                warn!(
                    op = op_name,
                    attempt,
                    wait_secs = wait.as_secs(),
                    error = %error,
                    "rate limited, backing off"
                );
                sleep(wait).await;
            }
            Err(CallError::Transient(error)) if attempt < attempts => {
                let wait = base_delay * attempt;
                warn!(
                    op = op_name,
                    attempt,
                    wait_secs = wait.as_secs(),
                    error = %error,
                    "transient failure, retrying"
                );
                sleep(wait).await;
            }
            Err(CallError::RateLimited(error) | CallError::Transient(error)) => {
                return Err(error);
            }
        }
        attempt += 1;
    }
}
