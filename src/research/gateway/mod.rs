//! Backend gateways
//!
//! Every call to an external backend goes through [`call_with_policy`], which
//! applies a per-call timeout, a bounded number of retries with exponential
//! backoff, and cooperative cancellation through a [`CancellationToken`].

/// Evidence source wrapper.
pub mod evidence;
/// Generative text backend wrapper.
pub mod synthesis;

pub use evidence::EvidenceGateway;
pub use synthesis::SynthesisGateway;

use crate::types::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Timeout and retry policy for one backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Limit for a single attempt
    pub timeout: Duration,
    /// Extra attempts after the first one fails with a retryable error
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry
    pub retry_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            retry_backoff,
        }
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Run `op` under `policy`, racing every attempt and backoff against `cancel`.
///
/// A cancelled call yields [`AppError::Cancelled`]; an attempt that outlives
/// the policy timeout yields [`AppError::Timeout`]. Only errors for which
/// [`AppError::is_retryable`] holds are retried.
pub async fn call_with_policy<T, F, Fut>(
    policy: &CallPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            res = tokio::time::timeout(policy.timeout, op()) => match res {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Timeout(policy.timeout)),
            },
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Call failed, retrying: {}",
                    e
                );
                attempt += 1;

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AppError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}
