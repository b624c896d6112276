//! Bounded retry with exponential backoff for transient transport failures.

use crate::constants::{MAX_BACKOFF_DELAY_MS, MAX_FETCH_ATTEMPTS, STARTING_BACKOFF_DELAY_MS};
use crate::core::{FetchbinError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info};

/// How many times to attempt a transfer and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_FETCH_ATTEMPTS,
            initial_backoff: Duration::from_millis(STARTING_BACKOFF_DELAY_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts: `initial, 2*initial, 4*initial, ...` capped at
    /// `max_backoff`, one fewer than `max_attempts`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        // ExponentialBackoff yields factor * 2^n for n >= 1; halving each
        // value makes the sequence start exactly at `initial`.
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_backoff = self.max_backoff;
        ExponentialBackoff::from_millis(2)
            .factor(initial_ms)
            .map(move |delay| (delay / 2).min(max_backoff))
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Run `action` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts.
///
/// `action` receives the 1-based attempt number. Only errors for which
/// [`FetchbinError::is_transient`] holds are retried; the last error is
/// returned unchanged when attempts are exhausted. Waits use `tokio::time`,
/// so they suspend instead of blocking the runtime.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, label: &str, mut action: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempt = AtomicUsize::new(0);
    let max_attempts = policy.max_attempts.max(1);

    RetryIf::spawn(
        policy.delays(),
        || {
            let current = attempt.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("{label}: attempt {current}/{max_attempts}");
            action(current)
        },
        |error: &FetchbinError| {
            let current = attempt.load(Ordering::Relaxed);
            let retry = error.is_transient() && current < max_attempts;
            if retry {
                info!("{label}: attempt {current}/{max_attempts} failed, retrying: {error}");
            }
            retry
        },
    )
    .await
}
