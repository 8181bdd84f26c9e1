//! Bounded polling with timeout and cancellation

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{E2eError, E2eResult};

/// How long to keep polling and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(100),
        }
    }
}

/// Poll `probe` until it reports `true`.
///
/// The probe is always run at least once. An `Err` from the probe is
/// returned immediately. Exceeding the policy timeout yields
/// [`E2eError::Timeout`]; cancelling `cancel` yields
/// [`E2eError::Cancelled`] without waiting out the current interval.
pub async fn wait_until<F, Fut>(
    what: &str,
    policy: WaitPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(E2eError::Cancelled(what.to_string()));
        }

        attempts += 1;
        if probe().await? {
            trace!("{} satisfied after {} attempt(s)", what, attempts);
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(E2eError::Timeout {
                what: what.to_string(),
                waited_ms: (now - start).as_millis() as u64,
            });
        }

        let nap = policy.interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(E2eError::Cancelled(what.to_string()));
            }
            _ = sleep(nap) => {}
        }
    }
}
