//! Fixed-interval retry driver.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::policy::RetryPolicy;

/// Fatal outcome reported by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The remote side reported the operation as failed.
    OperationFailed(String),
    /// Status reads kept failing past the failure budget.
    StatusUnavailable(String),
}

/// Classified result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Terminal success, stop polling.
    Done,
    /// Not terminal yet; the text explains why, for diagnostics.
    Retry(String),
    /// Terminal failure, stop polling.
    Fatal(PollError),
}

/// Why the driver stopped without success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    Fatal(PollError),
    DeadlineExceeded {
        elapsed: Duration,
        attempts: u32,
        last: Option<String>,
    },
    Cancelled {
        attempts: u32,
        last: Option<String>,
    },
}

/// Run `probe` until it reports a terminal outcome.
///
/// The first attempt runs immediately; later attempts follow `policy.interval`
/// apart. When the next attempt would start at or beyond `policy.max_elapsed`
/// the driver stops with [`DriverError::DeadlineExceeded`]. A probe still
/// running at the deadline is abandoned. Cancelling `cancel` interrupts both
/// the sleep and an in-flight probe.
///
/// Returns the number of attempts made on success.
pub async fn run_until_terminal<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<u32, DriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe>,
{
    let start = Instant::now();
    // None when the wait is too long to represent, i.e. unbounded.
    let deadline = start.checked_add(policy.max_elapsed);
    let mut attempts = 0u32;
    let mut last: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(DriverError::Cancelled { attempts, last });
        }

        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DriverError::Cancelled { attempts, last });
            }
            _ = until(deadline) => {
                return Err(DriverError::DeadlineExceeded {
                    elapsed: start.elapsed(),
                    attempts,
                    last,
                });
            }
            outcome = probe() => outcome,
        };

        match outcome {
            Probe::Done => return Ok(attempts),
            Probe::Fatal(e) => return Err(DriverError::Fatal(e)),
            Probe::Retry(reason) => {
                debug!(attempt = attempts, reason = %reason, "Not terminal yet");
                last = Some(reason);
            }
        }

        let elapsed = start.elapsed();
        if elapsed.saturating_add(policy.interval) >= policy.max_elapsed {
            return Err(DriverError::DeadlineExceeded {
                elapsed,
                attempts,
                last,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DriverError::Cancelled { attempts, last });
            }
            _ = sleep(policy.interval) => {}
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
