//! Polling with a bounded timeout

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::E2eResult;

/// Poll `predicate` every `poll_interval` until it holds or `timeout` elapses.
///
/// Returns `Ok(true)` once the predicate holds and `Ok(false)` on timeout. The
/// predicate is always evaluated at least once, and once more at the deadline.
/// Errors from the predicate end the wait immediately.
pub async fn await_condition<F, Fut>(
    mut predicate: F,
    timeout: Duration,
    poll_interval: Duration,
) -> E2eResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if predicate().await? {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }

        sleep(poll_interval.min(deadline - now)).await;
    }
}
