//! Async test utilities

use std::future::Future;
use std::time::Duration;

/// Run a future with a timeout, returning `Err` if it does not finish in time
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll an async condition until it holds or the timeout elapses
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "test-utils")]
/// # {
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use slotwise_common::testing::poll_until;
///
/// # async fn demo() {
/// let processed = Arc::new(AtomicUsize::new(0));
/// let seen = processed.clone();
///
/// let done = poll_until(Duration::from_secs(1), Duration::from_millis(10), || {
///     let seen = seen.clone();
///     async move { seen.load(Ordering::SeqCst) >= 3 }
/// })
/// .await;
/// # let _ = done;
/// # }
/// # }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    false
}
