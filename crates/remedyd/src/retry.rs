use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: usize,
    pub(crate) delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Calls `op` until it succeeds, fails with an error `retryable` rejects,
    /// or `max_attempts` is reached. The last error is returned.
    pub(crate) async fn run<T, E, F, Fut, P>(
        &self,
        label: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => {
                    if attempt > 1 {
                        info!("{label} succeeded on attempt {attempt}/{}", self.max_attempts);
                    }
                    return Ok(v);
                }
                Err(err) => {
                    if !retryable(&err) || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    warn!(
                        "{label} attempt {attempt}/{} failed: {err}; retrying in {}ms",
                        self.max_attempts,
                        self.delay.as_millis()
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
