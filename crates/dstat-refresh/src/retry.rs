use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::QueryResult;

/// Fixed backoff schedule: one attempt, then one more after each delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(&[500, 1000])
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_millis(delays: &[u64]) -> Self {
        Self::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `op` until it succeeds, fails with a non-retryable error or the
    /// schedule is exhausted. The last error is returned.
    pub async fn run<T, F, Fut>(&self, query: &'static str, mut op: F) -> QueryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            let Some(delay) = self.delays.get(attempt).copied() else {
                return Err(err);
            };
            attempt += 1;
            warn!(query, attempt, delay_ms = delay.as_millis() as u64, error = %err, "query failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}
