//! Caller-side retry with exponential backoff.
//!
//! Adapters never retry on their own; composition code opts in here so
//! the extra latency and cost stay visible at the call site.

use std::future::Future;
use std::time::Duration;
use log::{debug, warn};

use crate::error::Result;

/// Retry policy for retryable failures (rate limits, connection errors)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_retries: usize
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
}

impl RetryPolicy
{   pub fn new(
      max_retries: usize
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
        }
    }

    /// Single attempt, no retries
    pub fn disabled() -> Self
    {   RetryPolicy::new(0, 1.0, 0)
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   let multiplier
          = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        Duration::from_millis(
          (self.initial_backoff.as_millis() as f32
            * multiplier) as u64
        )
    }

    /// Run `op` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
      F: FnMut() -> Fut
    , Fut: Future<Output = Result<T>>
    {   let mut attempt = 0;
        loop
        {   match op().await
            {   Ok(value) => return Ok(value)
              , Err(e) if e.is_retryable() && attempt < self.max_retries => {
                  let wait = self.backoff_for_attempt(attempt);
                  warn!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1, e, wait
                  );
                  tokio::time::sleep(wait).await;
                  attempt += 1;
                }
              , Err(e) => {
                  debug!("Giving up after {} attempt(s): {}", attempt + 1, e);
                  return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, 2.0, 100)
    }
}
