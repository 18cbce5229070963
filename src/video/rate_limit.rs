//! Sliding-window rate limiting for transcript fetches.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sliding-window rate limiter.
///
/// Admits at most `max_requests` calls per `time_window`. Timestamps come
/// from the monotonic clock, so wall-clock adjustments never distort the
/// window. The lock is held only for bookkeeping, never across a sleep.
pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    requests: Mutex<Vec<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` calls per `time_window`.
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wait until a call slot is free, then claim it.
    ///
    /// Prunes timestamps older than the window; if a slot is free the call
    /// is recorded and returns immediately. Otherwise sleeps until the
    /// oldest recorded call ages out and re-checks, since another caller
    /// may have claimed the freed slot in the meantime.
    pub async fn wait_if_needed(&self) {
        loop {
            let wait = {
                let mut requests = match self.requests.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let now = Instant::now();
                requests.retain(|t| now.duration_since(*t) < self.time_window);

                if requests.len() < self.max_requests {
                    requests.push(now);
                    return;
                }

                let oldest = requests
                    .iter()
                    .min()
                    .copied()
                    .unwrap_or(now);
                self.time_window
                    .saturating_sub(now.duration_since(oldest))
            };

            if !wait.is_zero() {
                debug!("rate limit reached, waiting {:.2}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_under_limit_pass_immediately() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();

        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_call_over_limit_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(300));
        let start = Instant::now();

        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_slots_free_up_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));

        limiter.wait_if_needed().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(2, Duration::from_millis(200)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.wait_if_needed().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 4 calls at 2 per 200ms needs at least one full window of waiting
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
