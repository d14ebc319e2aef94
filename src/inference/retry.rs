use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

/// Policy controlling how many attempts an operation gets and the delay
/// between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least one.
    pub attempts: usize,
    /// Delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Execute `op`, retrying on error according to the policy.
    pub async fn retry<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.attempts => {
                    warn!(attempt, error = %e, "attempt failed; retrying");
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "final attempt failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn stops_after_configured_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let res: Result<(), String> = policy
            .retry(|| {
                calls.set(calls.get() + 1);
                async { Err("down".to_string()) }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        let _: Result<(), String> = policy
            .retry(|| {
                calls.set(calls.get() + 1);
                async { Err("down".to_string()) }
            })
            .await;
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn recovers_and_logs_failed_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let res: Result<u8, String> = policy
            .retry(|| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { if n < 2 { Err("flaky".to_string()) } else { Ok(7) } }
            })
            .await;
        assert_eq!(res, Ok(7));
        assert!(logs_contain("attempt failed; retrying"));
    }
}
