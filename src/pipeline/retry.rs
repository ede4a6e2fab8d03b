//! Retry with exponential backoff and jitter.
//!
//! HTTP 429 and network failures are transient: the endpoint is throttling
//! or a connection dropped. Anything else (400 bad request, 403 bad key, 500
//! internal) will not improve by asking again, so it is reported on the
//! first attempt.
//!
//! The wait before attempt `n` (1-based, `n ≥ 2`) is
//! `base_delay_ms * 2^(n-2) + rand(0..=max_jitter_ms)`. With the defaults
//! (500 ms base, 250 ms jitter, 3 attempts) that is roughly 0.5 s then 1 s.

use crate::error::CallError;
use crate::pipeline::response::error_message;
use crate::transport::HttpReply;
use rand::Rng;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least 1.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the wait before `attempt` (1-based).
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 2);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Full wait before `attempt`, jitter included.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_backoff(attempt) + Duration::from_millis(jitter_ms(self.max_jitter_ms))
    }
}

fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=max)
    }
}

/// Result of a retried exchange plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub outcome: Result<T, CallError>,
    pub attempts: u32,
}

/// Classify a raw reply: 2xx passes through, 429 is rate limiting, the rest
/// is a terminal HTTP error carrying the endpoint's own message.
pub fn classify(reply: HttpReply) -> Result<HttpReply, CallError> {
    if reply.is_success() {
        return Ok(reply);
    }
    let message = error_message(reply.status, &reply.body);
    if reply.status == 429 {
        Err(CallError::RateLimited { message })
    } else {
        Err(CallError::Http {
            status: reply.status,
            message,
        })
    }
}

/// Call `send` until it succeeds, fails terminally, or attempts run out.
///
/// `send` receives the 1-based attempt number. On exhaustion the last
/// retryable error is returned as-is.
pub async fn send_with_retry<F, Fut>(policy: &RetryPolicy, mut send: F) -> Attempted<HttpReply>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<HttpReply, CallError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = send(attempt).await.and_then(classify);

        match outcome {
            Ok(reply) => {
                return Attempted {
                    outcome: Ok(reply),
                    attempts: attempt,
                }
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = policy.backoff(attempt + 1);
                warn!(
                    "attempt {}/{} failed ({}); retrying in {}ms",
                    attempt,
                    max_attempts,
                    e,
                    wait.as_millis()
                );
                sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                return Attempted {
                    outcome: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_jitter_ms: 0,
        }
    }

    /// Replays `script` one reply per call and counts calls.
    async fn run(
        script: Vec<Result<HttpReply, CallError>>,
        policy: RetryPolicy,
    ) -> (Attempted<HttpReply>, usize) {
        let queue = Mutex::new(VecDeque::from(script));
        let calls = Mutex::new(0usize);
        let result = send_with_retry(&policy, |_| {
            *calls.lock().unwrap() += 1;
            let next = queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");
            async move { next }
        })
        .await;
        let n = *calls.lock().unwrap();
        (result, n)
    }

    #[tokio::test]
    async fn rate_limited_twice_then_success() {
        let (result, calls) = run(
            vec![
                Ok(HttpReply::new(429, "")),
                Ok(HttpReply::new(429, "")),
                Ok(HttpReply::new(200, "ok")),
            ],
            fast(),
        )
        .await;
        assert_eq!(result.attempts, 3);
        assert_eq!(calls, 3);
        assert_eq!(result.outcome.unwrap().body, "ok");
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let (result, calls) = run(vec![Ok(HttpReply::new(500, ""))], fast()).await;
        assert_eq!(result.attempts, 1);
        assert_eq!(calls, 1);
        assert!(matches!(result.outcome, Err(CallError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn transport_failures_are_retried() {
        let (result, _) = run(
            vec![
                Err(CallError::Transport("connection reset".into())),
                Ok(HttpReply::new(200, "ok")),
            ],
            fast(),
        )
        .await;
        assert_eq!(result.attempts, 2);
        assert!(result.outcome.is_ok());
    }

    #[tokio::test]
    async fn exhaustion_surfaces_last_error() {
        let (result, calls) = run(
            vec![
                Err(CallError::Transport("first".into())),
                Err(CallError::Transport("second".into())),
                Ok(HttpReply::new(429, r#"{"error":{"message":"quota exhausted"}}"#)),
            ],
            fast(),
        )
        .await;
        assert_eq!(calls, 3);
        assert_eq!(result.attempts, 3);
        assert_eq!(
            result.outcome,
            Err(CallError::RateLimited {
                message: "quota exhausted".into()
            })
        );
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..fast()
        };
        let (result, calls) = tokio_test::block_on(run(vec![Ok(HttpReply::new(429, ""))], policy));
        assert_eq!(calls, 1);
        assert!(matches!(result.outcome, Err(CallError::RateLimited { .. })));
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
            max_jitter_ms: 0,
        };
        assert_eq!(p.backoff(1), Duration::ZERO);
        assert_eq!(p.backoff(2), Duration::from_millis(100));
        assert_eq!(p.backoff(3), Duration::from_millis(200));
        assert_eq!(p.backoff(4), Duration::from_millis(400));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            max_jitter_ms: 50,
        };
        for _ in 0..100 {
            let wait = p.backoff(2).as_millis();
            assert!((100..=150).contains(&wait), "got {wait}");
        }
    }
}
