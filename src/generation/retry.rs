//! Bounded exponential retry for throttled generation calls

use crate::error::{PipelineError, ServiceErrorKind};
use crate::generation::TextGenerator;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Phrases the generation service uses when throttling or out of quota
const TRANSIENT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "quota",
    "resource_exhausted",
    "resource exhausted",
    "too many requests",
    "overloaded",
];

/// Classify a failed call from its HTTP status (if any) and error text
pub fn classify_failure(status: Option<u16>, message: &str) -> ServiceErrorKind {
    if matches!(status, Some(429 | 503)) {
        return ServiceErrorKind::Transient;
    }

    let lower = message.to_lowercase();
    // 429 only counts as a standalone status code, never inside a larger number
    let status_token = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == "429");
    if status_token || TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ServiceErrorKind::Transient
    } else {
        ServiceErrorKind::Permanent
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Small-output calls: 3 retries, 1s doubling up to 10s
    pub fn light() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// The largest generation: 5 retries, 2s doubling up to 60s
    pub fn heavy() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::light()
    }
}

/// Run `operation`, retrying transient service errors per `policy`.
/// Permanent errors and everything that is not a service error return at once.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(PipelineError::Service {
                kind: ServiceErrorKind::Transient,
                message,
            }) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Generation throttled, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// One completion with the caller's retry ceiling
pub async fn complete_with_retry(
    generator: &dyn TextGenerator,
    policy: &RetryPolicy,
    system_prompt: &str,
    user_prompt: &str,
    max_output_tokens: u32,
) -> Result<String> {
    retry_transient(policy, || {
        generator.complete(system_prompt, user_prompt, max_output_tokens)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{MockGenerator, Scripted};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure(Some(429), ""), ServiceErrorKind::Transient);
        assert_eq!(
            classify_failure(Some(400), "RESOURCE_EXHAUSTED: quota exceeded"),
            ServiceErrorKind::Transient
        );
        assert_eq!(
            classify_failure(None, "Rate limit reached for requests"),
            ServiceErrorKind::Transient
        );
        assert_eq!(
            classify_failure(Some(401), "API key not valid"),
            ServiceErrorKind::Permanent
        );
        assert_eq!(classify_failure(Some(400), "bad request"), ServiceErrorKind::Permanent);
    }

    #[test]
    fn test_429_only_matches_as_status_code() {
        assert_eq!(
            classify_failure(None, "status 429: slow down"),
            ServiceErrorKind::Transient
        );
        assert_eq!(
            classify_failure(None, "HTTP error (429)"),
            ServiceErrorKind::Transient
        );
        assert_eq!(
            classify_failure(None, "invalid argument at offset 1429"),
            ServiceErrorKind::Permanent
        );
        assert_eq!(
            classify_failure(Some(400), "field 4290 is out of range"),
            ServiceErrorKind::Permanent
        );
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let light = RetryPolicy::light();
        assert_eq!(light.delay_for(0), Duration::from_secs(1));
        assert_eq!(light.delay_for(1), Duration::from_secs(2));
        assert_eq!(light.delay_for(3), Duration::from_secs(8));
        assert_eq!(light.delay_for(4), Duration::from_secs(10));

        let heavy = RetryPolicy::heavy();
        assert_eq!(heavy.max_retries, 5);
        assert_eq!(heavy.delay_for(5), Duration::from_secs(60));
        assert_eq!(heavy.delay_for(40), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_until_success() {
        let generator = MockGenerator::new().script(
            "Strategist",
            vec![
                Scripted::Fail(ServiceErrorKind::Transient, "429".to_string()),
                Scripted::Fail(ServiceErrorKind::Transient, "quota".to_string()),
                Scripted::Text("{}".to_string()),
            ],
        );

        let text = complete_with_retry(&generator, &fast_policy(3), "Strategist", "u", 64).await;
        tokio_test::assert_ok!(&text);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_ceiling() {
        let generator =
            MockGenerator::new().fail_for("Strategist", ServiceErrorKind::Transient, "429");

        let result = complete_with_retry(&generator, &fast_policy(2), "Strategist", "u", 64).await;
        let err = tokio_test::assert_err!(result);
        assert!(err.is_retryable());
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let generator =
            MockGenerator::new().fail_for("Strategist", ServiceErrorKind::Permanent, "401");

        let result = complete_with_retry(&generator, &fast_policy(5), "Strategist", "u", 64).await;
        tokio_test::assert_err!(result);
        assert_eq!(generator.call_count(), 1);
    }
}
