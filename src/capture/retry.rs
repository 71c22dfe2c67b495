use crate::capture::config::CaptureConfig;
use crate::capture::{CaptureFailure, CaptureResource};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry budget and backoff per failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rate_limit_backoff: Duration,
    pub transient_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after `failure`, `None` when it should not be retried
    pub fn backoff_for(&self, failure: &CaptureFailure) -> Option<Duration> {
        match failure {
            CaptureFailure::RateLimited(_) => Some(self.rate_limit_backoff),
            CaptureFailure::Transient(_) => Some(self.transient_backoff),
            CaptureFailure::Fatal(_) => None,
        }
    }
}

impl From<&CaptureConfig> for RetryPolicy {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            rate_limit_backoff: config.rate_limit_backoff,
            transient_backoff: config.transient_backoff,
        }
    }
}

/// Why a capture produced no image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Retries exhausted or the failure was fatal
    GaveUp { attempts: u32, failure: CaptureFailure },
    Cancelled,
}

/// Capture the viewport, retrying classified transient failures
pub async fn capture_with_retry<R>(
    resource: &mut R,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, CaptureError>
where
    R: CaptureResource + ?Sized,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let failure = match resource.capture_viewport().await {
            Ok(bytes) => return Ok(bytes),
            Err(failure) => failure,
        };

        let backoff = match policy.backoff_for(&failure) {
            Some(backoff) if attempts <= policy.max_retries => backoff,
            _ => return Err(CaptureError::GaveUp { attempts, failure }),
        };

        log::warn!(
            "{} (attempt {}/{}), retrying in {:?}",
            failure,
            attempts,
            policy.max_retries + 1,
            backoff
        );

        if pause(backoff, cancel).await {
            return Err(CaptureError::Cancelled);
        }
    }
}

/// Sleep for `duration` unless cancelled first; returns `true` when cancelled
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    if duration.is_zero() {
        return false;
    }
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct Scripted {
        outcomes: VecDeque<Result<Vec<u8>, CaptureFailure>>,
        calls: u32,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<Vec<u8>, CaptureFailure>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl CaptureResource for Scripted {
        async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureFailure> {
            self.calls += 1;
            self.outcomes
                .pop_front()
                .unwrap_or_else(|| Err(CaptureFailure::Transient("script exhausted".to_string())))
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            rate_limit_backoff: Duration::ZERO,
            transient_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_by_kind() {
        let policy = RetryPolicy::from(&CaptureConfig::default());

        assert_eq!(
            policy.backoff_for(&CaptureFailure::RateLimited("quota".to_string())),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            policy.backoff_for(&CaptureFailure::Transient("busy".to_string())),
            Some(Duration::from_millis(500))
        );
        assert_eq!(policy.backoff_for(&CaptureFailure::Fatal("gone".to_string())), None);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let mut resource = Scripted::new(vec![
            Err(CaptureFailure::RateLimited("quota".to_string())),
            Err(CaptureFailure::Transient("busy".to_string())),
            Ok(vec![1, 2, 3]),
        ]);

        let bytes = capture_with_retry(&mut resource, &policy(3), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(resource.calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_per_failure_kind() {
        let mut resource = Scripted::new(vec![
            Err(CaptureFailure::RateLimited("quota".to_string())),
            Err(CaptureFailure::Transient("busy".to_string())),
            Err(CaptureFailure::RateLimited("quota".to_string())),
            Ok(vec![7]),
        ]);
        let policy = RetryPolicy::from(&CaptureConfig::default());

        let started = tokio::time::Instant::now();
        capture_with_retry(&mut resource, &policy, &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(3500), "retried after {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3550), "retried after {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_is_cut_short_by_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        assert!(pause(Duration::from_secs(10), &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let mut resource = Scripted::new(vec![]);

        let err = capture_with_retry(&mut resource, &policy(3), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::GaveUp { attempts: 4, .. }));
        assert_eq!(resource.calls, 4);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let mut resource = Scripted::new(vec![Err(CaptureFailure::Fatal("no tab".to_string()))]);

        let err = capture_with_retry(&mut resource, &policy(3), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CaptureError::GaveUp {
                attempts: 1,
                failure: CaptureFailure::Fatal("no tab".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let mut resource = Scripted::new(vec![Err(CaptureFailure::Transient("busy".to_string()))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = capture_with_retry(&mut resource, &policy(3), &cancel).await.unwrap_err();
        assert_eq!(err, CaptureError::Cancelled);
        assert_eq!(resource.calls, 1);
    }
}
