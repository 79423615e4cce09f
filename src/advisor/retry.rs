//! Retry manager with exponential backoff
//!
//! Used around remote calls (advisor, transcription):
//! - `max_retries` extra attempts after the first
//! - Binary exponential delay with ±25% jitter, capped
//! - Only transient failures are retried; the last error is returned

use crate::errors::{Result, TriageError};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::warn;

/// Default number of retries (the hosted LLM client used 2)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff
const BASE_DELAY_MS: u64 = 500;

/// Maximum delay cap
const MAX_DELAY_MS: u64 = 8000;

/// Retry manager with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryManager {
    /// Retries after the first attempt
    max_retries: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Maximum delay cap in milliseconds
    max_delay_ms: u64,

    /// Enable jitter
    enable_jitter: bool,

    /// Where retry attempts are reported
    telemetry: Option<TelemetryCollector>,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryManager {
    /// Create new retry manager with default settings
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_RETRIES, BASE_DELAY_MS)
    }

    /// Create retry manager with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
            telemetry: None,
        }
    }

    /// Report retry attempts to a telemetry collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// A manager that never retries
    pub fn disabled() -> Self {
        Self::with_config(0, BASE_DELAY_MS)
    }

    /// Execute operation with retry logic
    pub async fn execute_with_retry<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !Self::is_retryable(&e) || attempt >= self.max_retries {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    attempt += 1;
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    if let Some(telemetry) = &self.telemetry {
                        telemetry.record(TelemetryEvent::RetryAttempt {
                            call: label.to_string(),
                            attempt,
                            timestamp: Instant::now(),
                        });
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculate delay before retry number `attempt` (0-based)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let delay_ms = exponential_delay.min(self.max_delay_ms);

        let final_delay = if self.enable_jitter {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Transport failures, rate limiting and server errors are transient
    fn is_retryable(error: &TriageError) -> bool {
        match error {
            TriageError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TriageError::ServiceStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn unavailable() -> TriageError {
        TriageError::ServiceStatus {
            service: "advisor".to_string(),
            status: 503,
            body: "overloaded".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let retry_manager = RetryManager::with_config(2, 1);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = retry_manager
            .execute_with_retry("test", move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Ok::<i32, TriageError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let retry_manager = RetryManager::with_config(2, 1);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = retry_manager
            .execute_with_retry("test", move || {
                let count = count_clone.clone();
                async move {
                    let mut attempts = count.lock().unwrap();
                    *attempts += 1;
                    let current = *attempts;
                    drop(attempts);

                    if current < 3 {
                        Err(unavailable())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let retry_manager = RetryManager::with_config(2, 1);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = retry_manager
            .execute_with_retry("test", move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err::<i32, _>(unavailable())
                }
            })
            .await;

        assert!(matches!(result, Err(TriageError::ServiceStatus { status: 503, .. })));
        assert_eq!(*attempt_count.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let retry_manager = RetryManager::with_config(2, 1);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = retry_manager
            .execute_with_retry("test", move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err::<i32, _>(TriageError::ServiceStatus {
                        service: "advisor".to_string(),
                        status: 401,
                        body: "bad key".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_calculate_delay() {
        let retry_manager = RetryManager {
            max_delay_ms: 8000,
            enable_jitter: false,
            ..RetryManager::with_config(5, 500)
        };

        assert_eq!(retry_manager.calculate_delay(0), Duration::from_millis(500));
        assert_eq!(retry_manager.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(retry_manager.calculate_delay(2), Duration::from_millis(2000));
        assert_eq!(retry_manager.calculate_delay(10), Duration::from_millis(8000));
    }

    #[test]
    fn test_retry_attempts_reported_to_telemetry() {
        let telemetry = TelemetryCollector::new();
        let retry_manager = RetryManager::with_config(3, 1).with_telemetry(telemetry.clone());

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = tokio_test::block_on(retry_manager.execute_with_retry("describe", move || {
            let count = count_clone.clone();
            async move {
                let mut attempts = count.lock().unwrap();
                *attempts += 1;
                if *attempts < 3 {
                    Err(unavailable())
                } else {
                    Ok("ok")
                }
            }
        }));

        tokio_test::assert_ok!(result);
        assert_eq!(telemetry.get_stats().retry_attempts, 2);
        let attempts: Vec<u32> = telemetry
            .recent_events(10)
            .into_iter()
            .filter_map(|event| match event {
                TelemetryEvent::RetryAttempt { call, attempt, .. } if call == "describe" => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[test]
    fn test_is_retryable() {
        assert!(RetryManager::is_retryable(&unavailable()));
        assert!(RetryManager::is_retryable(&TriageError::ServiceStatus {
            service: "advisor".to_string(),
            status: 429,
            body: String::new(),
        }));
        assert!(!RetryManager::is_retryable(&TriageError::Advisor("empty".to_string())));
        assert!(!RetryManager::is_retryable(&TriageError::ConfigError("x".to_string())));
    }

    #[test]
    fn test_disabled_manager() {
        assert_eq!(RetryManager::disabled().max_retries(), 0);
    }
}
