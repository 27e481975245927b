//! Bounded-timeout, exponential-backoff fetch.
//!
//! Only server errors (>= 500), timeouts and connection failures are retried.
//! Anything below 500 is handed back as-is and the caller inspects the status.

use crate::domain::{HttpTransport, MetricsError, UpstreamRequest, UpstreamResponse};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Extra attempts after the first one
    pub retries: u32,
    /// Base delay; attempt `n` (0-based) waits `retry_delay * 2^n` before the next try
    pub retry_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            retries: 2,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl RetryOptions {
    /// Delays slept between attempts, in order.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let base = self.retry_delay;
        (0..self.retries).map(move |attempt| base.saturating_mul(2u32.saturating_pow(attempt)))
    }
}

/// Send `request`, retrying on 5xx/timeout/network failure.
///
/// Makes at most `retries + 1` attempts and returns the last error once they
/// are exhausted. Each attempt is raced against `timeout`; a losing request
/// future is dropped, which cancels it.
pub async fn fetch_with_retry(
    transport: &dyn HttpTransport,
    request: &UpstreamRequest,
    options: &RetryOptions,
) -> Result<UpstreamResponse, MetricsError> {
    let attempts = AtomicU32::new(0);
    let total = options.retries + 1;
    let url = request.url.as_str();
    let attempts = &attempts;

    RetryIf::spawn(
        options.backoff(),
        move || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let result = single_attempt(transport, request, options.timeout).await;

            if let Err(e) = &result {
                metrics::counter!("upstream_attempt_failures_total", "error" => e.name()).increment(1);
                warn!(
                    url = url,
                    attempt = attempt,
                    total = total,
                    error = %e,
                    "Upstream attempt failed"
                );
                if attempt < total && e.is_retryable() {
                    metrics::counter!("upstream_retries_total").increment(1);
                }
            }
            result
        },
        |e: &MetricsError| e.is_retryable(),
    )
    .await
}

async fn single_attempt(
    transport: &dyn HttpTransport,
    request: &UpstreamRequest,
    timeout: Duration,
) -> Result<UpstreamResponse, MetricsError> {
    let response = match tokio::time::timeout(timeout, transport.send(request)).await {
        Err(_) => {
            return Err(MetricsError::UpstreamTimeout {
                url: request.url.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
        Ok(Err(e)) => {
            return Err(MetricsError::Network {
                url: request.url.clone(),
                message: e.to_string(),
            })
        }
        Ok(Ok(response)) => response,
    };

    if response.status >= 500 {
        return Err(MetricsError::UpstreamHttp {
            url: request.url.clone(),
            status: response.status,
            status_text: response.status_text,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockHttpTransport, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Instant;

    fn fast_options(retries: u32) -> RetryOptions {
        RetryOptions {
            timeout: Duration::from_millis(200),
            retries,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let options = RetryOptions {
            retries: 3,
            ..RetryOptions::default()
        };
        let delays: Vec<u128> = options.backoff().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000]);
    }

    #[test]
    fn test_defaults() {
        let options = RetryOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.retries, 2);
        assert_eq!(options.backoff().count(), 2);
    }

    #[tokio::test]
    async fn test_retries_503_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(3).returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Ok(UpstreamResponse::new(503, "busy"))
            } else {
                Ok(UpstreamResponse::new(200, "{\"ok\":true}"))
            }
        });

        let request = UpstreamRequest::get("https://upstream.test/data");
        let response = fetch_with_retry(&transport, &request, &fast_options(2)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_returned_without_retry() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(UpstreamResponse::new(404, "not found")));

        let options = RetryOptions {
            timeout: Duration::from_secs(1),
            retries: 2,
            retry_delay: Duration::from_millis(1_000),
        };
        let started = Instant::now();
        let response = fetch_with_retry(&transport, &UpstreamRequest::get("https://upstream.test/missing"), &options)
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_exhausted_server_errors_return_last_error() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(3)
            .returning(|_| Ok(UpstreamResponse::new(502, "bad gateway")));

        let err = fetch_with_retry(&transport, &UpstreamRequest::get("https://upstream.test/x"), &fast_options(2))
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::UpstreamHttp { status: 502, .. }));
        assert_eq!(err.url(), Some("https://upstream.test/x"));
    }

    #[tokio::test]
    async fn test_network_errors_are_retried() {
        let mut transport = MockHttpTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(TransportError("connection reset".into())));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(UpstreamResponse::new(200, "[]")));

        let response = fetch_with_retry(&transport, &UpstreamRequest::get("https://upstream.test/y"), &fast_options(1))
            .await
            .unwrap();
        assert_eq!(response.body, "[]");
    }

    /// Transport that never answers within any sensible timeout.
    struct HangingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn send(&self, _request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(UpstreamResponse::new(200, ""))
        }
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_all_attempts() {
        let transport = HangingTransport {
            calls: AtomicUsize::new(0),
        };
        let options = RetryOptions {
            timeout: Duration::from_millis(20),
            retries: 1,
            retry_delay: Duration::from_millis(1),
        };
        let err = fetch_with_retry(&transport, &UpstreamRequest::get("https://slow.test"), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::UpstreamTimeout { timeout_ms: 20, .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
