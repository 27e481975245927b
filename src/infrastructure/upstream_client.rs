//! HTTP client for the upstream metric providers.
//!
//! Wraps a [`HttpTransport`] with the retry policy, turns non-2xx answers into
//! descriptive errors and parses bodies into provider schemas. Caching is not
//! done here; see `application::cache_service`.

use crate::domain::{HttpTransport, MetricsError, UpstreamRequest};
use crate::infrastructure::retry_fetch::{fetch_with_retry, RetryOptions};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// How a request reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Through the timeout/backoff wrapper; for external, flaky providers.
    Retrying,
    /// One plain attempt; for this service's own internal endpoints.
    Direct,
}

#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn HttpTransport>,
    retry: RetryOptions,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn HttpTransport>, retry: RetryOptions) -> Self {
        Self { transport, retry }
    }

    pub fn retry_options(&self) -> &RetryOptions {
        &self.retry
    }

    /// Fetch a body as text, failing on any non-2xx status.
    pub async fn get_text(&self, request: &UpstreamRequest, mode: FetchMode) -> Result<String, MetricsError> {
        debug!("Fetching upstream: {}", request.url);

        let response = match mode {
            FetchMode::Retrying => fetch_with_retry(self.transport.as_ref(), request, &self.retry).await,
            FetchMode::Direct => self.transport.send(request).await.map_err(|e| MetricsError::Network {
                url: request.url.clone(),
                message: e.to_string(),
            }),
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("upstream_requests_total", "outcome" => "error").increment(1);
                return Err(e);
            }
        };

        if !response.ok() {
            metrics::counter!("upstream_requests_total", "outcome" => "http_error").increment(1);
            return Err(MetricsError::UpstreamHttp {
                url: request.url.clone(),
                status: response.status,
                status_text: response.status_text,
            });
        }

        metrics::counter!("upstream_requests_total", "outcome" => "ok").increment(1);
        info!("Fetched {} ({} bytes)", request.url, response.body.len());
        Ok(response.body)
    }
}

/// Parse a cached or fresh body into a provider schema.
pub fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, MetricsError> {
    serde_json::from_str(body).map_err(|e| MetricsError::data_shape(url, e.to_string()))
}
