//! Shared fixtures: an in-process router wired to canned upstream responses.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use institutional_metrics_gateway::api::routes::create_router;
use institutional_metrics_gateway::api::state::AppState;
use institutional_metrics_gateway::application::{CacheService, MetricsService};
use institutional_metrics_gateway::config::{AppConfig, Secrets};
use institutional_metrics_gateway::domain::{HttpTransport, TransportError, UpstreamRequest, UpstreamResponse};
use institutional_metrics_gateway::infrastructure::{MemoryCache, RetryOptions, UpstreamClient};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

pub const RWA_TIMESERIES: &str = r#"{"results": [
    {"group": {"id": 1, "name": "Ethereum"}, "points": [["2024-01-01", 50.0], ["2024-01-10", 55.0], ["2024-01-15", 60.0], ["2024-01-20", 80.0]]},
    {"group": {"id": 16, "name": "Base"}, "points": [["2024-01-01", 10.0], ["2024-01-15", 10.0], ["2024-01-20", 20.0]]}
]}"#;

/// Answers by URL substring; unmatched URLs get a 404. Counts every call.
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<(String, u16, String)>,
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, status: u16, body: &str) -> Self {
        self.routes.push((pattern.to_string(), status, body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .routes
            .iter()
            .find(|(pattern, _, _)| request.url.contains(pattern.as_str()))
            .map(|(_, status, body)| UpstreamResponse::new(*status, body.clone()))
            .unwrap_or_else(|| UpstreamResponse::new(404, "")))
    }
}

pub fn secrets() -> Secrets {
    Secrets {
        rwa_api_key: Some("integration-key".to_string()),
        internal_api_secret: Some(SECRET.to_string()),
        internal_base_url: "http://gateway.internal".to_string(),
    }
}

pub fn app_with(transport: Arc<StubTransport>, secrets: Secrets) -> Router {
    let retry = RetryOptions {
        timeout: Duration::from_millis(200),
        retries: 1,
        retry_delay: Duration::from_millis(1),
    };
    let cache = Arc::new(CacheService::new(Arc::new(MemoryCache::new())));
    let client = UpstreamClient::new(transport, retry);
    let metrics_service = Arc::new(MetricsService::new(cache, client, &AppConfig::default(), secrets));

    let state = AppState {
        metrics_service,
        prometheus: PrometheusBuilder::new().build_recorder().handle(),
        cache_backend: "memory",
    };
    create_router(state, "*")
}

pub fn app(transport: Arc<StubTransport>) -> Router {
    app_with(transport, secrets())
}

pub async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, "GET", uri).await;
    (status, body)
}
