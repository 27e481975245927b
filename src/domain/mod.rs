//! Domain layer - metric entities, provider schemas and the seams to the outside world.
//!
//! This module contains:
//! - Metric value types handed to consumers (`metric_models`)
//! - Upstream provider request/response schemas (`upstream_models`)
//! - Cache and failure policies (`policy`)
//! - The error taxonomy (`error`)
//! - Traits for the HTTP transport and the cache store, so the core can be
//!   exercised without a network or a cache backend

pub mod error;
pub mod metric_models;
pub mod policy;
pub mod upstream_models;

pub use error::MetricsError;
pub use metric_models::*;
pub use policy::{CachePolicy, OnFailure, Revalidate};

use async_trait::async_trait;

/// Outbound GET request to an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }
}

/// Status and body of an upstream response. The body is kept as text so it
/// can be cached verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            body: body.into(),
        }
    }

    /// 2xx
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection-level failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-attempt HTTP transport.
///
/// Retries, timeouts and status handling live above this trait; an
/// implementation only has to send one request and report what came back.
///
/// # Implementations
///
/// See `infrastructure::http_transport::ReqwestTransport`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Repository trait for the shared cache store.
///
/// Entries are raw upstream bodies addressed by key; each entry also carries
/// the cache tags it was stored under so that groups of entries can be
/// invalidated together.
///
/// # Implementations
///
/// - `infrastructure::redis::RedisRepository` (shared, survives restarts)
/// - `infrastructure::memory_cache::MemoryCache` (in-process)
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Retrieve a cached value by key.
    ///
    /// Returns `Ok(None)` on a miss or an expired entry; errors only when the
    /// backend itself cannot be reached.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store a value with a TTL, registering it under every tag in `tags`.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64, tags: &[String]) -> anyhow::Result<()>;

    /// Drop every entry registered under `tag`.
    async fn invalidate_tag(&self, tag: &str) -> anyhow::Result<()>;

    /// Cheap connectivity probe for deep health checks.
    async fn is_healthy(&self) -> bool {
        self.get("_health_check").await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_headers() {
        let req = UpstreamRequest::get("https://api.rwa.xyz/v3/x").bearer("k");
        assert_eq!(req.headers[0], ("Accept".to_string(), "application/json".to_string()));
        assert_eq!(req.headers[1], ("Authorization".to_string(), "Bearer k".to_string()));
    }

    #[test]
    fn test_response_ok_range() {
        assert!(UpstreamResponse::new(200, "").ok());
        assert!(UpstreamResponse::new(204, "").ok());
        assert!(!UpstreamResponse::new(304, "").ok());
        assert!(!UpstreamResponse::new(404, "").ok());
    }
}
