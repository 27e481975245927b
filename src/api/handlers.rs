//! System, cache-management and internal endpoints, plus the error mapping
//! shared by every handler.

use crate::api::state::AppState;
use crate::application::{AssetClass, CacheStats};
use crate::domain::{AssetMarketShareData, MetricsError, TimestampedMetric};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::{IntoParams, ToSchema};

#[allow(unused_imports)]
use serde_json::json; // json! bodies in utoipa::path attributes

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared-edge caching for the internal market-share endpoint.
const INTERNAL_CACHE_CONTROL: &str = "s-maxage=3600, stale-while-revalidate";

// ============================================================================
// Errors
// ============================================================================

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, error: &str, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
}

/// HTTP status for a fetch failure.
pub fn status_for(err: &MetricsError) -> StatusCode {
    match err {
        MetricsError::Configuration { .. } => StatusCode::SERVICE_UNAVAILABLE,
        MetricsError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        MetricsError::UpstreamHttp { .. }
        | MetricsError::Network { .. }
        | MetricsError::DataShape { .. }
        | MetricsError::EmptySeries => StatusCode::BAD_GATEWAY,
    }
}

impl From<MetricsError> for ErrorResponse {
    fn from(err: MetricsError) -> Self {
        ErrorResponse {
            error: err.name().to_string(),
            details: Some(err.to_string()),
        }
    }
}

pub fn metric_error(err: MetricsError) -> ApiError {
    (status_for(&err), Json(err.into()))
}

/// Constant-time for equal lengths; the length itself is not hidden.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a `secret` query parameter against `INTERNAL_API_SECRET`.
fn check_secret(state: &AppState, provided: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = state.metrics_service.secrets().internal_api_secret.as_deref() else {
        return Err(metric_error(MetricsError::configuration("INTERNAL_API_SECRET")));
    };
    if !provided.is_some_and(|p| secrets_match(p, expected)) {
        warn!("Rejected request with invalid secret");
        return Err(error_response(StatusCode::UNAUTHORIZED, "Unauthorized", None));
    }
    Ok(())
}

// ============================================================================
// System
// ============================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dependencies: HealthDependencies,
}

#[derive(Serialize, ToSchema)]
pub struct HealthDependencies {
    /// Cache backend in use (`redis` or `memory`)
    pub cache_backend: String,
    pub cache: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health check passed", body = HealthResponse),
        (status = 503, description = "Service degraded or unavailable", body = HealthResponse)
    )
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let healthy = state.metrics_service.cache().store().is_healthy().await;

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: VERSION.to_string(),
        dependencies: HealthDependencies {
            cache_backend: state.cache_backend.to_string(),
            cache: if healthy { "healthy" } else { "unavailable" }.to_string(),
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "system",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain")
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.prometheus.render()
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct RevalidateQuery {
    /// Cache tag to invalidate; any prefix of a tag works (e.g. `rwa`, `l2beat:scaling`)
    #[param(example = "rwa")]
    pub tag: String,
    /// Shared secret (`INTERNAL_API_SECRET`)
    pub secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub tag: String,
}

/// Invalidate every cached upstream response registered under a tag.
#[utoipa::path(
    post,
    path = "/v1/cache/revalidate",
    params(RevalidateQuery),
    tag = "Cache",
    responses(
        (status = 200, description = "Tag invalidated", body = RevalidateResponse,
            example = json!({"revalidated": true, "tag": "rwa"})),
        (status = 400, description = "Empty tag", body = ErrorResponse),
        (status = 401, description = "Missing or wrong secret", body = ErrorResponse),
        (status = 500, description = "Cache backend failure", body = ErrorResponse),
        (status = 503, description = "INTERNAL_API_SECRET not configured", body = ErrorResponse)
    )
)]
#[instrument(skip(state, query))]
pub async fn revalidate_handler(
    State(state): State<AppState>,
    Query(query): Query<RevalidateQuery>,
) -> Result<Json<RevalidateResponse>, ApiError> {
    check_secret(&state, query.secret.as_deref())?;

    let tag = query.tag.trim();
    if tag.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Validation failed", Some("tag must not be empty".to_string())));
    }

    state
        .metrics_service
        .cache()
        .invalidate_tag(tag)
        .await
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to invalidate cache tag",
                Some(e.to_string()),
            )
        })?;

    Ok(Json(RevalidateResponse {
        revalidated: true,
        tag: tag.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/cache/stats",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStats)
    )
)]
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.metrics_service.cache().stats())
}

// ============================================================================
// Internal
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct SecretQuery {
    /// Shared secret (`INTERNAL_API_SECRET`)
    pub secret: Option<String>,
}

/// Network breakdown of an asset class for server-side consumers.
#[utoipa::path(
    get,
    path = "/api/internal/rwa/{assetClass}",
    params(
        ("assetClass" = String, Path, description = "`stablecoins` or `assets`", example = "stablecoins"),
        SecretQuery
    ),
    tag = "Internal",
    responses(
        (status = 200, description = "Timestamped market share", body = serde_json::Value),
        (status = 401, description = "Missing or wrong secret", body = ErrorResponse),
        (status = 404, description = "Unknown asset class", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse),
        (status = 504, description = "Upstream timeout", body = ErrorResponse),
        (status = 503, description = "Missing configuration", body = ErrorResponse)
    )
)]
#[instrument(skip(state, query))]
pub async fn internal_rwa_handler(
    State(state): State<AppState>,
    Path(asset_class): Path<String>,
    Query(query): Query<SecretQuery>,
) -> Result<Response, ApiError> {
    check_secret(&state, query.secret.as_deref())?;

    let class = AssetClass::from_path(&asset_class).ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, "Unknown asset class", Some(asset_class.clone()))
    })?;

    // Failures surface as 5xx and are never edge-cached.
    let metric: TimestampedMetric<AssetMarketShareData> = state
        .metrics_service
        .asset_market_share_strict(class)
        .await
        .map_err(metric_error)?;

    let mut response = Json(metric).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(INTERNAL_CACHE_CONTROL));
    Ok(response)
}
