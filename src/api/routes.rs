use crate::api::doc::ApiDoc;
use crate::api::handlers::{
    cache_stats_handler, health_handler, internal_rwa_handler, metrics_handler, revalidate_handler,
};
use crate::api::metric_handlers::{
    dashboard_handler, defi_tvl_market_share_handler, dex_volume_handler, eth_market_handler,
    ethereum_stablecoins_handler, ethereum_tvl_handler, ethereum_tvl_series_handler, fees_handler,
    internal_stablecoins_handler, l2_activity_handler, l2_summary_handler, l2_tvs_series_handler,
    rwa_market_share_handler, rwa_series_handler, staking_apr_handler, staking_handler,
    total_value_secured_handler,
};
use crate::api::state::AppState;
use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};

use axum::http::HeaderValue;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Longest a request may take end to end; the dashboard fan-out with retries
/// stays well below this.
const REQUEST_TIMEOUT_SECS: u64 = 60;

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::permissive();
    }

    // Parse comma-separated origins, filter out invalid ones
    let origin_values: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    match origin_values.len() {
        0 => {
            tracing::warn!("No valid CORS origins found, falling back to permissive CORS");
            CorsLayer::permissive()
        }
        1 => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin_values[0].clone()))
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::list(origin_values))
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

/// Count and time requests per matched route, so path parameters do not
/// blow up label cardinality.
async fn record_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    let latency = started.elapsed();
    let status = response.status().as_u16();
    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.to_string(),
        "status_class" => format!("{}xx", status / 100)
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(latency.as_secs_f64());

    if latency.as_millis() > 1000 {
        tracing::warn!("Slow HTTP request: {}ms", latency.as_millis());
    }
    response
}

pub fn create_router(state: AppState, allowed_origins: &str) -> Router {
    // Create middleware stack with security headers and observability
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors_layer(allowed_origins));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // System endpoints (no versioning)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // rwa.xyz
        .route("/v1/metrics/rwa/{assetClass}/market-share", get(rwa_market_share_handler))
        .route("/v1/metrics/rwa/{assetClass}/series", get(rwa_series_handler))
        .route("/v1/metrics/internal/rwa/stablecoins", get(internal_stablecoins_handler))
        // L2BEAT
        .route("/v1/metrics/l2/summary", get(l2_summary_handler))
        .route("/v1/metrics/l2/tvs-series", get(l2_tvs_series_handler))
        .route("/v1/metrics/l2/activity", get(l2_activity_handler))
        // DefiLlama
        .route("/v1/metrics/defi/ethereum-tvl", get(ethereum_tvl_handler))
        .route("/v1/metrics/defi/tvl-market-share", get(defi_tvl_market_share_handler))
        .route("/v1/metrics/defi/ethereum-tvl-series", get(ethereum_tvl_series_handler))
        .route("/v1/metrics/defi/ethereum-stablecoins", get(ethereum_stablecoins_handler))
        .route("/v1/metrics/defi/dex-volume", get(dex_volume_handler))
        .route("/v1/metrics/defi/fees", get(fees_handler))
        // beaconcha.in, CoinGecko, composites
        .route("/v1/metrics/staking", get(staking_handler))
        .route("/v1/metrics/staking/apr", get(staking_apr_handler))
        .route("/v1/metrics/eth-market", get(eth_market_handler))
        .route("/v1/metrics/total-value-secured", get(total_value_secured_handler))
        .route("/v1/dashboard", get(dashboard_handler))
        // Cache management
        .route("/v1/cache/revalidate", post(revalidate_handler))
        .route("/v1/cache/stats", get(cache_stats_handler))
        // Secret-guarded internal endpoints
        .route("/api/internal/rwa/{assetClass}", get(internal_rwa_handler))
        .route_layer(middleware::from_fn(record_http_metrics))
        .layer(middleware)
        .with_state(state)
}
