//! In-process tests for the REST API, driven through the router with canned
//! upstream responses.

use crate::common::*;
use axum::http::StatusCode;
use std::sync::Arc;

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(Arc::new(StubTransport::new()));
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dependencies"]["cache_backend"], "memory");
    assert!(body.get("version").is_some());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app(Arc::new(StubTransport::new()));
    let (status, body) = get(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/v1/dashboard").is_some());
}

#[tokio::test]
async fn test_stablecoin_market_share_envelope() {
    let app = app(Arc::new(
        StubTransport::new().route("/assets/aggregates/timeseries", 200, RWA_TIMESERIES),
    ));
    let (status, body) = get(&app, "/v1/metrics/rwa/stablecoins/market-share").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assetValueSumAll"], 100.0);
    assert_eq!(body["data"]["marketShare"]["mainnet"], 0.8);
    assert_eq!(body["data"]["marketShare"]["layer2"], 0.2);
    assert_eq!(body["sourceInfo"]["source"], "rwa.xyz");
    assert!(body["lastUpdated"].as_i64().is_some());
}

#[tokio::test]
async fn test_unknown_asset_class_is_not_found() {
    let app = app(Arc::new(StubTransport::new()));
    let (status, body) = get(&app, "/v1/metrics/rwa/bonds/market-share").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown asset class");
}

#[tokio::test]
async fn test_series_filtering_toggle() {
    let app = app(Arc::new(
        StubTransport::new().route("/assets/aggregates/timeseries", 200, RWA_TIMESERIES),
    ));

    let (_, filtered) = get(&app, "/v1/metrics/rwa/assets/series").await;
    let (_, full) = get(&app, "/v1/metrics/rwa/assets/series?skipFiltering=true").await;

    assert_eq!(filtered["data"]["series"].as_array().unwrap().len(), 3);
    assert_eq!(full["data"]["series"].as_array().unwrap().len(), 4);
    assert_eq!(filtered["data"]["currentValue"], 100.0);
    assert_eq!(full["data"]["currentValue"], 100.0);
}

#[tokio::test]
async fn test_missing_api_key_is_service_unavailable() {
    let mut secrets = secrets();
    secrets.rwa_api_key = None;
    let app = app_with(Arc::new(StubTransport::new()), secrets);

    let (status, body) = get(&app, "/v1/metrics/rwa/stablecoins/market-share").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ConfigurationError");
}

#[tokio::test]
async fn test_degrading_endpoint_answers_zero_on_upstream_failure() {
    let app = app(Arc::new(StubTransport::new().route("/simple/price", 503, "")));
    let (status, body) = get(&app, "/v1/metrics/eth-market").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priceUsd"], 0.0);
    assert_eq!(body["sourceInfo"]["source"], "CoinGecko");
}

#[tokio::test]
async fn test_propagating_endpoint_maps_to_bad_gateway() {
    let app = app(Arc::new(StubTransport::new().route("/epoch/latest", 500, "")));
    let (status, body) = get(&app, "/v1/metrics/staking").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UpstreamHTTPError");
}

#[tokio::test]
async fn test_internal_endpoint_rejects_bad_secret() {
    let app = app(Arc::new(
        StubTransport::new().route("/assets/aggregates/timeseries", 200, RWA_TIMESERIES),
    ));

    let (missing, _) = get(&app, "/api/internal/rwa/stablecoins").await;
    let (wrong, _) = get(&app, "/api/internal/rwa/stablecoins?secret=nope").await;
    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_internal_endpoint_sets_cache_control() {
    let app = app(Arc::new(
        StubTransport::new().route("/assets/aggregates/timeseries", 200, RWA_TIMESERIES),
    ));
    let uri = format!("/api/internal/rwa/stablecoins?secret={}", SECRET);
    let (status, headers, body) = send(&app, "GET", &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "s-maxage=3600, stale-while-revalidate"
    );
    assert_eq!(body["data"]["assetValue"]["mainnet"], 80.0);
}

#[tokio::test]
async fn test_internal_endpoint_fails_without_cache_control_on_upstream_error() {
    let app = app(Arc::new(
        StubTransport::new().route("/assets/aggregates/timeseries", 500, ""),
    ));
    let uri = format!("/api/internal/rwa/stablecoins?secret={}", SECRET);
    let (status, headers, body) = send(&app, "GET", &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UpstreamHTTPError");
    assert!(headers.get("cache-control").is_none());
}

#[tokio::test]
async fn test_internal_consumer_surfaces_proxy_failure() {
    // the proxy answers the way the internal route does when rwa.xyz is down
    let app = app(Arc::new(StubTransport::new().route(
        "gateway.internal/api/internal/rwa/stablecoins",
        502,
        r#"{"error": "UpstreamHTTPError"}"#,
    )));
    let (status, body) = get(&app, "/v1/metrics/internal/rwa/stablecoins").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UpstreamHTTPError");
    assert!(!body["details"].as_str().unwrap().contains(SECRET));
}

#[tokio::test]
async fn test_revalidate_requires_secret_and_forces_refetch() {
    let transport = Arc::new(StubTransport::new().route("/v2/chains", 200, r#"[{"name": "Ethereum", "tvl": 5.0}]"#));
    let app = app(transport.clone());

    get(&app, "/v1/metrics/defi/ethereum-tvl").await;
    get(&app, "/v1/metrics/defi/ethereum-tvl").await;
    assert_eq!(transport.calls(), 1);

    let (status, _, _) = send(&app, "POST", "/v1/cache/revalidate?tag=defillama").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/v1/cache/revalidate?tag=defillama&secret={}", SECRET);
    let (status, _, body) = send(&app, "POST", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], true);

    get(&app, "/v1/metrics/defi/ethereum-tvl").await;
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_cache_stats_count_hits() {
    let transport = Arc::new(StubTransport::new().route("/scaling/summary", 200, r#"{"data": {"projects": {}}}"#));
    let app = app(transport);

    get(&app, "/v1/metrics/l2/summary").await;
    get(&app, "/v1/metrics/l2/summary").await;
    let (status, stats) = get(&app, "/v1/cache/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
}

#[tokio::test]
async fn test_dashboard_collects_failures() {
    let mut secrets = secrets();
    secrets.rwa_api_key = None;
    let app = app_with(Arc::new(StubTransport::new()), secrets);

    let (status, body) = get(&app, "/v1/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let errors = body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["endpoint"] == "rwa.stablecoins.market_share"));
    assert!(errors.iter().any(|e| e["endpoint"] == "beaconchain.staking"));
    assert!(body["stablecoinMarketShare"].is_null());
    assert_eq!(body["ethMarket"]["data"]["priceUsd"], 0.0);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = app(Arc::new(StubTransport::new()));
    let (_, headers, _) = send(&app, "GET", "/health").await;

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("x-request-id").is_some());
}
