//! Smoke tests against a running server.
//!
//! Ignored by default. Start the gateway, then run
//! `cargo test --test integration -- --ignored` with TEST_BASE_URL set
//! (defaults to http://localhost:3010).

use serde_json::Value;

fn base_url() -> String {
    std::env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3010".into())
}

async fn fetch(path: &str) -> Result<reqwest::Response, reqwest::Error> {
    reqwest::get(format!("{}{}", base_url(), path)).await
}

#[tokio::test]
#[ignore]
async fn test_live_health() {
    let response = tokio_test::assert_ok!(fetch("/health").await);
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore]
async fn test_live_metrics_exposes_cache_counters() {
    fetch("/v1/metrics/eth-market").await.unwrap();
    let body = fetch("/metrics").await.unwrap().text().await.unwrap();
    assert!(body.contains("cache_operations_total") || body.contains("# TYPE"));
}

#[tokio::test]
#[ignore]
async fn test_live_dashboard_shape() {
    let response = fetch("/v1/dashboard").await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    for field in ["stablecoinMarketShare", "totalValueSecured", "ethMarket", "errors"] {
        assert!(body.get(field).is_some(), "missing {}", field);
    }
}
