//! HTTP handlers for the public metric endpoints.
//!
//! Every metric is returned in the `{ data, lastUpdated, sourceInfo }`
//! envelope. Degrading endpoints answer 200 with zero values when their
//! provider is down; propagating ones map the failure onto a 5xx status.

use crate::api::handlers::{error_response, metric_error, ApiError};
use crate::api::state::AppState;
use crate::application::AssetClass;
use crate::domain::{
    AssetMarketShareData, DashboardSnapshot, DataSeriesWithCurrent, DefiTvlMarketShare, EthMarketData, L2Activity,
    L2ScalingSummary, StakingStats, TimestampedMetric, TotalValueSecured, VolumeTotals,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

#[allow(unused_imports)]
use crate::api::handlers::ErrorResponse; // Used in utoipa::path responses

type MetricResult<T> = Result<Json<TimestampedMetric<T>>, ApiError>;

/// Query parameters for series endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    /// Return every point instead of the 1st/15th-of-month chart sample
    #[serde(default)]
    #[param(example = false)]
    pub skip_filtering: bool,
}

fn asset_class(segment: &str) -> Result<AssetClass, ApiError> {
    AssetClass::from_path(segment).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            "Unknown asset class",
            Some(format!("{} (expected stablecoins or assets)", segment)),
        )
    })
}

// ============================================================================
// rwa.xyz
// ============================================================================

/// Network breakdown of tokenized asset value
#[utoipa::path(
    get,
    path = "/v1/metrics/rwa/{assetClass}/market-share",
    params(("assetClass" = String, Path, description = "`stablecoins` or `assets`", example = "stablecoins")),
    tag = "RWA",
    responses(
        (status = 200, description = "AssetMarketShareData envelope", body = serde_json::Value),
        (status = 404, description = "Unknown asset class", body = ErrorResponse),
        (status = 503, description = "RWA_API_KEY not configured", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn rwa_market_share_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> MetricResult<AssetMarketShareData> {
    let class = asset_class(&segment)?;
    state
        .metrics_service
        .asset_market_share(class)
        .await
        .map(Json)
        .map_err(metric_error)
}

/// Daily total value of tokenized assets
#[utoipa::path(
    get,
    path = "/v1/metrics/rwa/{assetClass}/series",
    params(("assetClass" = String, Path, description = "`stablecoins` or `assets`", example = "assets"), SeriesQuery),
    tag = "RWA",
    responses(
        (status = 200, description = "DataSeriesWithCurrent envelope", body = serde_json::Value),
        (status = 404, description = "Unknown asset class", body = ErrorResponse),
        (status = 503, description = "RWA_API_KEY not configured", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn rwa_series_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> MetricResult<DataSeriesWithCurrent> {
    let class = asset_class(&segment)?;
    state
        .metrics_service
        .asset_value_series(class, query.skip_filtering)
        .await
        .map(Json)
        .map_err(metric_error)
}

/// Stablecoin breakdown read back through the internal endpoint
#[utoipa::path(
    get,
    path = "/v1/metrics/internal/rwa/stablecoins",
    tag = "RWA",
    responses(
        (status = 200, description = "AssetMarketShareData envelope", body = serde_json::Value),
        (status = 502, description = "Internal endpoint failed", body = ErrorResponse),
        (status = 503, description = "INTERNAL_API_SECRET not configured", body = ErrorResponse)
    )
)]
pub async fn internal_stablecoins_handler(State(state): State<AppState>) -> MetricResult<AssetMarketShareData> {
    state
        .metrics_service
        .internal_stablecoin_market_share()
        .await
        .map(Json)
        .map_err(metric_error)
}

// ============================================================================
// L2BEAT
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/metrics/l2/summary",
    tag = "L2",
    responses((status = 200, description = "L2ScalingSummary envelope", body = serde_json::Value))
)]
pub async fn l2_summary_handler(State(state): State<AppState>) -> MetricResult<L2ScalingSummary> {
    state.metrics_service.l2_scaling_summary().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/l2/tvs-series",
    params(SeriesQuery),
    tag = "L2",
    responses((status = 200, description = "DataSeriesWithCurrent envelope", body = serde_json::Value))
)]
pub async fn l2_tvs_series_handler(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> MetricResult<DataSeriesWithCurrent> {
    state
        .metrics_service
        .l2_tvs_series(query.skip_filtering)
        .await
        .map(Json)
        .map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/l2/activity",
    tag = "L2",
    responses((status = 200, description = "L2Activity envelope", body = serde_json::Value))
)]
pub async fn l2_activity_handler(State(state): State<AppState>) -> MetricResult<L2Activity> {
    state.metrics_service.l2_activity().await.map(Json).map_err(metric_error)
}

// ============================================================================
// DefiLlama
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/ethereum-tvl",
    tag = "DeFi",
    responses((status = 200, description = "TVL in USD", body = serde_json::Value))
)]
pub async fn ethereum_tvl_handler(State(state): State<AppState>) -> MetricResult<f64> {
    state.metrics_service.ethereum_tvl().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/tvl-market-share",
    tag = "DeFi",
    responses((status = 200, description = "DefiTvlMarketShare envelope", body = serde_json::Value))
)]
pub async fn defi_tvl_market_share_handler(State(state): State<AppState>) -> MetricResult<DefiTvlMarketShare> {
    state.metrics_service.defi_tvl_market_share().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/ethereum-tvl-series",
    params(SeriesQuery),
    tag = "DeFi",
    responses((status = 200, description = "DataSeriesWithCurrent envelope", body = serde_json::Value))
)]
pub async fn ethereum_tvl_series_handler(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> MetricResult<DataSeriesWithCurrent> {
    state
        .metrics_service
        .ethereum_tvl_series(query.skip_filtering)
        .await
        .map(Json)
        .map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/ethereum-stablecoins",
    tag = "DeFi",
    responses((status = 200, description = "USD-pegged supply on Ethereum", body = serde_json::Value))
)]
pub async fn ethereum_stablecoins_handler(State(state): State<AppState>) -> MetricResult<f64> {
    state
        .metrics_service
        .ethereum_stablecoin_supply()
        .await
        .map(Json)
        .map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/dex-volume",
    tag = "DeFi",
    responses((status = 200, description = "VolumeTotals envelope", body = serde_json::Value))
)]
pub async fn dex_volume_handler(State(state): State<AppState>) -> MetricResult<VolumeTotals> {
    state.metrics_service.ethereum_dex_volume().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/defi/fees",
    tag = "DeFi",
    responses((status = 200, description = "VolumeTotals envelope", body = serde_json::Value))
)]
pub async fn fees_handler(State(state): State<AppState>) -> MetricResult<VolumeTotals> {
    state.metrics_service.ethereum_fees().await.map(Json).map_err(metric_error)
}

// ============================================================================
// Staking, market, composites
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/metrics/staking",
    tag = "Staking",
    responses(
        (status = 200, description = "StakingStats envelope", body = serde_json::Value),
        (status = 502, description = "beaconcha.in failed", body = ErrorResponse),
        (status = 504, description = "beaconcha.in timed out", body = ErrorResponse)
    )
)]
pub async fn staking_handler(State(state): State<AppState>) -> MetricResult<StakingStats> {
    state.metrics_service.staking_stats().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/staking/apr",
    tag = "Staking",
    responses((status = 200, description = "APR as a fraction", body = serde_json::Value))
)]
pub async fn staking_apr_handler(State(state): State<AppState>) -> MetricResult<f64> {
    state.metrics_service.staking_apr().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/eth-market",
    tag = "Market",
    responses((status = 200, description = "EthMarketData envelope", body = serde_json::Value))
)]
pub async fn eth_market_handler(State(state): State<AppState>) -> MetricResult<EthMarketData> {
    state.metrics_service.eth_market_data().await.map(Json).map_err(metric_error)
}

#[utoipa::path(
    get,
    path = "/v1/metrics/total-value-secured",
    tag = "Market",
    responses((status = 200, description = "TotalValueSecured envelope", body = serde_json::Value))
)]
pub async fn total_value_secured_handler(State(state): State<AppState>) -> MetricResult<TotalValueSecured> {
    state.metrics_service.total_value_secured().await.map(Json).map_err(metric_error)
}

/// All landing-page metrics in one response
#[utoipa::path(
    get,
    path = "/v1/dashboard",
    tag = "Market",
    responses((status = 200, description = "DashboardSnapshot; failed members are null and listed in errors", body = serde_json::Value))
)]
pub async fn dashboard_handler(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.metrics_service.dashboard().await)
}
