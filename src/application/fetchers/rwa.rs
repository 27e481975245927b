//! rwa.xyz tokenized-asset metrics.

use super::{sources, Endpoint, MetricsService};
use crate::application::market_share::{aggregate_market_share, NetworkSeries};
use crate::application::series::{get_series_with_current, latest_date, merge_series, parse_date};
use crate::domain::upstream_models::{FilterOperator, RwaFilter, RwaQuery, RwaTimeseriesResponse};
use crate::domain::{
    AssetMarketShareData, CachePolicy, DataPoint, DataSeriesWithCurrent, MetricsError, OnFailure, Revalidate,
    TimestampedMetric, UpstreamRequest,
};
use crate::infrastructure::FetchMode;
use chrono::{Duration, Utc};
use reqwest::Url;

/// Measure summed per network: market cap of tokens issued on each chain.
const MEASURE_SLUG: &str = "bridged_token_market_cap_dollar";

/// Lookback for market-share snapshots; only the latest point per network is used.
const MARKET_SHARE_LOOKBACK_DAYS: i64 = 14;

/// First day of the historical charts.
const SERIES_START: &str = "2023-01-01";

/// Asset classes exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Stablecoins,
    /// Every tokenized real-world asset except stablecoins
    Assets,
}

impl AssetClass {
    /// Parse a path segment (`stablecoins` or `assets`).
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "stablecoins" => Some(AssetClass::Stablecoins),
            "assets" => Some(AssetClass::Assets),
            _ => None,
        }
    }

    pub fn as_path(self) -> &'static str {
        match self {
            AssetClass::Stablecoins => "stablecoins",
            AssetClass::Assets => "assets",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            AssetClass::Stablecoins => "STABLECOINS",
            AssetClass::Assets => "ASSETS",
        }
    }

    fn class_filter(self) -> RwaFilter {
        let operator = match self {
            AssetClass::Stablecoins => FilterOperator::Equals,
            AssetClass::Assets => FilterOperator::NotEquals,
        };
        RwaFilter::new("asset_class_name", operator, "Stablecoins")
    }

    fn market_share_endpoint(self) -> Endpoint {
        match self {
            AssetClass::Stablecoins => Endpoint::RwaStablecoinsMarketShare,
            AssetClass::Assets => Endpoint::RwaAssetsMarketShare,
        }
    }

    fn series_endpoint(self) -> Endpoint {
        match self {
            AssetClass::Stablecoins => Endpoint::RwaStablecoinsSeries,
            AssetClass::Assets => Endpoint::RwaAssetsSeries,
        }
    }
}

impl MetricsService {
    /// Network breakdown of an asset class's current on-chain value.
    pub async fn asset_market_share(
        &self,
        class: AssetClass,
    ) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        let result = self.fetch_asset_market_share(class).await;
        self.resolve(class.market_share_endpoint(), sources::rwa(), result)
    }

    /// [`Self::asset_market_share`] that never degrades.
    ///
    /// Backs the edge-cached internal endpoint, where a zero breakdown would
    /// be served as if it were real.
    pub async fn asset_market_share_strict(
        &self,
        class: AssetClass,
    ) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        let result = self.fetch_asset_market_share(class).await;
        self.resolve_with(class.market_share_endpoint(), OnFailure::Propagate, sources::rwa(), result)
    }

    pub async fn stablecoin_market_share(&self) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        self.asset_market_share(AssetClass::Stablecoins).await
    }

    pub async fn rwa_market_share(&self) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        self.asset_market_share(AssetClass::Assets).await
    }

    /// Daily total value of an asset class across all counted networks.
    pub async fn asset_value_series(
        &self,
        class: AssetClass,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let result = self.fetch_asset_value_series(class, skip_filtering).await;
        self.resolve(class.series_endpoint(), sources::rwa(), result)
    }

    async fn fetch_asset_market_share(
        &self,
        class: AssetClass,
    ) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        let since = (Utc::now() - Duration::days(MARKET_SHARE_LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let groups = self
            .rwa_network_timeseries(class, &since, Revalidate::Hour, "market_share")
            .await?;
        if groups.iter().all(|g| g.points.is_empty()) {
            return Err(MetricsError::EmptySeries);
        }

        let updated = groups.iter().flat_map(|g| g.points.iter()).map(|p| p.date).max();
        let data = aggregate_market_share(&groups, &self.taxonomy);
        Ok(TimestampedMetric::new(data, updated, sources::rwa()))
    }

    async fn fetch_asset_value_series(
        &self,
        class: AssetClass,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let groups = self
            .rwa_network_timeseries(class, SERIES_START, Revalidate::Day, "series")
            .await?;

        let merged = merge_series(
            groups
                .into_iter()
                .filter(|g| !self.taxonomy.is_excluded(g.network_id))
                .map(|g| g.points),
        );
        let data = get_series_with_current(&merged, skip_filtering)?;
        Ok(TimestampedMetric::new(data, latest_date(&merged), sources::rwa()))
    }

    /// Daily per-network sums of [`MEASURE_SLUG`] for `class` since `since`.
    async fn rwa_network_timeseries(
        &self,
        class: AssetClass,
        since: &str,
        revalidate: Revalidate,
        purpose: &str,
    ) -> Result<Vec<NetworkSeries>, MetricsError> {
        let api_key = self
            .secrets
            .rwa_api_key
            .as_deref()
            .ok_or_else(|| MetricsError::configuration("RWA_API_KEY"))?;

        let query = RwaQuery::grouped_by_network(vec![
            RwaFilter::new("measure_slug", FilterOperator::Equals, MEASURE_SLUG),
            class.class_filter(),
            RwaFilter::new("date", FilterOperator::OnOrAfter, since),
        ]);
        let endpoint = format!("{}/assets/aggregates/timeseries", self.urls.rwa);
        let query_json = serde_json::to_string(&query).map_err(|e| MetricsError::data_shape(&endpoint, e.to_string()))?;
        let url = Url::parse_with_params(&endpoint, &[("query", query_json)])
            .map_err(|_| MetricsError::configuration("upstream.rwa"))?;

        let request = UpstreamRequest::get(url.as_str()).bearer(api_key);
        let policy = CachePolicy::new(
            revalidate,
            &format!("rwa:v3:assets:aggregates:timeseries:{}:{}", class.tag(), purpose),
        );

        let response: RwaTimeseriesResponse = self.fetch_json(request, &policy, FetchMode::Retrying).await?;
        Ok(to_network_series(response))
    }
}

/// Turn grouped results into per-network series, skipping null or unparsable points.
fn to_network_series(response: RwaTimeseriesResponse) -> Vec<NetworkSeries> {
    response
        .results
        .into_iter()
        .map(|result| NetworkSeries {
            network_id: result.group.id,
            name: result.group.name,
            points: result
                .points
                .into_iter()
                .filter_map(|point| Some(DataPoint::new(parse_date(&point.0)?, point.1?)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{MockHttpTransport, UpstreamResponse};
    use std::sync::Arc;

    const TIMESERIES: &str = r#"{
        "results": [
            {"group": {"id": 1, "name": "Ethereum"}, "points": [["2024-01-01", 90.0], ["2024-01-15", 100.0]]},
            {"group": {"id": 2, "name": "Arbitrum One"}, "points": [["2024-01-15", 50.0]]},
            {"group": {"id": 900, "name": "Solana"}, "points": [["2024-01-15", 5.0]]},
            {"group": {"id": 901, "name": "Tron"}, "points": [["2024-01-15", 3.0], ["2024-01-16", null]]},
            {"group": {"id": 22, "name": "Provenance"}, "points": [["2024-01-15", 1000.0]]}
        ]
    }"#;

    #[tokio::test]
    async fn test_stablecoin_market_share_from_grouped_timeseries() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 200, TIMESERIES));
        let svc = service(transport);

        let metric = svc.stablecoin_market_share().await.unwrap();
        let data = metric.data;
        assert_eq!(data.asset_value.mainnet, 100.0);
        assert_eq!(data.asset_value.layer2, 50.0);
        assert_eq!(data.asset_value.alt_network_2nd, 5.0);
        assert_eq!(data.asset_value.alt_network_3rd, 3.0);
        assert_eq!(data.asset_value_sum_all, 158.0);
        assert_eq!(metric.last_updated, parse_date("2024-01-15").unwrap().timestamp_millis());
        assert_eq!(metric.source_info.source, "rwa.xyz");
    }

    #[tokio::test]
    async fn test_series_merges_networks_and_drops_excluded() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 200, TIMESERIES));
        let svc = service(transport);

        let metric = svc.asset_value_series(AssetClass::Assets, true).await.unwrap();
        assert_eq!(metric.data.series.len(), 2);
        assert_eq!(metric.data.series[0].value, 90.0);
        assert_eq!(metric.data.current_value, 158.0);
    }

    #[tokio::test]
    async fn test_request_carries_query_document_and_bearer_token() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                let url = Url::parse(&req.url).unwrap();
                let query = url
                    .query_pairs()
                    .find(|(k, _)| k == "query")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                let doc: serde_json::Value = serde_json::from_str(&query).unwrap_or_default();
                doc["aggregate"]["groupBy"] == "network"
                    && doc["filter"]["filters"][1]["value"] == "Stablecoins"
                    && req.headers.iter().any(|(k, v)| k == "Authorization" && v == "Bearer test-key")
            })
            .times(1)
            .returning(|_| Ok(UpstreamResponse::new(200, TIMESERIES)));

        let svc = service(Arc::new(transport));
        svc.stablecoin_market_share().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_zero_breakdown() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 500, ""));
        let svc = service(transport.clone());

        let metric = svc.rwa_market_share().await.unwrap();
        assert_eq!(metric.data, AssetMarketShareData::default());
        // first attempt plus one retry
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_strict_market_share_returns_upstream_error() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 500, ""));
        let svc = service(transport);

        let err = svc.asset_market_share_strict(AssetClass::Stablecoins).await.unwrap_err();
        assert_eq!(err.name(), "UpstreamHTTPError");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_propagated_without_network_call() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 200, TIMESERIES));
        let mut secrets = secrets();
        secrets.rwa_api_key = None;
        let svc = service_with(transport.clone(), &AppConfig::default(), secrets);

        let err = svc.stablecoin_market_share().await.unwrap_err();
        assert_eq!(err, MetricsError::configuration("RWA_API_KEY"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_results_degrade() {
        let transport = Arc::new(RoutedTransport::new().route("/assets/aggregates/timeseries", 200, r#"{"results":[]}"#));
        let svc = service(transport);

        let series = svc.asset_value_series(AssetClass::Stablecoins, false).await.unwrap();
        assert_eq!(series.data, DataSeriesWithCurrent::default());
    }

    #[test]
    fn test_asset_class_from_path() {
        assert_eq!(AssetClass::from_path("stablecoins"), Some(AssetClass::Stablecoins));
        assert_eq!(AssetClass::from_path("Assets"), Some(AssetClass::Assets));
        assert_eq!(AssetClass::from_path("bonds"), None);
    }
}
