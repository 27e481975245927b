//! Display-ready metric values returned by the fetchers.
//!
//! Everything here is a plain request-scoped value: built once per fetch and
//! never mutated afterwards. Each payload's `Default` is the zero value served
//! when a degraded fetch fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Envelope
// ============================================================================

/// Attribution pair shown next to every metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub source: String,
    pub source_href: String,
}

impl SourceInfo {
    pub fn new(source: &str, source_href: &str) -> Self {
        Self {
            source: source.to_string(),
            source_href: source_href.to_string(),
        }
    }
}

/// `{ data, lastUpdated, sourceInfo }` envelope around every metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampedMetric<T> {
    pub data: T,
    /// Epoch milliseconds
    pub last_updated: i64,
    pub source_info: SourceInfo,
}

impl<T> TimestampedMetric<T> {
    /// Stamp `data`, preferring an upstream-provided time over "now".
    pub fn new(data: T, upstream_time: Option<DateTime<Utc>>, source_info: SourceInfo) -> Self {
        Self {
            data,
            last_updated: upstream_time.unwrap_or_else(Utc::now).timestamp_millis(),
            source_info,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TimestampedMetric<U> {
        TimestampedMetric {
            data: f(self.data),
            last_updated: self.last_updated,
            source_info: self.source_info,
        }
    }
}

// ============================================================================
// Series
// ============================================================================

/// Single dated value. Dates are UTC and serialize as ISO-8601.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DataPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self { date, value }
    }
}

/// Ascending, date-keyed sequence of values.
pub type DataSeries = Vec<DataPoint>;

/// Chart series plus the headline number.
///
/// `current_value` always comes from the last point of the unfiltered input,
/// even when `series` has been down-sampled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSeriesWithCurrent {
    pub series: DataSeries,
    pub current_value: f64,
}

// ============================================================================
// Market share
// ============================================================================

/// Fixed five-bucket partition of value across Ethereum mainnet, its layer 2s
/// and ranked alternative networks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBreakdown {
    pub mainnet: f64,
    pub layer2: f64,
    pub alt_network_2nd: f64,
    pub alt_network_3rd: f64,
    pub alt_networks_rest: f64,
}

impl NetworkBreakdown {
    pub fn total(&self) -> f64 {
        self.mainnet + self.layer2 + self.alt_network_2nd + self.alt_network_3rd + self.alt_networks_rest
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            mainnet: f(self.mainnet),
            layer2: f(self.layer2),
            alt_network_2nd: f(self.alt_network_2nd),
            alt_network_3rd: f(self.alt_network_3rd),
            alt_networks_rest: f(self.alt_networks_rest),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMarketShareData {
    pub asset_value: NetworkBreakdown,
    pub market_share: NetworkBreakdown,
    pub asset_value_sum_all: f64,
}

// ============================================================================
// Provider-specific payloads
// ============================================================================

/// Aggregate figures across all tracked layer 2 projects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct L2ScalingSummary {
    pub total_value_secured: f64,
    pub project_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct L2Activity {
    /// Transactions across all rollups during the most recent day
    pub tx_count_24h: f64,
    /// User operations per second averaged over the most recent day
    pub uops_per_second: f64,
}

/// Ethereum's share of DeFi TVL and its lead over the runner-up chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefiTvlMarketShare {
    pub ethereum_tvl: f64,
    pub total_tvl: f64,
    pub market_share: f64,
    pub runner_up_name: String,
    pub runner_up_tvl: f64,
    /// `ethereum_tvl / runner_up_tvl`, `0.0` when there is no runner-up value
    pub runner_up_multiplier: f64,
}

/// Rolling totals reported by the DefiLlama overview endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTotals {
    pub total_24h: f64,
    pub total_7d: f64,
    pub total_30d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StakingStats {
    pub validator_count: u64,
    pub total_staked_eth: f64,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EthMarketData {
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub change_24h_percent: f64,
}

/// Value secured by Ethereum itself plus its layer 2 ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalValueSecured {
    pub mainnet_defi_tvl: f64,
    pub layer2_tvs: f64,
    pub total: f64,
}

/// Everything the institutional landing page needs, fetched concurrently.
///
/// Propagating members are `None` when their fetch failed; the failure is
/// listed in `errors`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stablecoin_market_share: Option<TimestampedMetric<AssetMarketShareData>>,
    pub rwa_market_share: Option<TimestampedMetric<AssetMarketShareData>>,
    pub defi_tvl_market_share: Option<TimestampedMetric<DefiTvlMarketShare>>,
    pub total_value_secured: Option<TimestampedMetric<TotalValueSecured>>,
    pub l2_activity: Option<TimestampedMetric<L2Activity>>,
    pub staking: Option<TimestampedMetric<StakingStats>>,
    pub eth_market: Option<TimestampedMetric<EthMarketData>>,
    pub errors: Vec<DashboardError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardError {
    pub endpoint: String,
    pub name: String,
    pub message: String,
}
