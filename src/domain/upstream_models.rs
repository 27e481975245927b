//! Request and response schemas of the upstream data providers.
//!
//! Responses are parsed into these types at the boundary; optional or flaky
//! fields carry serde defaults so a missing number reads as zero instead of
//! failing the whole payload.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// rwa.xyz v3 timeseries query document
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    In,
    OnOrAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RwaFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: serde_json::Value,
}

impl RwaFilter {
    pub fn new(field: &str, operator: FilterOperator, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RwaFilterGroup {
    pub operator: LogicalOperator,
    pub filters: Vec<RwaFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RwaAggregate {
    pub group_by: String,
    pub aggregate_function: String,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RwaSort {
    pub direction: SortDirection,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RwaPagination {
    pub page: u32,
    pub per_page: u32,
}

/// Filter/aggregate/sort/pagination document sent as `?query=<json>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RwaQuery {
    pub filter: RwaFilterGroup,
    pub aggregate: RwaAggregate,
    pub sort: RwaSort,
    pub pagination: RwaPagination,
}

impl RwaQuery {
    /// Daily sums grouped by network, oldest first.
    pub fn grouped_by_network(filters: Vec<RwaFilter>) -> Self {
        Self {
            filter: RwaFilterGroup {
                operator: LogicalOperator::And,
                filters,
            },
            aggregate: RwaAggregate {
                group_by: "network".to_string(),
                aggregate_function: "sum".to_string(),
                interval: "day".to_string(),
            },
            sort: RwaSort {
                direction: SortDirection::Asc,
                field: "date".to_string(),
            },
            pagination: RwaPagination {
                page: 1,
                per_page: 500,
            },
        }
    }
}

// ============================================================================
// rwa.xyz v3 timeseries response
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RwaTimeseriesResponse {
    #[serde(default)]
    pub results: Vec<RwaTimeseriesResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RwaTimeseriesResult {
    #[serde(default)]
    pub measure: Option<RwaMeasure>,
    pub group: RwaGroup,
    #[serde(default)]
    pub points: Vec<RwaPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RwaMeasure {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RwaGroup {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// `[date, value]` pair; null values are skipped downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RwaPoint(pub String, pub Option<f64>);

// ============================================================================
// L2BEAT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatSummaryResponse {
    pub data: L2beatSummaryData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatSummaryData {
    #[serde(default)]
    pub projects: HashMap<String, L2beatProject>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tvs: Option<L2beatProjectTvs>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatProjectTvs {
    pub breakdown: L2beatTvsBreakdown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatTvsBreakdown {
    #[serde(default)]
    pub total: f64,
}

/// Column-oriented chart payload shared by the tvs and activity endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatChartResponse {
    pub data: L2beatChartData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatChartData {
    pub chart: L2beatChart,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct L2beatChart {
    pub types: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Option<f64>>>,
}

impl L2beatChart {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name)
    }
}

// ============================================================================
// DefiLlama
// ============================================================================

/// Row of `/v2/chains`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefiLlamaChain {
    pub name: String,
    #[serde(default)]
    pub tvl: f64,
}

/// Row of `/v2/historicalChainTvl/{chain}`; `date` is epoch seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefiLlamaTvlPoint {
    pub date: i64,
    #[serde(default)]
    pub tvl: f64,
}

/// Row of `stablecoins.llama.fi/stablecoinchains`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefiLlamaStablecoinChain {
    pub name: String,
    #[serde(rename = "totalCirculatingUSD", default)]
    pub total_circulating_usd: HashMap<String, f64>,
}

/// `/overview/{dexs,fees}/{chain}` summary
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DefiLlamaOverview {
    #[serde(rename = "total24h", default)]
    pub total_24h: Option<f64>,
    #[serde(rename = "total7d", default)]
    pub total_7d: Option<f64>,
    #[serde(rename = "total30d", default)]
    pub total_30d: Option<f64>,
}

// ============================================================================
// beaconcha.in
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeaconchainResponse<T> {
    #[serde(default)]
    pub status: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeaconEpoch {
    pub epoch: u64,
    #[serde(default)]
    pub validatorscount: u64,
    /// Gwei
    #[serde(default)]
    pub eligibleether: f64,
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EthStoreDay {
    #[serde(default)]
    pub apr: f64,
    #[serde(default)]
    pub day_end: Option<String>,
}

// ============================================================================
// CoinGecko
// ============================================================================

/// `/simple/price` response, keyed by coin id.
pub type CoinGeckoSimplePrice = HashMap<String, CoinGeckoQuote>;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CoinGeckoQuote {
    #[serde(default)]
    pub usd: f64,
    #[serde(default)]
    pub usd_market_cap: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
    /// Epoch seconds
    #[serde(default)]
    pub last_updated_at: Option<i64>,
}
