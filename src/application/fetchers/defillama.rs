//! DefiLlama chain TVL, stablecoin and volume metrics.

use super::{sources, Endpoint, MetricsService};
use crate::application::series::{from_epoch_secs, get_series_with_current, latest_date};
use crate::domain::upstream_models::{DefiLlamaChain, DefiLlamaOverview, DefiLlamaStablecoinChain, DefiLlamaTvlPoint};
use crate::domain::{
    CachePolicy, DataPoint, DataSeries, DataSeriesWithCurrent, DefiTvlMarketShare, MetricsError, Revalidate,
    TimestampedMetric, UpstreamRequest, VolumeTotals,
};
use crate::infrastructure::FetchMode;

const ETHEREUM: &str = "Ethereum";

/// Key of USD-pegged supply in `totalCirculatingUSD`.
const PEGGED_USD: &str = "peggedUSD";

/// DefiLlama overview families sharing one response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overview {
    Dexs,
    Fees,
}

impl Overview {
    fn path(self) -> &'static str {
        match self {
            Overview::Dexs => "dexs",
            Overview::Fees => "fees",
        }
    }
}

impl MetricsService {
    /// DeFi TVL on Ethereum mainnet, in USD.
    pub async fn ethereum_tvl(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let result = self.fetch_ethereum_tvl().await;
        self.resolve(Endpoint::DefiLlamaEthereumTvl, sources::defillama(), result)
    }

    /// Ethereum's share of all DeFi TVL and its multiple over the runner-up.
    pub async fn defi_tvl_market_share(&self) -> Result<TimestampedMetric<DefiTvlMarketShare>, MetricsError> {
        let result = self.fetch_defi_tvl_market_share().await;
        self.resolve(Endpoint::DefiLlamaTvlMarketShare, sources::defillama(), result)
    }

    pub async fn ethereum_tvl_series(
        &self,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let result = self.fetch_ethereum_tvl_series(skip_filtering).await;
        self.resolve(Endpoint::DefiLlamaEthereumTvlSeries, sources::defillama(), result)
    }

    /// USD-pegged stablecoin supply on Ethereum.
    pub async fn ethereum_stablecoin_supply(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let result = self.fetch_ethereum_stablecoin_supply().await;
        self.resolve(Endpoint::DefiLlamaEthereumStablecoins, sources::defillama(), result)
    }

    pub async fn ethereum_dex_volume(&self) -> Result<TimestampedMetric<VolumeTotals>, MetricsError> {
        let result = self.fetch_overview(Overview::Dexs).await;
        self.resolve(Endpoint::DefiLlamaEthereumDexVolume, sources::defillama(), result)
    }

    pub async fn ethereum_fees(&self) -> Result<TimestampedMetric<VolumeTotals>, MetricsError> {
        let result = self.fetch_overview(Overview::Fees).await;
        self.resolve(Endpoint::DefiLlamaEthereumFees, sources::defillama(), result)
    }

    async fn chains(&self) -> Result<(String, Vec<DefiLlamaChain>), MetricsError> {
        let url = format!("{}/v2/chains", self.urls.defillama);
        let policy = CachePolicy::new(Revalidate::Hour, "defillama:v2:chains");
        let chains: Vec<DefiLlamaChain> = self
            .fetch_json(UpstreamRequest::get(url.clone()), &policy, FetchMode::Retrying)
            .await?;
        Ok((url, chains))
    }

    async fn fetch_ethereum_tvl(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let (url, chains) = self.chains().await?;
        let tvl = chains
            .iter()
            .find(|c| c.name == ETHEREUM)
            .map(|c| c.tvl)
            .ok_or_else(|| MetricsError::data_shape(url, "Ethereum missing from chain list"))?;
        Ok(TimestampedMetric::new(tvl, None, sources::defillama()))
    }

    async fn fetch_defi_tvl_market_share(&self) -> Result<TimestampedMetric<DefiTvlMarketShare>, MetricsError> {
        let (url, chains) = self.chains().await?;
        let share = tvl_market_share(&chains).ok_or_else(|| MetricsError::data_shape(url, "Ethereum missing from chain list"))?;
        Ok(TimestampedMetric::new(share, None, sources::defillama()))
    }

    async fn fetch_ethereum_tvl_series(
        &self,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let url = format!("{}/v2/historicalChainTvl/{}", self.urls.defillama, ETHEREUM);
        let policy = CachePolicy::new(Revalidate::Day, "defillama:v2:historicalChainTvl:Ethereum");
        let points: Vec<DefiLlamaTvlPoint> = self
            .fetch_json(UpstreamRequest::get(url), &policy, FetchMode::Retrying)
            .await?;

        let series: DataSeries = points
            .iter()
            .filter_map(|p| Some(DataPoint::new(from_epoch_secs(p.date)?, p.tvl)))
            .collect();
        let data = get_series_with_current(&series, skip_filtering)?;
        Ok(TimestampedMetric::new(data, latest_date(&series), sources::defillama()))
    }

    async fn fetch_ethereum_stablecoin_supply(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let url = format!("{}/stablecoinchains", self.urls.defillama_stablecoins);
        let policy = CachePolicy::new(Revalidate::Hour, "defillama:stablecoins:chains");
        let chains: Vec<DefiLlamaStablecoinChain> = self
            .fetch_json(UpstreamRequest::get(url.clone()), &policy, FetchMode::Retrying)
            .await?;

        let supply = chains
            .iter()
            .find(|c| c.name == ETHEREUM)
            .and_then(|c| c.total_circulating_usd.get(PEGGED_USD).copied())
            .ok_or_else(|| MetricsError::data_shape(url, "no peggedUSD supply for Ethereum"))?;
        Ok(TimestampedMetric::new(supply, None, sources::defillama()))
    }

    async fn fetch_overview(&self, kind: Overview) -> Result<TimestampedMetric<VolumeTotals>, MetricsError> {
        let url = format!(
            "{}/overview/{}/ethereum?excludeTotalDataChart=true&excludeTotalDataChartBreakdown=true",
            self.urls.defillama,
            kind.path()
        );
        let policy = CachePolicy::new(Revalidate::Hour, &format!("defillama:overview:{}:ethereum", kind.path()));
        let overview: DefiLlamaOverview = self
            .fetch_json(UpstreamRequest::get(url), &policy, FetchMode::Retrying)
            .await?;

        let totals = VolumeTotals {
            total_24h: overview.total_24h.unwrap_or_default(),
            total_7d: overview.total_7d.unwrap_or_default(),
            total_30d: overview.total_30d.unwrap_or_default(),
        };
        Ok(TimestampedMetric::new(totals, None, sources::defillama()))
    }
}

/// Ethereum against the sum of all chains and the largest other chain.
///
/// `None` when Ethereum is not listed.
fn tvl_market_share(chains: &[DefiLlamaChain]) -> Option<DefiTvlMarketShare> {
    let ethereum_tvl = chains.iter().find(|c| c.name == ETHEREUM)?.tvl;
    let total_tvl: f64 = chains.iter().map(|c| c.tvl).sum();
    let runner_up = chains
        .iter()
        .filter(|c| c.name != ETHEREUM)
        .max_by(|a, b| a.tvl.total_cmp(&b.tvl));

    let runner_up_tvl = runner_up.map(|c| c.tvl).unwrap_or_default();
    Some(DefiTvlMarketShare {
        ethereum_tvl,
        total_tvl,
        market_share: if total_tvl > 0.0 { ethereum_tvl / total_tvl } else { 0.0 },
        runner_up_name: runner_up.map(|c| c.name.clone()).unwrap_or_default(),
        runner_up_tvl,
        runner_up_multiplier: if runner_up_tvl > 0.0 { ethereum_tvl / runner_up_tvl } else { 0.0 },
    })
}
