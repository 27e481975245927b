//! CoinGecko spot market data.

use super::{sources, Endpoint, MetricsService};
use crate::application::series::from_epoch_secs;
use crate::domain::upstream_models::CoinGeckoSimplePrice;
use crate::domain::{CachePolicy, EthMarketData, MetricsError, Revalidate, TimestampedMetric, UpstreamRequest};
use crate::infrastructure::FetchMode;

const COIN_ID: &str = "ethereum";

impl MetricsService {
    /// ETH price, market cap and 24h change in USD.
    pub async fn eth_market_data(&self) -> Result<TimestampedMetric<EthMarketData>, MetricsError> {
        let result = self.fetch_eth_market_data().await;
        self.resolve(Endpoint::CoinGeckoEth, sources::coingecko(), result)
    }

    async fn fetch_eth_market_data(&self) -> Result<TimestampedMetric<EthMarketData>, MetricsError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_market_cap=true&include_24hr_change=true&include_last_updated_at=true",
            self.urls.coingecko, COIN_ID
        );
        let policy = CachePolicy::new(Revalidate::Minute, "coingecko:simple:price:ethereum");
        let mut prices: CoinGeckoSimplePrice = self
            .fetch_json(UpstreamRequest::get(url.clone()), &policy, FetchMode::Retrying)
            .await?;

        let quote = prices
            .remove(COIN_ID)
            .ok_or_else(|| MetricsError::data_shape(url, "no ethereum quote in response"))?;
        let data = EthMarketData {
            price_usd: quote.usd,
            market_cap_usd: quote.usd_market_cap,
            change_24h_percent: quote.usd_24h_change,
        };
        let updated = quote.last_updated_at.and_then(from_epoch_secs);
        Ok(TimestampedMetric::new(data, updated, sources::coingecko()))
    }
}
