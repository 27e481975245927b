//! Metrics composed from several providers.

use super::{Endpoint, MetricsService};
use crate::domain::{
    DashboardError, DashboardSnapshot, MetricsError, SourceInfo, TimestampedMetric, TotalValueSecured,
};
use tracing::info;

impl MetricsService {
    /// Mainnet DeFi TVL plus layer 2 total value secured.
    ///
    /// Each half follows its own endpoint's failure policy; the result is
    /// stamped with the newer of the two timestamps.
    pub async fn total_value_secured(&self) -> Result<TimestampedMetric<TotalValueSecured>, MetricsError> {
        let (tvl, l2) = futures::try_join!(self.ethereum_tvl(), self.l2_scaling_summary())?;

        let data = TotalValueSecured {
            mainnet_defi_tvl: tvl.data,
            layer2_tvs: l2.data.total_value_secured,
            total: tvl.data + l2.data.total_value_secured,
        };
        Ok(TimestampedMetric {
            data,
            last_updated: tvl.last_updated.max(l2.last_updated),
            source_info: SourceInfo::new(
                &format!("{}, {}", tvl.source_info.source, l2.source_info.source),
                &tvl.source_info.source_href,
            ),
        })
    }

    /// Every landing-page metric, fetched concurrently.
    ///
    /// A member that fails after its own policy is applied is left empty and
    /// reported in `errors`; the snapshot itself never fails.
    pub async fn dashboard(&self) -> DashboardSnapshot {
        let (stablecoins, rwa, defi, tvs, activity, staking, eth) = futures::join!(
            self.stablecoin_market_share(),
            self.rwa_market_share(),
            self.defi_tvl_market_share(),
            self.total_value_secured(),
            self.l2_activity(),
            self.staking_stats(),
            self.eth_market_data(),
        );

        let mut errors = Vec::new();
        let stablecoin_market_share = collect(Endpoint::RwaStablecoinsMarketShare.id(), stablecoins, &mut errors);
        let rwa_market_share = collect(Endpoint::RwaAssetsMarketShare.id(), rwa, &mut errors);
        let defi_tvl_market_share = collect(Endpoint::DefiLlamaTvlMarketShare.id(), defi, &mut errors);
        let total_value_secured = collect("composite.total_value_secured", tvs, &mut errors);
        let l2_activity = collect(Endpoint::L2beatActivity.id(), activity, &mut errors);
        let staking = collect(Endpoint::BeaconchainStaking.id(), staking, &mut errors);
        let eth_market = collect(Endpoint::CoinGeckoEth.id(), eth, &mut errors);

        info!("Dashboard snapshot built with {} failed members", errors.len());
        DashboardSnapshot {
            stablecoin_market_share,
            rwa_market_share,
            defi_tvl_market_share,
            total_value_secured,
            l2_activity,
            staking,
            eth_market,
            errors,
        }
    }
}

fn collect<T>(
    endpoint: &str,
    result: Result<TimestampedMetric<T>, MetricsError>,
    errors: &mut Vec<DashboardError>,
) -> Option<TimestampedMetric<T>> {
    match result {
        Ok(metric) => Some(metric),
        Err(e) => {
            errors.push(DashboardError {
                endpoint: endpoint.to_string(),
                name: e.name().to_string(),
                message: e.to_string(),
            });
            None
        }
    }
}
