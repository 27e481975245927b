//! beaconcha.in staking metrics.

use super::{sources, Endpoint, MetricsService};
use crate::application::series::parse_date;
use crate::domain::upstream_models::{BeaconEpoch, BeaconchainResponse, EthStoreDay};
use crate::domain::{CachePolicy, MetricsError, Revalidate, StakingStats, TimestampedMetric, UpstreamRequest};
use crate::infrastructure::FetchMode;

const GWEI_PER_ETH: f64 = 1e9;

impl MetricsService {
    /// Validator count and staked ETH at the latest epoch.
    pub async fn staking_stats(&self) -> Result<TimestampedMetric<StakingStats>, MetricsError> {
        let result = self.fetch_staking_stats().await;
        self.resolve(Endpoint::BeaconchainStaking, sources::beaconchain(), result)
    }

    /// Network-wide staking APR from the latest ETH.STORE day, as a fraction.
    pub async fn staking_apr(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let result = self.fetch_staking_apr().await;
        self.resolve(Endpoint::BeaconchainApr, sources::beaconchain(), result)
    }

    async fn fetch_staking_stats(&self) -> Result<TimestampedMetric<StakingStats>, MetricsError> {
        let url = format!("{}/epoch/latest", self.urls.beaconchain);
        let policy = CachePolicy::new(Revalidate::FiveMinutes, "beaconchain:epoch:latest");
        let response: BeaconchainResponse<BeaconEpoch> = self
            .fetch_json(UpstreamRequest::get(url), &policy, FetchMode::Retrying)
            .await?;

        let epoch = response.data;
        let stats = StakingStats {
            validator_count: epoch.validatorscount,
            total_staked_eth: epoch.eligibleether / GWEI_PER_ETH,
            epoch: epoch.epoch,
        };
        let updated = epoch.ts.as_deref().and_then(parse_date);
        Ok(TimestampedMetric::new(stats, updated, sources::beaconchain()))
    }

    async fn fetch_staking_apr(&self) -> Result<TimestampedMetric<f64>, MetricsError> {
        let url = format!("{}/ethstore/latest", self.urls.beaconchain);
        let policy = CachePolicy::new(Revalidate::Hour, "beaconchain:ethstore:latest");
        let response: BeaconchainResponse<EthStoreDay> = self
            .fetch_json(UpstreamRequest::get(url), &policy, FetchMode::Retrying)
            .await?;

        let updated = response.data.day_end.as_deref().and_then(parse_date);
        Ok(TimestampedMetric::new(response.data.apr, updated, sources::beaconchain()))
    }
}
