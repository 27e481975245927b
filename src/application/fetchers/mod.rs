//! Cross-provider metric fetchers.
//!
//! Every public fetcher follows the same path: build a provider request,
//! get the raw body through the [`CacheService`] (retrying fetch on a miss),
//! parse it into a provider schema, reshape it, and wrap the result in a
//! [`TimestampedMetric`]. What happens on failure is decided per endpoint by
//! an [`OnFailure`] policy; see [`MetricsService::resolve`].
//!
//! Providers are split into submodules, each adding an `impl MetricsService`
//! block.

pub mod beaconchain;
pub mod coingecko;
pub mod dashboard;
pub mod defillama;
pub mod internal;
pub mod l2beat;
pub mod rwa;

pub use rwa::AssetClass;

use crate::application::cache_service::CacheService;
use crate::application::market_share::NetworkTaxonomy;
use crate::config::{AppConfig, Secrets, UpstreamUrls};
use crate::domain::{CachePolicy, MetricsError, OnFailure, TimestampedMetric, UpstreamRequest};
use crate::infrastructure::{parse_json, FetchMode, UpstreamClient};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Stable identifiers of every fetcher, used in logs, metrics and
/// `failure_policies` overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    RwaStablecoinsMarketShare,
    RwaAssetsMarketShare,
    RwaStablecoinsSeries,
    RwaAssetsSeries,
    InternalRwaStablecoins,
    L2beatSummary,
    L2beatTvsSeries,
    L2beatActivity,
    DefiLlamaEthereumTvl,
    DefiLlamaTvlMarketShare,
    DefiLlamaEthereumTvlSeries,
    DefiLlamaEthereumStablecoins,
    DefiLlamaEthereumDexVolume,
    DefiLlamaEthereumFees,
    BeaconchainStaking,
    BeaconchainApr,
    CoinGeckoEth,
}

impl Endpoint {
    pub const ALL: [Endpoint; 17] = [
        Endpoint::RwaStablecoinsMarketShare,
        Endpoint::RwaAssetsMarketShare,
        Endpoint::RwaStablecoinsSeries,
        Endpoint::RwaAssetsSeries,
        Endpoint::InternalRwaStablecoins,
        Endpoint::L2beatSummary,
        Endpoint::L2beatTvsSeries,
        Endpoint::L2beatActivity,
        Endpoint::DefiLlamaEthereumTvl,
        Endpoint::DefiLlamaTvlMarketShare,
        Endpoint::DefiLlamaEthereumTvlSeries,
        Endpoint::DefiLlamaEthereumStablecoins,
        Endpoint::DefiLlamaEthereumDexVolume,
        Endpoint::DefiLlamaEthereumFees,
        Endpoint::BeaconchainStaking,
        Endpoint::BeaconchainApr,
        Endpoint::CoinGeckoEth,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Endpoint::RwaStablecoinsMarketShare => "rwa.stablecoins.market_share",
            Endpoint::RwaAssetsMarketShare => "rwa.assets.market_share",
            Endpoint::RwaStablecoinsSeries => "rwa.stablecoins.series",
            Endpoint::RwaAssetsSeries => "rwa.assets.series",
            Endpoint::InternalRwaStablecoins => "internal.rwa.stablecoins",
            Endpoint::L2beatSummary => "l2beat.summary",
            Endpoint::L2beatTvsSeries => "l2beat.tvs.series",
            Endpoint::L2beatActivity => "l2beat.activity",
            Endpoint::DefiLlamaEthereumTvl => "defillama.ethereum.tvl",
            Endpoint::DefiLlamaTvlMarketShare => "defillama.tvl.market_share",
            Endpoint::DefiLlamaEthereumTvlSeries => "defillama.ethereum.tvl.series",
            Endpoint::DefiLlamaEthereumStablecoins => "defillama.ethereum.stablecoins",
            Endpoint::DefiLlamaEthereumDexVolume => "defillama.ethereum.dex_volume",
            Endpoint::DefiLlamaEthereumFees => "defillama.ethereum.fees",
            Endpoint::BeaconchainStaking => "beaconchain.staking",
            Endpoint::BeaconchainApr => "beaconchain.apr",
            Endpoint::CoinGeckoEth => "coingecko.eth",
        }
    }

    /// Policy used when `failure_policies` has no entry for this endpoint.
    pub fn default_policy(self) -> OnFailure {
        match self {
            Endpoint::InternalRwaStablecoins | Endpoint::BeaconchainStaking => OnFailure::Propagate,
            _ => OnFailure::Degrade,
        }
    }
}

/// Attribution shown with each provider's metrics.
pub mod sources {
    use crate::domain::SourceInfo;

    pub fn rwa() -> SourceInfo {
        SourceInfo::new("rwa.xyz", "https://app.rwa.xyz")
    }

    pub fn l2beat() -> SourceInfo {
        SourceInfo::new("L2BEAT", "https://l2beat.com/scaling/summary")
    }

    pub fn defillama() -> SourceInfo {
        SourceInfo::new("DefiLlama", "https://defillama.com/chain/ethereum")
    }

    pub fn beaconchain() -> SourceInfo {
        SourceInfo::new("beaconcha.in", "https://beaconcha.in")
    }

    pub fn coingecko() -> SourceInfo {
        SourceInfo::new("CoinGecko", "https://www.coingecko.com/en/coins/ethereum")
    }
}

/// Entry point for every metric the API serves.
pub struct MetricsService {
    cache: Arc<CacheService>,
    client: UpstreamClient,
    urls: UpstreamUrls,
    taxonomy: NetworkTaxonomy,
    secrets: Secrets,
    policy_overrides: HashMap<String, OnFailure>,
}

impl MetricsService {
    pub fn new(cache: Arc<CacheService>, client: UpstreamClient, config: &AppConfig, secrets: Secrets) -> Self {
        for id in config.failure_policies.keys() {
            if !Endpoint::ALL.iter().any(|e| e.id() == id) {
                warn!("Ignoring failure policy for unknown endpoint: {}", id);
            }
        }
        if secrets.rwa_api_key.is_none() {
            warn!("RWA_API_KEY not set - rwa.xyz metrics will fail with a configuration error");
        }
        info!(
            "Initialized MetricsService with {} failure policy overrides",
            config.failure_policies.len()
        );

        Self {
            cache,
            client,
            urls: config.upstream.clone(),
            taxonomy: config.networks.clone(),
            secrets,
            policy_overrides: config.failure_policies.clone(),
        }
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    /// Effective failure policy of `endpoint`.
    pub fn policy_for(&self, endpoint: Endpoint) -> OnFailure {
        self.policy_overrides
            .get(endpoint.id())
            .copied()
            .unwrap_or_else(|| endpoint.default_policy())
    }

    /// Raw body of `request`, served from cache when the current window has one.
    async fn fetch_body(&self, request: UpstreamRequest, policy: &CachePolicy, mode: FetchMode) -> Result<String, MetricsError> {
        let client = self.client.clone();
        self.cache
            .get_or_fetch(policy, move || async move { client.get_text(&request, mode).await })
            .await
    }

    /// Cached body of `request`, parsed into a provider schema.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: UpstreamRequest,
        policy: &CachePolicy,
        mode: FetchMode,
    ) -> Result<T, MetricsError> {
        let url = request.url.clone();
        let body = self.fetch_body(request, policy, mode).await?;
        parse_json(&url, &body)
    }

    /// Apply the endpoint's failure policy to a fetch outcome.
    ///
    /// Failures are always logged with their class name, message and URL.
    /// Missing configuration is handed back regardless of policy; other
    /// failures of a degrading endpoint become the zero value stamped "now".
    fn resolve<T: Default>(
        &self,
        endpoint: Endpoint,
        source: crate::domain::SourceInfo,
        result: Result<TimestampedMetric<T>, MetricsError>,
    ) -> Result<TimestampedMetric<T>, MetricsError> {
        self.resolve_with(endpoint, self.policy_for(endpoint), source, result)
    }

    /// [`Self::resolve`] with the failure policy given by the caller.
    fn resolve_with<T: Default>(
        &self,
        endpoint: Endpoint,
        on_failure: OnFailure,
        source: crate::domain::SourceInfo,
        result: Result<TimestampedMetric<T>, MetricsError>,
    ) -> Result<TimestampedMetric<T>, MetricsError> {
        let err = match result {
            Ok(metric) => return Ok(metric),
            Err(err) => err,
        };

        error!(
            endpoint = endpoint.id(),
            name = err.name(),
            message = %err,
            url = err.url().unwrap_or_default(),
            "Metric fetch failed"
        );

        if err.is_configuration() || on_failure == OnFailure::Propagate {
            return Err(err);
        }

        metrics::counter!("metric_fallbacks_total", "endpoint" => endpoint.id()).increment(1);
        Ok(TimestampedMetric::new(T::default(), None, source))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::MockHttpTransport;
    use crate::domain::UpstreamResponse;

    #[test]
    fn test_endpoint_ids_are_unique() {
        let mut ids: Vec<&str> = Endpoint::ALL.iter().map(|e| e.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Endpoint::ALL.len());
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let mut config = AppConfig::default();
        config
            .failure_policies
            .insert("beaconchain.staking".to_string(), OnFailure::Degrade);
        let svc = service_with(Arc::new(RoutedTransport::new()), &config, secrets());

        assert_eq!(svc.policy_for(Endpoint::BeaconchainStaking), OnFailure::Degrade);
        assert_eq!(svc.policy_for(Endpoint::InternalRwaStablecoins), OnFailure::Propagate);
        assert_eq!(svc.policy_for(Endpoint::CoinGeckoEth), OnFailure::Degrade);
    }

    #[test]
    fn test_resolve_degrades_to_zero_value() {
        let svc = service(Arc::new(RoutedTransport::new()));
        let failed: Result<TimestampedMetric<f64>, _> = Err(MetricsError::EmptySeries);

        let metric = svc
            .resolve(Endpoint::DefiLlamaEthereumTvl, sources::defillama(), failed)
            .unwrap();
        assert_eq!(metric.data, 0.0);
        assert_eq!(metric.source_info, sources::defillama());
    }

    #[test]
    fn test_resolve_propagates_configuration_errors_even_when_degrading() {
        let svc = service(Arc::new(RoutedTransport::new()));
        let failed: Result<TimestampedMetric<f64>, _> = Err(MetricsError::configuration("RWA_API_KEY"));

        let err = svc
            .resolve(Endpoint::RwaStablecoinsMarketShare, sources::rwa(), failed)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_fetch_json_is_idempotent_within_window() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(UpstreamResponse::new(200, r#"[{"name":"Ethereum","tvl":1.0}]"#)));
        let svc = service(Arc::new(transport));

        let first = svc.ethereum_tvl().await.unwrap();
        let second = svc.ethereum_tvl().await.unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.data, 1.0);
    }
}
