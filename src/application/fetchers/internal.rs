//! Metrics read back through this service's own secret-guarded endpoints.

use super::{sources, AssetClass, Endpoint, MetricsService};
use crate::domain::{
    AssetMarketShareData, CachePolicy, MetricsError, Revalidate, TimestampedMetric, UpstreamRequest,
};
use crate::infrastructure::FetchMode;
use reqwest::Url;

impl MetricsService {
    /// Stablecoin breakdown as served by `/api/internal/rwa/stablecoins`.
    ///
    /// The endpoint already returns the full envelope, so it is passed through
    /// unchanged. Requests go out once, without retries.
    pub async fn internal_stablecoin_market_share(
        &self,
    ) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        let result = self
            .fetch_internal_market_share(AssetClass::Stablecoins)
            .await
            .map_err(MetricsError::without_query);
        self.resolve(Endpoint::InternalRwaStablecoins, sources::rwa(), result)
    }

    async fn fetch_internal_market_share(
        &self,
        class: AssetClass,
    ) -> Result<TimestampedMetric<AssetMarketShareData>, MetricsError> {
        let secret = self
            .secrets
            .internal_api_secret
            .as_deref()
            .ok_or_else(|| MetricsError::configuration("INTERNAL_API_SECRET"))?;

        let endpoint = format!(
            "{}/api/internal/rwa/{}",
            self.secrets.internal_base_url.trim_end_matches('/'),
            class.as_path()
        );
        let url = Url::parse_with_params(&endpoint, &[("secret", secret)])
            .map_err(|_| MetricsError::configuration("INTERNAL_BASE_URL"))?;

        let policy = CachePolicy::new(Revalidate::Hour, &format!("internal:rwa:{}", class.as_path()));
        self.fetch_json(UpstreamRequest::get(url.as_str()), &policy, FetchMode::Direct)
            .await
    }
}
