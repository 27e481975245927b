use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // System
        crate::api::handlers::health_handler,
        crate::api::handlers::metrics_handler,
        // Cache & internal
        crate::api::handlers::revalidate_handler,
        crate::api::handlers::cache_stats_handler,
        crate::api::handlers::internal_rwa_handler,
        // rwa.xyz
        crate::api::metric_handlers::rwa_market_share_handler,
        crate::api::metric_handlers::rwa_series_handler,
        crate::api::metric_handlers::internal_stablecoins_handler,
        // L2BEAT
        crate::api::metric_handlers::l2_summary_handler,
        crate::api::metric_handlers::l2_tvs_series_handler,
        crate::api::metric_handlers::l2_activity_handler,
        // DefiLlama
        crate::api::metric_handlers::ethereum_tvl_handler,
        crate::api::metric_handlers::defi_tvl_market_share_handler,
        crate::api::metric_handlers::ethereum_tvl_series_handler,
        crate::api::metric_handlers::ethereum_stablecoins_handler,
        crate::api::metric_handlers::dex_volume_handler,
        crate::api::metric_handlers::fees_handler,
        // Staking, market, composites
        crate::api::metric_handlers::staking_handler,
        crate::api::metric_handlers::staking_apr_handler,
        crate::api::metric_handlers::eth_market_handler,
        crate::api::metric_handlers::total_value_secured_handler,
        crate::api::metric_handlers::dashboard_handler
    ),
    components(
        schemas(
            crate::api::handlers::HealthResponse,
            crate::api::handlers::HealthDependencies,
            crate::api::handlers::ErrorResponse,
            crate::api::handlers::RevalidateResponse,
            crate::application::CacheStats,
            crate::domain::SourceInfo,
            crate::domain::DataPoint,
            crate::domain::DataSeriesWithCurrent,
            crate::domain::NetworkBreakdown,
            crate::domain::AssetMarketShareData,
            crate::domain::L2ScalingSummary,
            crate::domain::L2Activity,
            crate::domain::DefiTvlMarketShare,
            crate::domain::VolumeTotals,
            crate::domain::StakingStats,
            crate::domain::EthMarketData,
            crate::domain::TotalValueSecured,
            crate::domain::DashboardError
        )
    ),
    tags(
        (name = "system", description = "System endpoints for health checks and metrics"),
        (name = "RWA", description = "Tokenized real-world asset metrics from rwa.xyz"),
        (name = "L2", description = "Layer 2 scaling metrics from L2BEAT"),
        (name = "DeFi", description = "Ethereum DeFi metrics from DefiLlama"),
        (name = "Staking", description = "Beacon chain staking metrics from beaconcha.in"),
        (name = "Market", description = "Spot market data and composite metrics"),
        (name = "Cache", description = "Cache revalidation and statistics"),
        (name = "Internal", description = "Secret-guarded endpoints for server-side consumers")
    ),
    info(
        title = "Institutional Metrics Gateway",
        version = "0.1.0",
        description = "Cached, display-ready Ethereum ecosystem metrics aggregated from rwa.xyz, L2BEAT, DefiLlama, beaconcha.in and CoinGecko. Every metric is wrapped in a { data, lastUpdated, sourceInfo } envelope."
    )
)]
pub struct ApiDoc;
