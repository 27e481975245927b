pub mod cache_service;
pub mod fetchers;
pub mod market_share;
pub mod series;

pub use cache_service::{CacheService, CacheStats};
pub use fetchers::{AssetClass, Endpoint, MetricsService};
