//! Institutional Metrics Gateway
//!
//! A REST API serving cached, display-ready Ethereum ecosystem metrics pulled
//! from third-party data providers (rwa.xyz, L2BEAT, DefiLlama, beaconcha.in,
//! CoinGecko).
//!
//! # Architecture
//!
//! - **Domain**: metric entities, provider schemas, error taxonomy, traits
//! - **Application**: series normalization, market-share aggregation, cache
//!   service and the per-provider fetchers
//! - **Infrastructure**: HTTP transport with retry, Redis and in-memory caches
//! - **API**: HTTP handlers, routing, and middleware
//!
//! # Configuration
//!
//! Static settings live in `config.yaml` (`CONFIG_PATH` overrides the path).
//! Environment:
//! - `RWA_API_KEY`: rwa.xyz bearer token; rwa metrics fail without it
//! - `INTERNAL_API_SECRET`: guards `/api/internal/*` and cache revalidation
//! - `INTERNAL_BASE_URL`: base URL this service reaches itself at
//!   (default: `http://localhost:{port}`)
//! - `REDIS_URL`: shared cache; an in-process cache is used when unset
//! - `PORT`, `RUST_LOG`, `LOG_FORMAT` (`text` or `json`)
//!
//! # Quick Start
//!
//! ```bash
//! export RWA_API_KEY="..."
//! export INTERNAL_API_SECRET="..."
//! cargo run --release
//!
//! curl http://localhost:3010/health
//! curl http://localhost:3010/v1/dashboard
//! curl "http://localhost:3010/v1/metrics/rwa/stablecoins/series?skipFiltering=true"
//! ```

use anyhow::Context;
use institutional_metrics_gateway::api::routes::create_router;
use institutional_metrics_gateway::api::state::AppState;
use institutional_metrics_gateway::application::{CacheService, MetricsService};
use institutional_metrics_gateway::config::{AppConfig, Secrets};
use institutional_metrics_gateway::domain::CacheRepository;
use institutional_metrics_gateway::infrastructure::{MemoryCache, RedisRepository, ReqwestTransport, UpstreamClient};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load Config
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = AppConfig::load(&config_path)?;

    // Allow PORT env var override
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.server.port);
    let secrets = Secrets::from_env(port);
    if secrets.internal_api_secret.is_none() {
        tracing::warn!("INTERNAL_API_SECRET not set - internal endpoints and cache revalidation are disabled");
    }

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Infrastructure
    let (store, cache_backend): (Arc<dyn CacheRepository>, &'static str) = match env::var("REDIS_URL").ok() {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!("Using Redis cache store");
            (Arc::new(RedisRepository::new(Some(url))), "redis")
        }
        _ => {
            tracing::warn!("REDIS_URL not set - using in-process cache (not shared between instances)");
            (Arc::new(MemoryCache::new()), "memory")
        }
    };
    let transport = Arc::new(ReqwestTransport::new()?);
    let client = UpstreamClient::new(transport, config.retry.into());

    // Application
    let cache_service = Arc::new(CacheService::new(store));
    let metrics_service = Arc::new(MetricsService::new(cache_service, client, &config, secrets));

    let state = AppState {
        metrics_service,
        prometheus,
        cache_backend,
    };

    let app = create_router(state, &config.server.allowed_origins);

    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Institutional metrics gateway running at http://{}", addr);

    // Graceful shutdown handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
