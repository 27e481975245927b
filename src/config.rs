//! Application configuration.
//!
//! Static settings come from `config.yaml` (path overridable with
//! `CONFIG_PATH`); credentials and deployment specifics come from the
//! environment. Every section has defaults, so an empty file is valid.

use crate::application::market_share::NetworkTaxonomy;
use crate::domain::OnFailure;
use crate::infrastructure::RetryOptions;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

/// Top-level configuration loaded from `config.yaml`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Base URLs of the upstream data providers
    #[serde(default)]
    pub upstream: UpstreamUrls,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Network buckets used by the market-share aggregation
    #[serde(default)]
    pub networks: NetworkTaxonomy,
    /// Per-endpoint failure policy overrides, keyed by endpoint id
    /// (e.g. `beaconchain.staking: degrade`)
    #[serde(default)]
    pub failure_policies: HashMap<String, OnFailure>,
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse config.yaml - check YAML syntax and structure")
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} - ensure file exists in working directory", path))?;
        Self::from_yaml_str(&content)
    }
}

/// Server configuration settings.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on (default: 3010)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3010
}
fn default_allowed_origins() -> String {
    "*".to_string()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamUrls {
    pub rwa: String,
    pub l2beat: String,
    pub defillama: String,
    pub defillama_stablecoins: String,
    pub beaconchain: String,
    pub coingecko: String,
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        Self {
            rwa: "https://api.rwa.xyz/v3".to_string(),
            l2beat: "https://l2beat.com/api".to_string(),
            defillama: "https://api.llama.fi".to_string(),
            defillama_stablecoins: "https://stablecoins.llama.fi".to_string(),
            beaconchain: "https://beaconcha.in/api/v1".to_string(),
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
        }
    }
}

/// Retry settings for external providers.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let defaults = RetryOptions::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            retries: defaults.retries,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
        }
    }
}

impl From<RetryConfig> for RetryOptions {
    fn from(config: RetryConfig) -> Self {
        RetryOptions {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Credentials and deployment settings read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Bearer token for rwa.xyz (`RWA_API_KEY`)
    pub rwa_api_key: Option<String>,
    /// Shared secret guarding internal endpoints (`INTERNAL_API_SECRET`)
    pub internal_api_secret: Option<String>,
    /// Where this service can reach itself (`INTERNAL_BASE_URL`)
    pub internal_base_url: String,
}

impl Secrets {
    pub fn from_env(port: u16) -> Self {
        Self {
            rwa_api_key: non_empty_var("RWA_API_KEY"),
            internal_api_secret: non_empty_var("INTERNAL_API_SECRET"),
            internal_base_url: non_empty_var("INTERNAL_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
