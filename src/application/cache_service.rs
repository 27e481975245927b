//! Cache layer between the metric fetchers and the network.
//!
//! Upstream bodies are stored under time-bucketed keys derived from each
//! fetch's [`CachePolicy`]. Lookup order:
//! 1. Cache store (Redis or in-memory)
//! 2. An identical request already in flight - its result is shared
//! 3. The fetcher, whose successful result populates the store

use crate::domain::{CachePolicy, CacheRepository, MetricsError};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

type InFlight = Shared<BoxFuture<'static, Result<String, MetricsError>>>;

/// Snapshot of cache activity since startup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests that joined an identical in-flight fetch instead of starting one
    pub coalesced: u64,
    /// Fetches currently running
    pub in_flight: usize,
}

pub struct CacheService {
    store: Arc<dyn CacheRepository>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheRepository>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheRepository> {
        &self.store
    }

    /// Get a body for `policy`, fetching it at most once per key at a time.
    ///
    /// Errors are never cached; the next call after a failure fetches again.
    pub async fn get_or_fetch<F, Fut>(&self, policy: &CachePolicy, fetcher: F) -> Result<String, MetricsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, MetricsError>> + Send + 'static,
    {
        let key = policy.key_at(Utc::now().timestamp());

        match self.store.get(&key).await {
            Ok(Some(body)) => {
                debug!("Cache hit: {}", key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("cache_operations_total", "operation" => "hit").increment(1);
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let (shared, started) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
            match in_flight.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let task = self.spawn_fetch(key.clone(), policy, fetcher());
                    in_flight.insert(key.clone(), task.clone());
                    (task, true)
                }
            }
        };

        if started {
            info!("Cache miss, fetching from upstream: {}", key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("cache_operations_total", "operation" => "miss").increment(1);
        } else {
            debug!("Joining in-flight fetch: {}", key);
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("cache_operations_total", "operation" => "coalesced").increment(1);
        }

        shared.await
    }

    /// Wrap `fetch` so that it stores its result and leaves the in-flight
    /// registry when done, whichever caller ends up driving it.
    fn spawn_fetch<Fut>(&self, key: String, policy: &CachePolicy, fetch: Fut) -> InFlight
    where
        Fut: Future<Output = Result<String, MetricsError>> + Send + 'static,
    {
        let store = self.store.clone();
        let registry = self.in_flight.clone();
        let ttl = policy.revalidate.secs();
        let tags = policy.tags.clone();

        async move {
            let result = fetch.await;
            if let Ok(body) = &result {
                if let Err(e) = store.set(&key, body, ttl, &tags).await {
                    warn!("Failed to write cache entry {}: {}", key, e);
                }
            }
            registry.lock().unwrap_or_else(|p| p.into_inner()).remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    /// Drop every entry stored under `tag`.
    pub async fn invalidate_tag(&self, tag: &str) -> anyhow::Result<()> {
        self.store.invalidate_tag(tag).await?;
        metrics::counter!("cache_operations_total", "operation" => "invalidate").increment(1);
        info!("Invalidated cache tag: {}", tag);
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            in_flight: self.in_flight.lock().map(|m| m.len()).unwrap_or_default(),
        }
    }
}
