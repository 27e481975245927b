//! In-process cache store used when no Redis URL is configured.

use crate::domain::CacheRepository;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_ENTRIES: u64 = 10_000;

/// Upper bound on any entry's lifetime.
const MAX_TTL_SECS: u64 = 86_400;

#[derive(Clone)]
struct CachedEntry {
    value: Arc<str>,
    ttl: Duration,
    tags: Arc<[String]>,
}

/// Each entry lives for the TTL it was written with; a rewrite restarts it.
struct EntryTtl;

impl Expiry<String, CachedEntry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &CachedEntry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, CachedEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(EntryTtl)
            .support_invalidation_closures()
            .build();
        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheRepository for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64, tags: &[String]) -> anyhow::Result<()> {
        let entry = CachedEntry {
            value: Arc::from(value),
            ttl: Duration::from_secs(ttl_seconds.min(MAX_TTL_SECS)),
            tags: Arc::from(tags),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> anyhow::Result<()> {
        let tag = tag.to_string();
        self.entries
            .invalidate_entries_if(move |_, entry| entry.tags.iter().any(|t| *t == tag))
            .map_err(|e| anyhow::anyhow!("Failed to register invalidation predicate: {}", e))?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set("k", "body", 60, &tags(&["rwa"])).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("body"));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let cache = MemoryCache::new();
        cache.set("k", "body", 0, &[]).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_without_a_read() {
        let cache = MemoryCache::new();
        cache.set("short", "1", 1, &[]).await.unwrap();
        cache.set("long", "2", 60, &[]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        cache.entries.run_pending_tasks().await;

        assert_eq!(cache.entries.entry_count(), 1);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_invalidate_by_tag_only_hits_tagged_entries() {
        let cache = MemoryCache::new();
        cache.set("a", "1", 60, &tags(&["rwa", "rwa:v3"])).await.unwrap();
        cache.set("b", "2", 60, &tags(&["l2beat"])).await.unwrap();

        cache.invalidate_tag("rwa").await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap().as_deref(), Some("2"));
    }
}
