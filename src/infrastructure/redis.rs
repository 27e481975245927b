use crate::domain::CacheRepository;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::{error, info};

/// Prefix of the Redis sets that record which keys belong to a cache tag.
const TAG_SET_PREFIX: &str = "tag:";

pub struct RedisRepository {
    pool: Option<Pool>,
}

impl RedisRepository {
    pub fn new(url: Option<String>) -> Self {
        if let Some(redis_url) = url {
            match Config::from_url(&redis_url).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => {
                    info!("Redis connection pool initialized");
                    Self { pool: Some(pool) }
                }
                Err(e) => {
                    error!("Failed to create Redis connection pool: {}", e);
                    Self { pool: None }
                }
            }
        } else {
            info!("Redis URL not provided, caching disabled");
            Self { pool: None }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    fn tag_set(tag: &str) -> String {
        format!("{}{}", TAG_SET_PREFIX, tag)
    }
}

#[async_trait]
impl CacheRepository for RedisRepository {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if let Some(pool) = &self.pool {
            match pool.get().await {
                Ok(mut conn) => {
                    let result: Option<String> = conn.get(key).await.ok();
                    Ok(result)
                }
                Err(e) => {
                    error!("Failed to get Redis connection from pool: {}", e);
                    Ok(None)
                }
            }
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64, tags: &[String]) -> anyhow::Result<()> {
        if let Some(pool) = &self.pool {
            match pool.get().await {
                Ok(mut conn) => {
                    let mut pipe = redis::pipe();
                    pipe.atomic().set_ex(key, value, ttl_seconds).ignore();
                    for tag in tags {
                        let set = Self::tag_set(tag);
                        pipe.sadd(&set, key).ignore();
                        // Tag sets outlive their members by one window at most
                        pipe.expire(&set, (ttl_seconds * 2) as i64).ignore();
                    }
                    let _: () = pipe.query_async(&mut conn).await?;
                }
                Err(e) => {
                    error!("Failed to get Redis connection from pool: {}", e);
                }
            }
        }
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> anyhow::Result<()> {
        if let Some(pool) = &self.pool {
            let mut conn = pool.get().await?;
            let set = Self::tag_set(tag);
            let keys: Vec<String> = conn.smembers(&set).await?;
            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
            }
            let _: () = conn.del(&set).await?;
            info!("Invalidated {} Redis keys for tag {}", keys.len(), tag);
        }
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        match &self.pool {
            Some(pool) => pool.get().await.is_ok(),
            None => false,
        }
    }
}
