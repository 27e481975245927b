pub mod http_transport;
pub mod memory_cache;
pub mod redis;
pub mod retry_fetch;
pub mod upstream_client;

pub use http_transport::ReqwestTransport;
pub use memory_cache::MemoryCache;
pub use redis::RedisRepository;
pub use retry_fetch::{fetch_with_retry, RetryOptions};
pub use upstream_client::{parse_json, FetchMode, UpstreamClient};
