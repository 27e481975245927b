//! Cache and failure policies attached to each outbound metric fetch.

use serde::{Deserialize, Serialize};

/// What a fetcher does once its upstream call has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Log and return the documented zero/empty value.
    Degrade,
    /// Log and hand the error to the caller.
    Propagate,
}

/// Revalidation window for a cached upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidate {
    Minute,
    FiveMinutes,
    Hour,
    Day,
}

impl Revalidate {
    pub fn secs(self) -> u64 {
        match self {
            Revalidate::Minute => 60,
            Revalidate::FiveMinutes => 300,
            Revalidate::Hour => 3_600,
            Revalidate::Day => 86_400,
        }
    }

    /// Index of the window containing `epoch_secs`. Keys built from it roll over
    /// at every window boundary.
    pub fn bucket(self, epoch_secs: i64) -> i64 {
        epoch_secs.div_euclid(self.secs() as i64)
    }
}

/// `(revalidate, tags)` pair for one upstream call.
///
/// The first tag is the primary one and names provider, endpoint and
/// parameters, e.g. `rwa:v3:assets:aggregates:timeseries:STABLECOINS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub revalidate: Revalidate,
    pub tags: Vec<String>,
}

impl CachePolicy {
    /// Build a policy from a primary tag; every colon-separated prefix is
    /// registered too so a whole provider can be invalidated at once.
    pub fn new(revalidate: Revalidate, primary_tag: &str) -> Self {
        Self {
            revalidate,
            tags: hierarchical_tags(primary_tag),
        }
    }

    pub fn primary_tag(&self) -> &str {
        self.tags.last().map(String::as_str).unwrap_or_default()
    }

    /// Cache key for the window containing `epoch_secs`.
    pub fn key_at(&self, epoch_secs: i64) -> String {
        format!(
            "v1:{}:{}:{}",
            self.primary_tag(),
            self.revalidate.secs(),
            self.revalidate.bucket(epoch_secs)
        )
    }
}

/// `"a:b:c"` → `["a", "a:b", "a:b:c"]`
pub fn hierarchical_tags(tag: &str) -> Vec<String> {
    let parts: Vec<&str> = tag.split(':').filter(|p| !p.is_empty()).collect();
    (1..=parts.len()).map(|n| parts[..n].join(":")).collect()
}
