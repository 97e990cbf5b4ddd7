// src/cache/backend.rs

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::cache::CacheError;

/// A value produced on a cache miss, with an optional TTL override.
///
/// The override lets a compute step store a negative "not found" marker with
/// a shorter expiry than the default it was called with.
pub struct Computed {
    pub value: Value,
    pub ttl: Option<Duration>,
}

impl Computed {
    pub fn fresh(value: Value) -> Self {
        Self { value, ttl: None }
    }

    pub fn short_lived(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            ttl: Some(ttl),
        }
    }
}

/// Future resolving to the value for a missed key.
pub type ComputeFuture<'a> = BoxFuture<'a, Result<Computed, CacheError>>;

/// Key/value store the cache layer runs against.
///
/// Keys are opaque strings, values are JSON. Implementations own their
/// concurrency guarantees; the cache layer adds no locking of its own, so two
/// concurrent misses for the same key may both compute and both store
/// (idempotent, tolerated).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the live value for `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key` for `ttl`.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Idempotent; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Cache-aside primitive: return the stored value for `key`, computing
    /// and storing it (with `ttl` unless the compute step overrides) on miss.
    async fn get_or_compute<'a>(
        &self,
        key: &str,
        ttl: Duration,
        compute: ComputeFuture<'a>,
    ) -> Result<Value, CacheError> {
        if let Some(hit) = self.get(key).await? {
            return Ok(hit);
        }

        let computed = compute.await?;
        let ttl = computed.ttl.unwrap_or(ttl);
        self.put(key, computed.value.clone(), ttl).await?;

        Ok(computed.value)
    }
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache backend with per-entry TTL and lazy expiry on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Expired: drop the read guard above before removing.
        self.entries.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .put("k", json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn expired_entry_is_gone() {
        let cache = MemoryCache::new();
        cache
            .put("k", json!(1), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCache::new();
        cache.delete("missing").await.unwrap();
        cache
            .put("k", json!(1), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_or_compute_only_computes_on_miss() {
        let cache = MemoryCache::new();

        let value = cache
            .get_or_compute(
                "k",
                Duration::from_secs(60),
                Box::pin(async { Ok(Computed::fresh(json!("computed"))) }),
            )
            .await
            .unwrap();
        assert_eq!(value, json!("computed"));

        // Second call must serve the stored value, not the new compute result.
        let value = cache
            .get_or_compute(
                "k",
                Duration::from_secs(60),
                Box::pin(async { Ok(Computed::fresh(json!("recomputed"))) }),
            )
            .await
            .unwrap();
        assert_eq!(value, json!("computed"));
    }

    #[tokio::test]
    async fn ttl_override_applies() {
        let cache = MemoryCache::new();
        cache
            .get_or_compute(
                "k",
                Duration::from_secs(3600),
                Box::pin(async {
                    Ok(Computed::short_lived(
                        Value::Null,
                        Duration::from_millis(10),
                    ))
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
