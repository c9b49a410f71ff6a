//! Named cache partitions.
//!
//! [`CacheStorage`] mirrors the host cache API the gateway needs: lookups
//! across every partition, per-partition puts, enumeration and deletion. Each
//! operation is atomic on its own; nothing orders operations of unrelated
//! requests.

use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::request::GatewayResponse;

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache `{cache}` is full ({limit} entries)")]
    QuotaExceeded { cache: String, limit: usize },
    #[error("cache backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// First entry for `key` across partitions, in partition creation order.
    async fn match_any(&self, key: &str) -> Option<GatewayResponse>;

    async fn get(&self, cache: &str, key: &str) -> Option<GatewayResponse>;

    /// Store `response` under `key`, creating the partition when missing and
    /// overwriting any previous entry.
    async fn put(
        &self,
        cache: &str,
        key: &str,
        response: GatewayResponse,
    ) -> Result<(), CacheStoreError>;

    async fn cache_names(&self) -> Vec<String>;

    /// Drop a whole partition; returns whether it existed.
    async fn delete(&self, cache: &str) -> bool;
}

#[derive(Default)]
struct Partition {
    name: String,
    entries: HashMap<String, GatewayResponse>,
}

/// Process-local [`CacheStorage`].
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    partitions: Arc<RwLock<Vec<Partition>>>,
    entry_limit: Option<NonZeroUsize>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every partition at `limit` entries; puts of new keys beyond it fail.
    pub fn with_entry_limit(mut self, limit: NonZeroUsize) -> Self {
        self.entry_limit = Some(limit);
        self
    }

    /// Number of entries in `cache`, zero when it does not exist.
    pub async fn len(&self, cache: &str) -> usize {
        let guard = self.partitions.read().await;
        guard
            .iter()
            .find(|partition| partition.name == cache)
            .map_or(0, |partition| partition.entries.len())
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn match_any(&self, key: &str) -> Option<GatewayResponse> {
        let guard = self.partitions.read().await;
        guard
            .iter()
            .find_map(|partition| partition.entries.get(key).cloned())
    }

    async fn get(&self, cache: &str, key: &str) -> Option<GatewayResponse> {
        let guard = self.partitions.read().await;
        guard
            .iter()
            .find(|partition| partition.name == cache)
            .and_then(|partition| partition.entries.get(key).cloned())
    }

    async fn put(
        &self,
        cache: &str,
        key: &str,
        response: GatewayResponse,
    ) -> Result<(), CacheStoreError> {
        let mut guard = self.partitions.write().await;
        let index = match guard.iter().position(|partition| partition.name == cache) {
            Some(index) => index,
            None => {
                guard.push(Partition {
                    name: cache.to_string(),
                    entries: HashMap::new(),
                });
                guard.len() - 1
            }
        };

        let partition = &mut guard[index];
        if let Some(limit) = self.entry_limit
            && !partition.entries.contains_key(key)
            && partition.entries.len() >= limit.get()
        {
            return Err(CacheStoreError::QuotaExceeded {
                cache: cache.to_string(),
                limit: limit.get(),
            });
        }

        partition.entries.insert(key.to_string(), response);
        Ok(())
    }

    async fn cache_names(&self) -> Vec<String> {
        let guard = self.partitions.read().await;
        guard
            .iter()
            .map(|partition| partition.name.clone())
            .collect()
    }

    async fn delete(&self, cache: &str) -> bool {
        let mut guard = self.partitions.write().await;
        let before = guard.len();
        guard.retain(|partition| partition.name != cache);
        guard.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_match_any_searches_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("first", "k", GatewayResponse::ok("one"))
            .await
            .expect("put");
        storage
            .put("second", "k", GatewayResponse::ok("two"))
            .await
            .expect("put");

        let hit = storage.match_any("k").await.expect("hit");
        assert_eq!(hit.body, "one");

        storage
            .put("first", "k", GatewayResponse::ok("uno"))
            .await
            .expect("put");
        let hit = storage.get("first", "k").await.expect("hit");
        assert_eq!(hit.body, "uno");
        assert_eq!(storage.len("first").await, 1);
    }

    #[tokio::test]
    async fn delete_removes_partition() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("legacy", "k", GatewayResponse::ok("x"))
            .await
            .expect("put");

        assert!(storage.delete("legacy").await);
        assert!(!storage.delete("legacy").await);
        assert!(storage.cache_names().await.is_empty());
        assert!(storage.match_any("k").await.is_none());
    }

    #[tokio::test]
    async fn entry_limit_rejects_new_keys_but_allows_overwrites() {
        let storage = MemoryCacheStorage::new().with_entry_limit(NonZeroUsize::MIN);
        storage
            .put("c", "a", GatewayResponse::ok("1"))
            .await
            .expect("put");
        storage
            .put("c", "a", GatewayResponse::ok("2"))
            .await
            .expect("overwrite");

        let err = storage
            .put("c", "b", GatewayResponse::ok("3"))
            .await
            .expect_err("quota");
        assert!(matches!(err, CacheStoreError::QuotaExceeded { limit: 1, .. }));
    }
}
