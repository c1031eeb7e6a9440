//! In-process cache backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::{CacheBackend, CacheError, Namespace};

type Key = (Namespace, String);

#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Duration,
}

/// Gives each entry the TTL it was written with, on insert and on overwrite.
struct EntryExpiry;

impl Expiry<Key, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &Key,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &Key,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// `moka`-backed [`CacheBackend`] keyed by `(namespace, key)`.
///
/// Each insert carries its TTL, so an entry is never visible without one.
#[derive(Clone)]
pub struct MemoryBackend {
    cache: Cache<Key, Entry>,
}

impl MemoryBackend {
    /// Create a backend holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn hset_with_ttl(
        &self,
        namespace: Namespace,
        entries: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        for (key, value) in entries {
            self.cache
                .insert(
                    (namespace, key),
                    Entry {
                        value: Arc::from(value),
                        ttl,
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn hmget(
        &self,
        namespace: Namespace,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = self.cache.get(&(namespace, key.clone())).await;
            values.push(entry.map(|e| e.value.to_string()));
        }
        Ok(values)
    }
}
