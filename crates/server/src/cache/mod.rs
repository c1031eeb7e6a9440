//! Catalog cache.
//!
//! Product and location snapshots are cached under two namespaces, each with
//! its own TTL. Every write resets the TTL of exactly the keys written, in the
//! same atomic step as the write itself. Entries are advisory: a missing or
//! undecodable entry is reported as a miss and refilled from the grocer.
//!
//! Storage is delegated to a [`CacheBackend`]:
//! - [`MemoryBackend`] - in-process `moka` cache (default)
//! - [`RedisBackend`] - one Redis hash per namespace with per-field expiry

mod memory;
mod redis;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use recipe_shopper_core::{LocationId, ProductId};

use crate::models::{LocationSnapshot, ProductSnapshot};

/// Errors from cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis command or connection failed.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A snapshot could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key space of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Products,
    Locations,
}

impl Namespace {
    /// Hash name used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Locations => "locations",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw storage for namespaced, individually expiring string entries.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Upsert `entries` and set their TTL to `ttl` as one atomic unit.
    async fn hset_with_ttl(
        &self,
        namespace: Namespace,
        entries: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Fetch `keys`, returning one slot per key in the same order.
    async fn hmget(
        &self,
        namespace: Namespace,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, CacheError>;
}

/// Outcome of looking up a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// Present but undecodable, or stored under the wrong key.
    Corrupt,
}

impl<T> CacheLookup<T> {
    /// Collapse to an `Option`, treating corruption as a miss.
    pub fn into_hit(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Corrupt => None,
        }
    }
}

/// Products found in the cache and the IDs that must be fetched.
#[derive(Debug, Default)]
pub struct ProductLookup {
    pub hits: Vec<ProductSnapshot>,
    pub misses: Vec<ProductId>,
}

/// Cache of grocer catalog snapshots.
#[derive(Clone)]
pub struct CatalogCache {
    backend: Arc<dyn CacheBackend>,
    product_ttl: Duration,
    location_ttl: Duration,
}

impl CatalogCache {
    /// Create a catalog cache over `backend`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        product_ttl: Duration,
        location_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            product_ttl,
            location_ttl,
        }
    }

    /// Store a batch of products and reset their TTL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the backend write fails.
    pub async fn store_products(&self, products: &[ProductSnapshot]) -> Result<(), CacheError> {
        if products.is_empty() {
            return Ok(());
        }

        let entries = products
            .iter()
            .map(|p| Ok((p.id.as_str().to_owned(), serde_json::to_string(p)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;

        self.backend
            .hset_with_ttl(Namespace::Products, entries, self.product_ttl)
            .await?;
        debug!(count = products.len(), "Stored products in cache");
        Ok(())
    }

    /// Look up products, reporting each key's outcome.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend read fails.
    pub async fn lookup_products(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<(ProductId, CacheLookup<ProductSnapshot>)>, CacheError> {
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let values = self
            .lookup::<ProductSnapshot>(Namespace::Products, &keys)
            .await?;

        Ok(ids
            .iter()
            .cloned()
            .zip(values)
            .map(|(id, lookup)| {
                let lookup = match lookup {
                    CacheLookup::Hit(product) if product_matches(&product, &id) => {
                        CacheLookup::Hit(product)
                    }
                    CacheLookup::Hit(_) => CacheLookup::Corrupt,
                    other => other,
                };
                (id, lookup)
            })
            .collect())
    }

    /// Split `ids` into cached products and IDs that must be fetched.
    ///
    /// Duplicate IDs are looked up once. Corrupt entries count as misses.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend read fails.
    pub async fn retrieve_products(&self, ids: &[ProductId]) -> Result<ProductLookup, CacheError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<ProductId> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
        if unique.is_empty() {
            return Ok(ProductLookup::default());
        }

        let mut result = ProductLookup::default();
        let mut corrupt = 0_usize;
        for (id, lookup) in self.lookup_products(&unique).await? {
            match lookup {
                CacheLookup::Hit(product) => result.hits.push(product),
                CacheLookup::Miss => result.misses.push(id),
                CacheLookup::Corrupt => {
                    corrupt += 1;
                    result.misses.push(id);
                }
            }
        }

        debug!(
            hits = result.hits.len(),
            misses = result.misses.len(),
            corrupt,
            "Product cache lookup"
        );
        Ok(result)
    }

    /// Store a location and reset its TTL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the backend write fails.
    pub async fn store_location(&self, location: &LocationSnapshot) -> Result<(), CacheError> {
        self.store_locations(std::slice::from_ref(location)).await
    }

    /// Store a batch of locations and reset their TTL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the backend write fails.
    pub async fn store_locations(&self, locations: &[LocationSnapshot]) -> Result<(), CacheError> {
        if locations.is_empty() {
            return Ok(());
        }

        let entries = locations
            .iter()
            .map(|l| Ok((l.id.as_str().to_owned(), serde_json::to_string(l)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;

        self.backend
            .hset_with_ttl(Namespace::Locations, entries, self.location_ttl)
            .await
    }

    /// Look up a location, reporting the outcome.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend read fails.
    pub async fn lookup_location(
        &self,
        id: &LocationId,
    ) -> Result<CacheLookup<LocationSnapshot>, CacheError> {
        let keys = [id.as_str().to_owned()];
        let lookup = self
            .lookup::<LocationSnapshot>(Namespace::Locations, &keys)
            .await?
            .into_iter()
            .next()
            .unwrap_or(CacheLookup::Miss);

        Ok(match lookup {
            CacheLookup::Hit(location) if location.id != *id => CacheLookup::Corrupt,
            other => other,
        })
    }

    /// Get a cached location. Corrupt entries count as a miss.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend read fails.
    pub async fn retrieve_location(
        &self,
        id: &LocationId,
    ) -> Result<Option<LocationSnapshot>, CacheError> {
        let lookup = self.lookup_location(id).await?;
        if lookup == CacheLookup::Corrupt {
            warn!(location_id = %id, "Discarding corrupt cached location");
        }
        Ok(lookup.into_hit())
    }

    async fn lookup<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        keys: &[String],
    ) -> Result<Vec<CacheLookup<T>>, CacheError> {
        let values = self.backend.hmget(namespace, keys).await?;
        Ok(values
            .into_iter()
            .map(|value| match value {
                None => CacheLookup::Miss,
                Some(raw) => decode(namespace, &raw),
            })
            .collect())
    }
}

fn decode<T: DeserializeOwned>(namespace: Namespace, raw: &str) -> CacheLookup<T> {
    match serde_json::from_str(raw) {
        Ok(value) => CacheLookup::Hit(value),
        Err(e) => {
            debug!(%namespace, error = %e, "Undecodable cache entry");
            CacheLookup::Corrupt
        }
    }
}

fn product_matches(product: &ProductSnapshot, id: &ProductId) -> bool {
    product.id == *id
}
