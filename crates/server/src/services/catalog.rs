//! Cache-aside access to the grocer catalog.
//!
//! [`CatalogGateway`] serves products and locations from the [`CatalogCache`]
//! and fetches only the misses from the grocer, in a single batched call. A
//! failing cache read degrades to a full miss. A failing upstream fetch, or a
//! requested product the grocer does not return, fails the whole request.
//! Searches go straight to the grocer and warm the cache with their results.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use recipe_shopper_core::{LocationId, ProductId};

use crate::cache::{CacheError, CatalogCache, ProductLookup};
use crate::grocer::{ExternalCatalogClient, GrocerError};
use crate::models::{LocationSnapshot, ProductSnapshot};

/// Errors from catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The grocer fetch for cache misses failed.
    #[error("upstream error: {0}")]
    Upstream(#[from] GrocerError),

    /// Fetched snapshots could not be written back to the cache.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The grocer returned no product for these IDs.
    #[error("products unavailable: {}", join_ids(.0))]
    Unavailable(Vec<ProductId>),
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter().map(ProductId::as_str).collect::<Vec<_>>().join(", ")
}

/// Catalog reads backed by the cache and the grocer.
#[derive(Clone)]
pub struct CatalogGateway {
    cache: CatalogCache,
    client: Arc<dyn ExternalCatalogClient>,
}

impl CatalogGateway {
    /// Create a gateway over `cache` and `client`.
    #[must_use]
    pub fn new(cache: CatalogCache, client: Arc<dyn ExternalCatalogClient>) -> Self {
        Self { cache, client }
    }

    /// Get products by ID, keyed by ID.
    ///
    /// Every requested ID is present in the result. Pricing and availability
    /// depend on `location_id`, but cached snapshots do not, so it only
    /// affects the upstream fetch.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upstream` if fetching misses fails,
    /// `CatalogError::Unavailable` if the grocer omits any of them, and
    /// `CatalogError::Cache` if the fetched products cannot be stored.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn get_products(
        &self,
        ids: &[ProductId],
        location_id: Option<&LocationId>,
    ) -> Result<HashMap<ProductId, ProductSnapshot>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ProductLookup { hits, misses } = match self.cache.retrieve_products(ids).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(error = %e, "Product cache read failed, fetching all from grocer");
                ProductLookup {
                    hits: Vec::new(),
                    misses: dedup(ids),
                }
            }
        };

        let mut products: HashMap<ProductId, ProductSnapshot> =
            hits.into_iter().map(|p| (p.id.clone(), p)).collect();
        if misses.is_empty() {
            return Ok(products);
        }

        let fetched = self.client.get_products(&misses, location_id).await?;
        debug!(
            requested = misses.len(),
            found = fetched.len(),
            "Fetched products from grocer"
        );
        self.cache.store_products(&fetched).await?;

        products.extend(fetched.into_iter().map(|p| (p.id.clone(), p)));
        let unavailable: Vec<ProductId> = misses
            .into_iter()
            .filter(|id| !products.contains_key(id))
            .collect();
        if !unavailable.is_empty() {
            warn!(ids = %join_ids(&unavailable), "Grocer omitted requested products");
            return Err(CatalogError::Unavailable(unavailable));
        }
        Ok(products)
    }

    /// Search products by term and cache the results.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upstream` if the search fails and
    /// `CatalogError::Cache` if the results cannot be stored.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        term: &str,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, CatalogError> {
        let products = self.client.search_products(term, location_id).await?;
        debug!(found = products.len(), "Product search");
        self.cache.store_products(&products).await?;
        Ok(products)
    }

    /// Find stores near a zip code and cache them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upstream` if the search fails and
    /// `CatalogError::Cache` if the results cannot be stored.
    #[instrument(skip(self))]
    pub async fn search_locations(
        &self,
        zip_code: &str,
        radius_miles: u32,
    ) -> Result<Vec<LocationSnapshot>, CatalogError> {
        let locations = self
            .client
            .search_locations(zip_code, radius_miles)
            .await?;
        debug!(found = locations.len(), "Location search");
        self.cache.store_locations(&locations).await?;
        Ok(locations)
    }

    /// Get a store location.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Upstream` (including `GrocerError::NotFound`) if
    /// the location is not cached and the grocer fetch fails, and
    /// `CatalogError::Cache` if the fetched location cannot be stored.
    #[instrument(skip(self), fields(location_id = %id))]
    pub async fn get_location(&self, id: &LocationId) -> Result<LocationSnapshot, CatalogError> {
        match self.cache.retrieve_location(id).await {
            Ok(Some(location)) => return Ok(location),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Location cache read failed, fetching from grocer"),
        }

        let location = self.client.get_location(id).await?;
        self.cache.store_location(&location).await?;
        Ok(location)
    }
}

fn dedup(ids: &[ProductId]) -> Vec<ProductId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}
