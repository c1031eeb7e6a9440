//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::{CacheBackend, CacheError, CatalogCache, MemoryBackend, RedisBackend};
use crate::config::ServerConfig;
use crate::db::{AccountRepository, AccountStore, SessionRepository, SessionStore};
use crate::grocer::{
    ExternalAuthClient, ExternalCartClient, ExternalCatalogClient, ExternalIdentityClient,
    GrocerClient, GrocerError,
};
use crate::services::{AuthSessionResolver, CatalogGateway};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("grocer client: {0}")]
    Grocer(#[from] GrocerError),
    #[error("catalog cache: {0}")]
    Cache(#[from] CacheError),
}

/// Collaborators injected into the state.
///
/// [`AppState::new`] wires the production implementations; tests supply fakes.
pub struct Services {
    pub auth: Arc<dyn ExternalAuthClient>,
    pub identity: Arc<dyn ExternalIdentityClient>,
    pub catalog: Arc<dyn ExternalCatalogClient>,
    pub cart: Arc<dyn ExternalCartClient>,
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub cache: Arc<dyn CacheBackend>,
    /// Grocer authorize URL that starts the login flow.
    pub login_url: String,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    resolver: AuthSessionResolver,
    gateway: CatalogGateway,
    accounts: Arc<dyn AccountStore>,
    cart: Arc<dyn ExternalCartClient>,
    login_url: String,
}

impl AppState {
    /// Create the application state with production collaborators.
    ///
    /// The catalog cache uses Redis when `REDIS_URL` is configured and an
    /// in-process cache otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the grocer client cannot be built or Redis is
    /// unreachable.
    pub async fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let grocer = Arc::new(GrocerClient::new(&config.grocer)?);
        let login_url =
            grocer.authorization_url(&config.grocer.redirect_uri, &config.grocer.scopes)?;

        let cache: Arc<dyn CacheBackend> = match &config.catalog.redis_url {
            Some(url) => {
                tracing::info!("Using Redis catalog cache");
                Arc::new(RedisBackend::connect(url).await?)
            }
            None => {
                tracing::info!(
                    capacity = config.catalog.capacity,
                    "Using in-process catalog cache"
                );
                Arc::new(MemoryBackend::new(config.catalog.capacity))
            }
        };

        let services = Services {
            auth: grocer.clone(),
            identity: grocer.clone(),
            catalog: grocer.clone(),
            cart: grocer,
            accounts: Arc::new(AccountRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            cache,
            login_url,
        };

        Ok(Self::with_services(config, pool, services))
    }

    /// Create the application state from explicit collaborators.
    #[must_use]
    pub fn with_services(config: ServerConfig, pool: PgPool, services: Services) -> Self {
        let resolver = AuthSessionResolver::new(
            services.auth,
            services.identity,
            services.accounts.clone(),
            services.sessions,
        );
        let cache = CatalogCache::new(
            services.cache,
            config.catalog.product_ttl,
            config.catalog.location_ttl,
        );
        let gateway = CatalogGateway::new(cache, services.catalog);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                resolver,
                gateway,
                accounts: services.accounts,
                cart: services.cart,
                login_url: services.login_url,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the auth session resolver.
    #[must_use]
    pub fn resolver(&self) -> &AuthSessionResolver {
        &self.inner.resolver
    }

    /// Get the catalog gateway.
    #[must_use]
    pub fn gateway(&self) -> &CatalogGateway {
        &self.inner.gateway
    }

    /// Get the account store.
    #[must_use]
    pub fn accounts(&self) -> &dyn AccountStore {
        self.inner.accounts.as_ref()
    }

    /// Get the grocer cart client.
    #[must_use]
    pub fn cart(&self) -> &dyn ExternalCartClient {
        self.inner.cart.as_ref()
    }

    /// Get the grocer authorize URL that starts the login flow.
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.inner.login_url
    }
}
