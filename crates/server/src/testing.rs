//! In-memory fakes for the grocer client and stores.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use recipe_shopper_core::{
    AccountId, ExternalProfileId, ImageSize, LocationId, ProductId, SessionId,
};

use crate::cache::{CacheBackend, CacheError, MemoryBackend, Namespace};
use crate::config::{CatalogConfig, GrocerConfig, ServerConfig};
use crate::db::{AccountPredicate, AccountStore, RepositoryError, SessionStore};
use crate::grocer::{
    CartItem, ExternalAuthClient, ExternalCartClient, ExternalCatalogClient,
    ExternalIdentityClient, GrocerError, TokenGrant,
};
use crate::models::{Account, LocationSnapshot, ProductSnapshot, Session};
use crate::state::{AppState, Services};

fn rejected() -> GrocerError {
    GrocerError::OAuth {
        code: "invalid_grant".to_string(),
        description: "rejected by fake".to_string(),
    }
}

/// Scriptable grocer that counts calls.
pub struct FakeGrocer {
    profile: Mutex<Option<String>>,
    grant: Mutex<(String, Option<String>, u64)>,
    fail_refresh: AtomicBool,
    fail_exchange: AtomicBool,
    fail_catalog: AtomicBool,
    refresh_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    exchanged: Mutex<Vec<String>>,
    products: Mutex<HashMap<ProductId, ProductSnapshot>>,
    locations: Mutex<HashMap<LocationId, LocationSnapshot>>,
    product_fetches: Mutex<Vec<Vec<ProductId>>>,
    location_fetches: AtomicUsize,
    product_searches: Mutex<Vec<String>>,
    location_searches: Mutex<Vec<(String, u32)>>,
    carts: Mutex<Vec<(String, Vec<CartItem>)>>,
}

impl Default for FakeGrocer {
    fn default() -> Self {
        Self {
            profile: Mutex::new(Some("ext-default".to_string())),
            grant: Mutex::new(("access-fresh".to_string(), None, 1800)),
            fail_refresh: AtomicBool::new(false),
            fail_exchange: AtomicBool::new(false),
            fail_catalog: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            exchanged: Mutex::new(Vec::new()),
            products: Mutex::new(HashMap::new()),
            locations: Mutex::new(HashMap::new()),
            product_fetches: Mutex::new(Vec::new()),
            location_fetches: AtomicUsize::new(0),
            product_searches: Mutex::new(Vec::new()),
            location_searches: Mutex::new(Vec::new()),
            carts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGrocer {
    pub fn set_profile(&self, id: &str) {
        *self.profile.lock().unwrap() = Some(id.to_string());
    }

    pub fn fail_profile(&self) {
        *self.profile.lock().unwrap() = None;
    }

    pub fn set_grant(&self, access: &str, refresh: Option<&str>, expires_in: u64) {
        *self.grant.lock().unwrap() = (
            access.to_string(),
            refresh.map(ToString::to_string),
            expires_in,
        );
    }

    pub fn fail_refresh(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    pub fn fail_exchange(&self) {
        self.fail_exchange.store(true, Ordering::SeqCst);
    }

    pub fn fail_catalog(&self) {
        self.fail_catalog.store(true, Ordering::SeqCst);
    }

    pub fn add_product(&self, id: &str) -> ProductSnapshot {
        let product = ProductSnapshot {
            id: ProductId::new(id),
            brand: "Brand".to_string(),
            description: format!("Product {id}"),
            size: "1 each".to_string(),
            url: format!("/p/{id}"),
        };
        self.products
            .lock()
            .unwrap()
            .insert(product.id.clone(), product.clone());
        product
    }

    pub fn add_location(&self, id: &str) -> LocationSnapshot {
        let location = LocationSnapshot {
            id: LocationId::new(id),
            name: format!("Store {id}"),
            address: "1 Main St Cincinnati OH 45202".to_string(),
        };
        self.locations
            .lock()
            .unwrap()
            .insert(location.id.clone(), location.clone());
        location
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged.lock().unwrap().clone()
    }

    pub fn product_fetches(&self) -> Vec<Vec<ProductId>> {
        self.product_fetches.lock().unwrap().clone()
    }

    pub fn location_fetches(&self) -> usize {
        self.location_fetches.load(Ordering::SeqCst)
    }

    pub fn product_searches(&self) -> Vec<String> {
        self.product_searches.lock().unwrap().clone()
    }

    pub fn location_searches(&self) -> Vec<(String, u32)> {
        self.location_searches.lock().unwrap().clone()
    }

    pub fn carts(&self) -> Vec<(String, Vec<CartItem>)> {
        self.carts.lock().unwrap().clone()
    }

    fn check_catalog(&self) -> Result<(), GrocerError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(GrocerError::Status {
                status: 503,
                body: String::new(),
            });
        }
        Ok(())
    }

    fn grant(&self) -> TokenGrant {
        let (access, refresh, expires_in) = self.grant.lock().unwrap().clone();
        TokenGrant {
            access_token: SecretString::from(access),
            refresh_token: refresh.map(SecretString::from),
            expires_in,
        }
    }
}

#[async_trait]
impl ExternalAuthClient for FakeGrocer {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenGrant, GrocerError> {
        self.exchanged.lock().unwrap().push(code.to_string());
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        let mut grant = self.grant();
        if grant.refresh_token.is_none() {
            grant.refresh_token = Some(SecretString::from("refresh-fresh"));
        }
        Ok(grant)
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, GrocerError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(self.grant())
    }
}

#[async_trait]
impl ExternalIdentityClient for FakeGrocer {
    async fn get_profile(&self, _access_token: &str) -> Result<ExternalProfileId, GrocerError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile
            .lock()
            .unwrap()
            .clone()
            .map(ExternalProfileId::new)
            .ok_or(GrocerError::Status {
                status: 401,
                body: String::new(),
            })
    }
}

#[async_trait]
impl ExternalCatalogClient for FakeGrocer {
    async fn get_products(
        &self,
        ids: &[ProductId],
        _location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        self.product_fetches.lock().unwrap().push(ids.to_vec());
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(GrocerError::Status {
                status: 503,
                body: String::new(),
            });
        }
        let products = self.products.lock().unwrap();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn get_location(&self, id: &LocationId) -> Result<LocationSnapshot, GrocerError> {
        self.location_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(GrocerError::Status {
                status: 503,
                body: String::new(),
            });
        }
        self.locations
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GrocerError::NotFound(format!("location {id}")))
    }

    /// Matches `term` against descriptions, case-insensitively.
    async fn search_products(
        &self,
        term: &str,
        _location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        self.product_searches.lock().unwrap().push(term.to_string());
        self.check_catalog()?;
        let term = term.to_lowercase();
        let mut found: Vec<ProductSnapshot> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.description.to_lowercase().contains(&term))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    /// Every known location is near every zip code.
    async fn search_locations(
        &self,
        zip_code: &str,
        radius_miles: u32,
    ) -> Result<Vec<LocationSnapshot>, GrocerError> {
        self.location_searches
            .lock()
            .unwrap()
            .push((zip_code.to_string(), radius_miles));
        self.check_catalog()?;
        let mut found: Vec<LocationSnapshot> =
            self.locations.lock().unwrap().values().cloned().collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

#[async_trait]
impl ExternalCartClient for FakeGrocer {
    async fn add_to_cart(&self, access_token: &str, items: &[CartItem]) -> Result<(), GrocerError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(GrocerError::Status {
                status: 503,
                body: String::new(),
            });
        }
        self.carts
            .lock()
            .unwrap()
            .push((access_token.to_string(), items.to_vec()));
        Ok(())
    }
}

/// Account store backed by a map.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: Mutex<HashMap<AccountId, Account>>,
    conflict_on: Mutex<Option<String>>,
}

impl MemoryAccounts {
    pub fn insert(&self, profile_id: &str) -> Account {
        let account = Account {
            id: AccountId::new(uuid::Uuid::new_v4()),
            external_profile_id: ExternalProfileId::new(profile_id),
            location_id: None,
            image_size: ImageSize::default(),
            created_at: Utc::now(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        account
    }

    /// Make the next `create` for `profile_id` lose a race to another writer.
    pub fn conflict_next_create(&self, profile_id: &str) {
        *self.conflict_on.lock().unwrap() = Some(profile_id.to_string());
    }

    pub fn count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn by_profile(&self, profile_id: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.external_profile_id.as_str() == profile_id)
            .cloned()
    }

    pub fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }

    fn update(
        &self,
        id: AccountId,
        apply: impl FnOnce(&mut Account),
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply(account);
        Ok(account.clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find(&self, predicate: &AccountPredicate) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(match predicate {
            AccountPredicate::Id(id) => accounts.get(id).cloned(),
            AccountPredicate::ExternalProfileId(profile_id) => accounts
                .values()
                .find(|a| a.external_profile_id == *profile_id)
                .cloned(),
        })
    }

    async fn create(
        &self,
        external_profile_id: &ExternalProfileId,
    ) -> Result<Account, RepositoryError> {
        let racing = self.conflict_on.lock().unwrap().take();
        if racing.as_deref() == Some(external_profile_id.as_str()) {
            self.insert(external_profile_id.as_str());
            return Err(RepositoryError::Conflict("account already exists".to_string()));
        }
        if self.by_profile(external_profile_id.as_str()).is_some() {
            return Err(RepositoryError::Conflict("account already exists".to_string()));
        }
        Ok(self.insert(external_profile_id.as_str()))
    }

    async fn set_location(
        &self,
        id: AccountId,
        location_id: Option<&LocationId>,
    ) -> Result<Account, RepositoryError> {
        self.update(id, |a| a.location_id = location_id.cloned())
    }

    async fn set_image_size(
        &self,
        id: AccountId,
        image_size: ImageSize,
    ) -> Result<Account, RepositoryError> {
        self.update(id, |a| a.image_size = image_size)
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.accounts.lock().unwrap().remove(&id).is_some())
    }
}

/// Session store backed by a map.
#[derive(Default)]
pub struct MemorySessions {
    sessions: Mutex<HashMap<SessionId, Session>>,
    fail_writes: AtomicBool,
    orphaned: AtomicBool,
}

impl MemorySessions {
    /// Make `create` and `delete` fail with a database error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Make `create` fail as if the account was deleted concurrently.
    pub fn orphan_creates(&self) {
        self.orphaned.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().unwrap().contains_key(&id)
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn create(&self, account_id: AccountId) -> Result<Session, RepositoryError> {
        self.check_writable()?;
        if self.orphaned.load(Ordering::SeqCst) {
            return Err(RepositoryError::NotFound);
        }
        let session = Session {
            id: SessionId::new(uuid::Uuid::new_v4()),
            account_id,
            created_at: Utc::now(),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn delete(&self, id: SessionId) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        Ok(self.sessions.lock().unwrap().remove(&id).is_some())
    }
}

/// Cache backend whose every call fails.
pub struct BrokenBackend;

#[async_trait]
impl CacheBackend for BrokenBackend {
    async fn hset_with_ttl(
        &self,
        _namespace: Namespace,
        _entries: Vec<(String, String)>,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(broken())
    }

    async fn hmget(
        &self,
        _namespace: Namespace,
        _keys: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        Err(broken())
    }
}

fn broken() -> CacheError {
    CacheError::Redis(::redis::RedisError::from((
        ::redis::ErrorKind::IoError,
        "connection refused",
    )))
}

/// Configuration with test values and an in-process cache.
pub fn config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/recipe_shopper_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 8080,
        base_url: "https://shop.test".to_string(),
        request_timeout: Duration::from_secs(30),
        grocer: GrocerConfig {
            api_url: "https://grocer.test".parse().unwrap(),
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("client-secret"),
            scopes: vec!["profile.compact".to_string()],
            redirect_uri: "https://shop.test/auth/callback".to_string(),
            http_timeout: Duration::from_secs(5),
        },
        catalog: CatalogConfig {
            product_ttl: Duration::from_secs(60),
            location_ttl: Duration::from_secs(60),
            capacity: 1000,
            redis_url: None,
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Application state over the given fakes.
///
/// The database pool is lazy and never connected.
pub fn state(
    grocer: &Arc<FakeGrocer>,
    accounts: &Arc<MemoryAccounts>,
    sessions: &Arc<MemorySessions>,
    login_url: &str,
) -> AppState {
    let config = config();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(config.database_url.expose_secret())
        .unwrap();
    let services = Services {
        auth: grocer.clone(),
        identity: grocer.clone(),
        catalog: grocer.clone(),
        cart: grocer.clone(),
        accounts: accounts.clone(),
        sessions: sessions.clone(),
        cache: Arc::new(MemoryBackend::new(config.catalog.capacity)),
        login_url: login_url.to_string(),
    };
    AppState::with_services(config, pool, services)
}
