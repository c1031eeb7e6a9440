//! `reqwest` implementation of the grocer traits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use recipe_shopper_core::{ExternalProfileId, LocationId, ProductId};

use super::types::{
    ApiErrorBody, CartAddRequest, CartItem, LocationResponse, LocationsResponse, ProductsResponse,
    ProfileResponse, ProviderErrorBody, TokenGrant, TokenResponse,
};
use super::{
    ExternalAuthClient, ExternalCartClient, ExternalCatalogClient, ExternalIdentityClient,
    GrocerError,
};
use crate::config::GrocerConfig;
use crate::models::{LocationSnapshot, ProductSnapshot};

const AUTHORIZE_PATH: &str = "/v1/connect/oauth2/authorize";
const TOKEN_PATH: &str = "/v1/connect/oauth2/token";
const PROFILE_PATH: &str = "/v1/identity/profile";
const PRODUCTS_PATH: &str = "/v1/products";
const LOCATIONS_PATH: &str = "/v1/locations";
const CART_ADD_PATH: &str = "/v1/cart/add";

/// Scope of the application token used for catalog reads.
const CATALOG_SCOPE: &str = "product.compact";

/// Largest `filter.limit` the products endpoint accepts.
///
/// ID lookups above this are split into several requests, so a single batched
/// fetch may cost more than one upstream call. Searches return at most this
/// many products.
const MAX_PRODUCTS_PER_REQUEST: usize = 50;

/// Store chain offered by location search.
const LOCATION_CHAIN: &str = "KROGER";

/// Application tokens are dropped this long before the grocer expires them.
const APP_TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Longest error body kept in `GrocerError::Status`.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Cached `client_credentials` token.
#[derive(Clone)]
struct AppToken {
    token: SecretString,
    lifetime: Duration,
}

/// Expires each application token after its own lifetime.
struct AppTokenExpiry;

impl Expiry<&'static str, AppToken> for AppTokenExpiry {
    fn expire_after_create(
        &self,
        _key: &&'static str,
        value: &AppToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.lifetime)
    }
}

/// Client for the grocer REST API.
///
/// Cheap to clone; all clones share one connection pool and token cache.
#[derive(Clone)]
pub struct GrocerClient {
    inner: Arc<GrocerClientInner>,
}

struct GrocerClientInner {
    client: reqwest::Client,
    api_url: Url,
    client_id: String,
    client_secret: SecretString,
    app_tokens: Cache<&'static str, AppToken>,
}

impl GrocerClient {
    /// Create a new grocer API client.
    ///
    /// # Errors
    ///
    /// Returns `GrocerError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GrocerConfig) -> Result<Self, GrocerError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("recipe-shopper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let app_tokens = Cache::builder()
            .max_capacity(4)
            .expire_after(AppTokenExpiry)
            .build();

        Ok(Self {
            inner: Arc::new(GrocerClientInner {
                client,
                api_url: config.api_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                app_tokens,
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // OAuth Flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Build the authorize URL that starts the login flow.
    ///
    /// # Errors
    ///
    /// Returns `GrocerError::Url` if the configured API URL cannot be joined.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<String, GrocerError> {
        let mut url = self.endpoint(AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.inner.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "));
        Ok(url.into())
    }

    /// Post a grant to the token endpoint using HTTP Basic client authentication.
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, GrocerError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(TOKEN_PATH)?)
            .basic_auth(
                &self.inner.client_id,
                Some(self.inner.client_secret.expose_secret()),
            )
            .form(form)
            .send()
            .await?;

        let token: TokenResponse = decode(response, "token").await?;
        Ok(token.into())
    }

    /// Get an application token for catalog reads, reusing a cached one.
    async fn app_token(&self) -> Result<SecretString, GrocerError> {
        if let Some(cached) = self.inner.app_tokens.get(&CATALOG_SCOPE).await {
            return Ok(cached.token);
        }

        let grant = self
            .request_token(&[
                ("grant_type", "client_credentials"),
                ("scope", CATALOG_SCOPE),
            ])
            .await?;
        debug!(expires_in = grant.expires_in, "Application token issued");

        let token = grant.access_token;
        self.inner
            .app_tokens
            .insert(
                CATALOG_SCOPE,
                AppToken {
                    token: token.clone(),
                    lifetime: app_token_lifetime(grant.expires_in),
                },
            )
            .await;

        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, GrocerError> {
        Ok(self.inner.api_url.join(path)?)
    }

    async fn get_products_chunk(
        &self,
        token: &SecretString,
        ids: &[ProductId],
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        let mut url = self.endpoint(PRODUCTS_PATH)?;
        {
            let joined = ids.iter().map(ProductId::as_str).collect::<Vec<_>>().join(",");
            let mut query = url.query_pairs_mut();
            query
                .append_pair("filter.productId", &joined)
                .append_pair("filter.limit", &ids.len().to_string());
            if let Some(location_id) = location_id {
                query.append_pair("filter.locationId", location_id.as_str());
            }
        }

        self.fetch_products(token, url).await
    }

    async fn fetch_products(
        &self,
        token: &SecretString,
        url: Url,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let products: ProductsResponse = decode(response, "products").await?;
        Ok(products.data.into_iter().map(ProductSnapshot::from).collect())
    }
}

#[async_trait]
impl ExternalAuthClient for GrocerClient {
    #[instrument(skip_all)]
    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, GrocerError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, GrocerError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

#[async_trait]
impl ExternalIdentityClient for GrocerClient {
    #[instrument(skip_all)]
    async fn get_profile(&self, access_token: &str) -> Result<ExternalProfileId, GrocerError> {
        let response = self
            .inner
            .client
            .get(self.endpoint(PROFILE_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let profile: ProfileResponse = decode(response, "profile").await?;
        Ok(ExternalProfileId::new(profile.data.id))
    }
}

#[async_trait]
impl ExternalCatalogClient for GrocerClient {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_products(
        &self,
        ids: &[ProductId],
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.app_token().await?;
        let mut products = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_PRODUCTS_PER_REQUEST) {
            products.extend(self.get_products_chunk(&token, chunk, location_id).await?);
        }

        if products.len() < ids.len() {
            debug!(
                requested = ids.len(),
                returned = products.len(),
                "Grocer omitted unknown products"
            );
        }
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_location(&self, id: &LocationId) -> Result<LocationSnapshot, GrocerError> {
        let token = self.app_token().await?;
        let path = format!("{LOCATIONS_PATH}/{}", urlencoding::encode(id.as_str()));

        let response = self
            .inner
            .client
            .get(self.endpoint(&path)?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let location: LocationResponse = decode(response, "location").await?;
        Ok(location.data.into())
    }

    #[instrument(skip(self))]
    async fn search_products(
        &self,
        term: &str,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError> {
        let token = self.app_token().await?;
        let mut url = self.endpoint(PRODUCTS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("filter.term", term)
                .append_pair("filter.limit", &MAX_PRODUCTS_PER_REQUEST.to_string());
            if let Some(location_id) = location_id {
                query.append_pair("filter.locationId", location_id.as_str());
            }
        }

        self.fetch_products(&token, url).await
    }

    #[instrument(skip(self))]
    async fn search_locations(
        &self,
        zip_code: &str,
        radius_miles: u32,
    ) -> Result<Vec<LocationSnapshot>, GrocerError> {
        let token = self.app_token().await?;
        let mut url = self.endpoint(LOCATIONS_PATH)?;
        url.query_pairs_mut()
            .append_pair("filter.zipCode.near", zip_code)
            .append_pair("filter.radiusInMiles", &radius_miles.to_string())
            .append_pair("filter.chain", LOCATION_CHAIN);

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let locations: LocationsResponse = decode(response, "locations").await?;
        Ok(locations.data.into_iter().map(LocationSnapshot::from).collect())
    }
}

#[async_trait]
impl ExternalCartClient for GrocerClient {
    #[instrument(skip(self, access_token, items), fields(count = items.len()))]
    async fn add_to_cart(&self, access_token: &str, items: &[CartItem]) -> Result<(), GrocerError> {
        let response = self
            .inner
            .client
            .put(self.endpoint(CART_ADD_PATH)?)
            .bearer_auth(access_token)
            .json(&CartAddRequest { items })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let retry_after = retry_after_secs(&response);
        let body = response.bytes().await?;
        Err(error_from_body(status, &body, retry_after, "cart"))
    }
}

/// Decode a JSON body, or turn a non-success response into a `GrocerError`.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, GrocerError> {
    let status = response.status();
    let retry_after = retry_after_secs(&response);
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }
    Err(error_from_body(status, &body, retry_after, what))
}

fn retry_after_secs(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Classify an error response by its body shape.
fn error_from_body(status: StatusCode, body: &[u8], retry_after: u64, what: &str) -> GrocerError {
    if let Ok(provider) = serde_json::from_slice::<ProviderErrorBody>(body) {
        return GrocerError::OAuth {
            code: provider.error,
            description: provider.error_description,
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return GrocerError::RateLimited(retry_after);
    }

    if status == StatusCode::NOT_FOUND {
        return GrocerError::NotFound(what.to_string());
    }

    if let Ok(api) = serde_json::from_slice::<ApiErrorBody>(body) {
        return GrocerError::Api {
            status: status.as_u16(),
            code: api.errors.code,
            reason: api.errors.reason,
        };
    }

    let text = String::from_utf8_lossy(body);
    warn!(status = status.as_u16(), endpoint = what, "Unrecognized grocer error body");
    GrocerError::Status {
        status: status.as_u16(),
        body: text.chars().take(MAX_ERROR_BODY_LEN).collect(),
    }
}

/// How long to keep an application token that expires in `expires_in` seconds.
fn app_token_lifetime(expires_in: u64) -> Duration {
    let reported = Duration::from_secs(expires_in);
    if reported > APP_TOKEN_EXPIRY_MARGIN * 2 {
        reported - APP_TOKEN_EXPIRY_MARGIN
    } else {
        reported / 2
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::grocer::Modality;

    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GrocerClient {
        GrocerClient::new(&GrocerConfig {
            api_url: Url::parse(&server.uri()).unwrap(),
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("client-secret"),
            scopes: vec!["profile.compact".to_string()],
            redirect_uri: "http://localhost:8080/auth/callback".to_string(),
            http_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn token_body(access_token: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access_token,
            "refresh_token": "refresh-2",
            "token_type": "bearer",
            "expires_in": 1800
        })
    }

    async fn mount_app_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=product.compact"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("app-token")))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_authorization_url_carries_required_params() {
        let client = GrocerClient::new(&GrocerConfig {
            api_url: Url::parse("https://api.grocer.test").unwrap(),
            client_id: "abc".to_string(),
            client_secret: SecretString::from("s"),
            scopes: Vec::new(),
            redirect_uri: String::new(),
            http_timeout: Duration::from_secs(1),
        })
        .unwrap();

        let url = client
            .authorization_url(
                "https://shop.test/auth/callback",
                &["cart.basic:write".to_string(), "profile.compact".to_string()],
            )
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.path(), AUTHORIZE_PATH);
        assert!(pairs.contains(&("client_id".into(), "abc".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://shop.test/auth/callback".into()
        )));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("scope".into(), "cart.basic:write profile.compact".into())));
    }

    #[test]
    fn test_app_token_lifetime_keeps_margin() {
        assert_eq!(app_token_lifetime(1800), Duration::from_secs(1740));
        assert_eq!(app_token_lifetime(60), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            // base64("client-id:client-secret")
            .and(header(
                "authorization",
                "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=",
            ))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1")))
            .expect(1)
            .mount(&server)
            .await;

        let grant = client_for(&server)
            .exchange_authorization_code("abc", "http://localhost:8080/auth/callback")
            .await
            .unwrap();

        assert_eq!(grant.access_token.expose_secret(), "access-1");
        assert_eq!(
            grant.refresh_token.as_ref().map(ExposeSecret::expose_secret),
            Some("refresh-2")
        );
        assert_eq!(grant.expires_in, 1800);
    }

    #[tokio::test]
    async fn test_refresh_decodes_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "refresh token expired"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).refresh("stale").await.unwrap_err();
        match err {
            GrocerError::OAuth { code, description } => {
                assert_eq!(code, "invalid_grant");
                assert_eq!(description, "refresh token expired");
            }
            other => panic!("expected OAuth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_profile_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "8bd0d5b1-8a0e-4d8a-9d8e-7a0c1f1b2c3d"},
                "meta": {}
            })))
            .mount(&server)
            .await;

        let profile = client_for(&server).get_profile("user-token").await.unwrap();
        assert_eq!(profile.as_str(), "8bd0d5b1-8a0e-4d8a-9d8e-7a0c1f1b2c3d");
    }

    #[tokio::test]
    async fn test_get_products_filters_by_ids_and_location() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(header("authorization", "Bearer app-token"))
            .and(query_param("filter.productId", "p1,p2"))
            .and(query_param("filter.locationId", "01400943"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"productId": "p1", "brand": "A", "description": "Apples", "items": [{"size": "3 lb"}]},
                    {"productId": "p2", "brand": "B", "description": "Bread", "items": []}
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let ids = [ProductId::new("p1"), ProductId::new("p2")];
        let location = LocationId::new("01400943");

        // The second call reuses the cached application token.
        for _ in 0..2 {
            let products = client.get_products(&ids, Some(&location)).await.unwrap();
            assert_eq!(products.len(), 2);
            assert_eq!(products[0].size, "3 lb");
        }
    }

    #[tokio::test]
    async fn test_get_products_splits_lookups_over_the_limit() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(query_param("filter.limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(query_param("filter.limit", "1"))
            .and(query_param("filter.productId", "p50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"productId": "p50"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids: Vec<ProductId> = (0..=MAX_PRODUCTS_PER_REQUEST)
            .map(|i| ProductId::new(format!("p{i}")))
            .collect();
        let products = client_for(&server).get_products(&ids, None).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "p50");
    }

    #[tokio::test]
    async fn test_get_products_empty_makes_no_calls() {
        let server = MockServer::start().await;
        mount_app_token(&server, 0).await;

        let products = client_for(&server).get_products(&[], None).await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_search_products_by_term() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(header("authorization", "Bearer app-token"))
            .and(query_param("filter.term", "whole milk"))
            .and(query_param("filter.limit", "50"))
            .and(query_param("filter.locationId", "01400943"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"productId": "0001111041700", "brand": "Kroger", "description": "Whole Milk", "items": [{"size": "1 gal"}]}
                ],
                "meta": {"pagination": {"start": 0, "limit": 50, "total": 1}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let products = client_for(&server)
            .search_products("whole milk", Some(&LocationId::new("01400943")))
            .await
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "0001111041700");
        assert_eq!(products[0].size, "1 gal");
    }

    #[tokio::test]
    async fn test_search_locations_near_zip_code() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(LOCATIONS_PATH))
            .and(query_param("filter.zipCode.near", "45202"))
            .and(query_param("filter.radiusInMiles", "5"))
            .and(query_param("filter.chain", "KROGER"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "locationId": "01400943",
                        "name": "Kroger - Downtown",
                        "address": {"addressLine1": "100 E Court St", "city": "Cincinnati", "state": "OH", "zipCode": "45202"}
                    },
                    {"locationId": "01400376", "name": "Kroger - Corryville"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let locations = client_for(&server)
            .search_locations("45202", 5)
            .await
            .unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].address, "100 E Court St Cincinnati OH 45202");
        assert_eq!(locations[1].id.as_str(), "01400376");
        assert_eq!(locations[1].address, "");
    }

    #[tokio::test]
    async fn test_get_location_not_found() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/locations/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errors": {"timestamp": 1, "code": "NOT_FOUND", "reason": "no such location"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_location(&LocationId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, GrocerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_api_error_is_structured() {
        let server = MockServer::start().await;
        mount_app_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/locations/01400943"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "errors": {"timestamp": 1, "code": "API-5000", "reason": "upstream failure"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_location(&LocationId::new("01400943"))
            .await
            .unwrap_err();
        assert!(matches!(err, GrocerError::Api { status: 500, ref code, .. } if code == "API-5000"));
    }

    #[tokio::test]
    async fn test_add_to_cart_puts_items() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CART_ADD_PATH))
            .and(header("authorization", "Bearer user-token"))
            .and(body_json(serde_json::json!({
                "items": [{"upc": "0001111041700", "quantity": 3, "modality": "PICKUP"}]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let items = [CartItem {
            product_id: ProductId::new("0001111041700"),
            quantity: 3,
            modality: Modality::Pickup,
        }];
        client_for(&server)
            .add_to_cart("user-token", &items)
            .await
            .unwrap();
    }
}
