//! Grocer REST API client.
//!
//! The grocer is the identity provider and the source of truth for catalog
//! data. All calls go through [`GrocerClient`], which implements the
//! `External*Client` traits so the auth resolver and catalog gateway can be
//! tested against fakes.
//!
//! # OAuth Flow
//!
//! 1. Redirect the user to [`GrocerClient::authorization_url`]
//! 2. The grocer redirects back to `/auth/callback` with an authorization code
//! 3. Exchange the code with [`ExternalAuthClient::exchange_authorization_code`]
//! 4. Use the access token for identity and cart calls; refresh it with
//!    [`ExternalAuthClient::refresh`] when it expires
//!
//! Catalog calls do not act on behalf of a user. They use an application token
//! from the `client_credentials` grant, cached until shortly before it expires.

mod client;
pub mod types;

pub use client::GrocerClient;
pub use types::{CartItem, Modality, TokenGrant};

use async_trait::async_trait;
use thiserror::Error;

use recipe_shopper_core::{ExternalProfileId, LocationId, ProductId};

use crate::models::{LocationSnapshot, ProductSnapshot};

/// Errors that can occur when calling the grocer API.
#[derive(Debug, Error)]
pub enum GrocerError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The token endpoint rejected a grant.
    #[error("OAuth error: {code} - {description}")]
    OAuth { code: String, description: String },

    /// An API endpoint returned a structured error.
    #[error("API error ({status}): {code} - {reason}")]
    Api {
        status: u16,
        code: String,
        reason: String,
    },

    /// Non-success response without a recognizable error body.
    #[error("Unexpected response ({status}): {body}")]
    Status { status: u16, body: String },

    /// Rate limited by the grocer.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Token endpoint operations.
#[async_trait]
pub trait ExternalAuthClient: Send + Sync {
    /// Exchange an authorization code from the OAuth callback for tokens.
    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, GrocerError>;

    /// Obtain a fresh access token with a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, GrocerError>;
}

/// Identity endpoint operations.
#[async_trait]
pub trait ExternalIdentityClient: Send + Sync {
    /// Fetch the grocer profile ID for the owner of `access_token`.
    async fn get_profile(&self, access_token: &str) -> Result<ExternalProfileId, GrocerError>;
}

/// Catalog endpoint operations.
#[async_trait]
pub trait ExternalCatalogClient: Send + Sync {
    /// Fetch products by ID. Unknown IDs are omitted from the result.
    async fn get_products(
        &self,
        ids: &[ProductId],
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError>;

    /// Fetch a single store location.
    async fn get_location(&self, id: &LocationId) -> Result<LocationSnapshot, GrocerError>;

    /// Search products by a free-text term, priced for `location_id`.
    async fn search_products(
        &self,
        term: &str,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ProductSnapshot>, GrocerError>;

    /// Find stores within `radius_miles` of a zip code.
    async fn search_locations(
        &self,
        zip_code: &str,
        radius_miles: u32,
    ) -> Result<Vec<LocationSnapshot>, GrocerError>;
}

/// Cart endpoint operations.
#[async_trait]
pub trait ExternalCartClient: Send + Sync {
    /// Add items to the cart of the owner of `access_token`.
    async fn add_to_cart(&self, access_token: &str, items: &[CartItem]) -> Result<(), GrocerError>;
}
