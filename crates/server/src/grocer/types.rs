//! Grocer API wire types and their conversion into domain snapshots.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use recipe_shopper_core::{LocationId, ProductId};

use crate::models::{LocationSnapshot, ProductSnapshot};

// ─────────────────────────────────────────────────────────────────────────────
// OAuth
// ─────────────────────────────────────────────────────────────────────────────

/// Tokens issued by a successful grant.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Absent when the grocer keeps the previous refresh token valid.
    pub refresh_token: Option<SecretString>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Token endpoint response body.
#[derive(Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

impl From<TokenResponse> for TokenGrant {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            expires_in: response.expires_in,
        }
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct ProviderErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Error body returned by API endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub errors: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub reason: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ProfileResponse {
    pub data: Profile,
}

#[derive(Deserialize)]
pub(super) struct Profile {
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Products
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ProductsResponse {
    #[serde(default)]
    pub data: Vec<Product>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Product {
    pub product_id: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "productPageURI")]
    pub product_page_uri: String,
    #[serde(default)]
    pub items: Vec<ProductItem>,
}

#[derive(Deserialize)]
pub(super) struct ProductItem {
    #[serde(default)]
    pub size: String,
}

impl From<Product> for ProductSnapshot {
    fn from(product: Product) -> Self {
        let size = product
            .items
            .into_iter()
            .next()
            .map(|item| item.size)
            .unwrap_or_default();

        Self {
            id: ProductId::new(product.product_id),
            brand: product.brand,
            description: product.description,
            size,
            url: product.product_page_uri,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Locations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct LocationResponse {
    pub data: Location,
}

#[derive(Deserialize)]
pub(super) struct LocationsResponse {
    #[serde(default)]
    pub data: Vec<Location>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Location {
    pub location_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Address,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Address {
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

impl Address {
    /// Single-line form: line 1, line 2, city, state, zip, blanks skipped.
    fn single_line(&self) -> String {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.zip_code,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl From<Location> for LocationSnapshot {
    fn from(location: Location) -> Self {
        Self {
            id: LocationId::new(location.location_id),
            name: location.name,
            address: location.address.single_line(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cart
// ─────────────────────────────────────────────────────────────────────────────

/// How the user will receive cart items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    #[default]
    Pickup,
    Delivery,
}

/// A line added to the grocer cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "upc")]
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub modality: Modality,
}

#[derive(Serialize)]
pub(super) struct CartAddRequest<'a> {
    pub items: &'a [CartItem],
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_snapshot_takes_first_item_size() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "productId": "0001111041700",
            "brand": "Kroger",
            "description": "Kroger 2% Reduced Fat Milk",
            "productPageURI": "/p/kroger-2-reduced-fat-milk/0001111041700",
            "items": [{"size": "1 gal"}, {"size": "1/2 gal"}],
            "upc": "0001111041700"
        }))
        .unwrap();

        let snapshot = ProductSnapshot::from(product);
        assert_eq!(snapshot.id.as_str(), "0001111041700");
        assert_eq!(snapshot.size, "1 gal");
        assert_eq!(snapshot.url, "/p/kroger-2-reduced-fat-milk/0001111041700");
    }

    #[test]
    fn test_product_without_items_has_empty_size() {
        let product: Product =
            serde_json::from_value(serde_json::json!({"productId": "1"})).unwrap();
        assert_eq!(ProductSnapshot::from(product).size, "");
    }

    #[test]
    fn test_location_address_skips_blank_parts() {
        let location: Location = serde_json::from_value(serde_json::json!({
            "locationId": "01400943",
            "name": "Kroger - Hillcrest",
            "address": {
                "addressLine1": "1 Main St",
                "addressLine2": "",
                "city": "Cincinnati",
                "state": "OH",
                "zipCode": "45202"
            }
        }))
        .unwrap();

        let snapshot = LocationSnapshot::from(location);
        assert_eq!(snapshot.address, "1 Main St Cincinnati OH 45202");
    }

    #[test]
    fn test_cart_item_wire_format() {
        let item = CartItem {
            product_id: ProductId::new("0001111041700"),
            quantity: 2,
            modality: Modality::Delivery,
        };
        let body = serde_json::to_value(CartAddRequest {
            items: std::slice::from_ref(&item),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"items": [{"upc": "0001111041700", "quantity": 2, "modality": "DELIVERY"}]})
        );
    }

    #[test]
    fn test_cart_item_defaults_to_pickup() {
        let item: CartItem =
            serde_json::from_value(serde_json::json!({"upc": "1", "quantity": 1})).unwrap();
        assert_eq!(item.modality, Modality::Pickup);
    }
}
