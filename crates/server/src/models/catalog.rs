//! Catalog snapshots cached from the grocer.

use serde::{Deserialize, Serialize};

use recipe_shopper_core::{ImageSize, LocationId, ProductId};

/// Product images on the grocer's CDN, by size and view.
const PRODUCT_IMAGE_BASE_URL: &str = "https://www.kroger.com/product/images";

/// A product as last seen in the grocer catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub brand: String,
    pub description: String,
    /// Package size of the first listed item, e.g. `"16 oz"`.
    pub size: String,
    /// Product page on the grocer's site.
    pub url: String,
}

impl ProductSnapshot {
    /// Front-of-package image at `size`.
    #[must_use]
    pub fn image_url(&self, size: ImageSize) -> String {
        format!("{PRODUCT_IMAGE_BASE_URL}/{size}/front/{}", self.id)
    }

    /// Attach the image URL for an account's preferred size.
    #[must_use]
    pub fn into_view(self, size: ImageSize) -> ProductView {
        let image_url = self.image_url(size);
        ProductView {
            product: self,
            image_url,
        }
    }
}

/// A product as returned to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductSnapshot,
    pub image_url: String,
}

/// A store location as last seen in the grocer catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub id: LocationId,
    pub name: String,
    /// Single-line postal address.
    pub address: String,
}
