//! Cart route handlers.
//!
//! The cart lives at the grocer; these handlers only push items into it with
//! the user's access token.

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use recipe_shopper_core::ProductId;

use crate::error::AppError;
use crate::grocer::{CartItem, Modality};
use crate::middleware::RequireIdentity;
use crate::state::AppState;

/// Body of `POST /cart`.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub items: Vec<CartItem>,
}

/// Merge lines for the same product and modality, summing quantities.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if there are no items or any quantity is zero.
fn aggregate(items: Vec<CartItem>) -> Result<Vec<CartItem>, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest("no items to add".to_string()));
    }

    let mut totals: BTreeMap<(ProductId, Modality), u32> = BTreeMap::new();
    for item in items {
        if item.quantity == 0 {
            return Err(AppError::BadRequest(format!(
                "quantity for {} must be at least 1",
                item.product_id
            )));
        }
        let total = totals
            .entry((item.product_id, item.modality))
            .or_default();
        *total = total.saturating_add(item.quantity);
    }

    Ok(totals
        .into_iter()
        .map(|((product_id, modality), quantity)| CartItem {
            product_id,
            quantity,
            modality,
        })
        .collect())
}

/// Add items to the user's grocer cart.
///
/// # Route
///
/// `POST /cart`
pub async fn add(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Json(body): Json<AddToCartRequest>,
) -> Result<StatusCode, AppError> {
    let items = aggregate(body.items)?;
    state
        .cart()
        .add_to_cart(identity.access_token(), &items)
        .await?;
    tracing::info!(account_id = %identity.account_id, lines = items.len(), "Added items to cart");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, quantity: u32, modality: Modality) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            quantity,
            modality,
        }
    }

    #[test]
    fn test_aggregate_sums_same_product_and_modality() {
        let items = aggregate(vec![
            item("p1", 1, Modality::Pickup),
            item("p2", 1, Modality::Pickup),
            item("p1", 2, Modality::Pickup),
            item("p1", 1, Modality::Delivery),
        ])
        .unwrap();

        assert_eq!(
            items,
            vec![
                item("p1", 3, Modality::Pickup),
                item("p1", 1, Modality::Delivery),
                item("p2", 1, Modality::Pickup),
            ]
        );
    }

    #[test]
    fn test_aggregate_rejects_zero_quantity() {
        let err = aggregate(vec![item("p1", 0, Modality::Pickup)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_aggregate_rejects_empty() {
        assert!(matches!(aggregate(Vec::new()), Err(AppError::BadRequest(_))));
    }
}
