//! Product route handlers.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use recipe_shopper_core::ProductId;

use crate::error::AppError;
use crate::middleware::RequireIdentity;
use crate::models::ProductView;
use crate::routes::account::current_account;
use crate::state::AppState;

/// Query parameters for `GET /products`.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    /// Comma-separated product IDs.
    #[serde(default)]
    pub ids: String,
}

/// Query parameters for `GET /products/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

/// Split a comma-separated ID list, dropping blanks and repeats.
fn parse_ids(raw: &str) -> Vec<ProductId> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(ProductId::new)
        .collect()
}

/// List products by ID, priced for the account's preferred store.
///
/// Products are returned in request order. If any ID is unknown to the
/// grocer the request fails with `404`.
///
/// # Route
///
/// `GET /products?ids=a,b`
pub async fn index(
    State(state): State<AppState>,
    identity: RequireIdentity,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<ProductView>>, AppError> {
    let ids = parse_ids(&query.ids);
    if ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let account = current_account(&state, &identity).await?;
    let mut products = state
        .gateway()
        .get_products(&ids, account.location_id.as_ref())
        .await?;

    let views = ids
        .iter()
        .map(|id| {
            products
                .remove(id)
                .map(|p| p.into_view(account.image_size))
                .ok_or_else(|| AppError::Internal(format!("catalog result is missing {id}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// Search products by term, priced for the account's preferred store.
///
/// # Route
///
/// `GET /products/search?term=milk`
pub async fn search(
    State(state): State<AppState>,
    identity: RequireIdentity,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProductView>>, AppError> {
    let term = query.term.trim();
    if term.is_empty() {
        return Err(AppError::BadRequest("term must not be empty".to_string()));
    }

    let account = current_account(&state, &identity).await?;
    let products = state
        .gateway()
        .search_products(term, account.location_id.as_ref())
        .await?;

    Ok(Json(
        products
            .into_iter()
            .map(|p| p.into_view(account.image_size))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_drops_blanks_and_repeats() {
        assert_eq!(
            parse_ids(" p1,,p2 ,p1"),
            vec![ProductId::new("p1"), ProductId::new("p2")]
        );
        assert!(parse_ids("").is_empty());
    }
}
