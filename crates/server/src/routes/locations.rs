//! Store location route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use recipe_shopper_core::LocationId;

use crate::error::AppError;
use crate::middleware::RequireIdentity;
use crate::models::LocationSnapshot;
use crate::state::AppState;

/// Search radius around the requested zip code.
const SEARCH_RADIUS_MILES: u32 = 5;

/// Query parameters for `GET /locations`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub zip_code: String,
}

/// Accept a five-digit US zip code.
fn parse_zip_code(raw: &str) -> Option<&str> {
    let zip = raw.trim();
    let valid = zip.len() == 5
        && zip.bytes().all(|b| b.is_ascii_digit())
        && zip.bytes().any(|b| b != b'0');
    valid.then_some(zip)
}

/// Find stores near a zip code.
///
/// # Route
///
/// `GET /locations?zip_code=45202`
pub async fn search(
    State(state): State<AppState>,
    _identity: RequireIdentity,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<LocationSnapshot>>, AppError> {
    let Some(zip_code) = parse_zip_code(&query.zip_code) else {
        return Err(AppError::BadRequest(format!(
            "invalid zip code: {}",
            query.zip_code
        )));
    };

    Ok(Json(
        state
            .gateway()
            .search_locations(zip_code, SEARCH_RADIUS_MILES)
            .await?,
    ))
}

/// Show a store location.
///
/// # Route
///
/// `GET /locations/{id}`
pub async fn show(
    State(state): State<AppState>,
    _identity: RequireIdentity,
    Path(id): Path<LocationId>,
) -> Result<Json<LocationSnapshot>, AppError> {
    Ok(Json(state.gateway().get_location(&id).await?))
}
