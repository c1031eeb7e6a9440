//! Account route handlers.
//!
//! These routes require the identity middleware.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use recipe_shopper_core::{ImageSize, LocationId};

use crate::db::{AccountPredicate, RepositoryError};
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::RequireIdentity;
use crate::middleware::auth::HX_REFRESH;
use crate::models::Account;
use crate::state::AppState;

/// Body of `PUT /account/location`.
#[derive(Debug, Deserialize)]
pub struct SetLocationRequest {
    /// Preferred store, or `null` to clear it.
    pub location_id: Option<LocationId>,
}

/// Body of `PUT /account/image-size`.
#[derive(Debug, Deserialize)]
pub struct SetImageSizeRequest {
    pub image_size: ImageSize,
}

/// Load the account behind a resolved identity.
pub(crate) async fn current_account(
    state: &AppState,
    identity: &RequireIdentity,
) -> Result<Account, AppError> {
    state
        .accounts()
        .find(&AccountPredicate::Id(identity.0.account_id))
        .await?
        .ok_or(AppError::Database(RepositoryError::NotFound))
}

/// Show the current account.
///
/// # Route
///
/// `GET /account`
pub async fn show(
    State(state): State<AppState>,
    identity: RequireIdentity,
) -> Result<Json<Account>, AppError> {
    Ok(Json(current_account(&state, &identity).await?))
}

/// Set or clear the preferred store.
///
/// The location is checked against the grocer before it is saved.
///
/// # Route
///
/// `PUT /account/location`
pub async fn set_location(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Json(body): Json<SetLocationRequest>,
) -> Result<Json<Account>, AppError> {
    if let Some(location_id) = &body.location_id {
        state.gateway().get_location(location_id).await?;
    }

    let account = state
        .accounts()
        .set_location(identity.account_id, body.location_id.as_ref())
        .await?;
    tracing::info!(account_id = %account.id, location_id = ?account.location_id, "Store updated");
    Ok(Json(account))
}

/// Set the product image size preference.
///
/// # Route
///
/// `PUT /account/image-size`
pub async fn set_image_size(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Json(body): Json<SetImageSizeRequest>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .accounts()
        .set_image_size(identity.account_id, body.image_size)
        .await?;
    Ok(Json(account))
}

/// Delete the current account and log out.
///
/// Sessions are removed with the account. The auth cookies are expired and
/// HTMX is told to reload.
///
/// # Route
///
/// `DELETE /account`
pub async fn delete(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if !state.accounts().delete(identity.account_id).await? {
        return Err(AppError::Database(RepositoryError::NotFound));
    }
    tracing::info!(account_id = %identity.account_id, "Account deleted");

    let jar = state.resolver().logout(jar).await;
    clear_sentry_user();
    Ok((StatusCode::OK, jar, [(HX_REFRESH, "true")]))
}
