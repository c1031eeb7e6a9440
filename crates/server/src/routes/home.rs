//! Application root.

use axum::response::Redirect;

use crate::middleware::RequireIdentity;

/// Landing page after login; sends the user to their account.
///
/// # Route
///
/// `GET /`
pub async fn index(_identity: RequireIdentity) -> Redirect {
    Redirect::to("/account")
}
