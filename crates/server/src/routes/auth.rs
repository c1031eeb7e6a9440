//! Grocer OAuth route handlers.
//!
//! - Login: redirects to the grocer's authorize page
//! - Callback: exchanges the authorization code and establishes a session
//! - Logout: ends the session and expires the auth cookies

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::HX_REFRESH;
use crate::middleware::login_redirect;
use crate::services::AuthError;
use crate::state::AppState;

/// Query parameters from the grocer OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Start the login flow.
///
/// # Route
///
/// `GET /auth/login`
pub async fn login(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(state.login_url())
}

/// Handle the grocer OAuth callback.
///
/// Creates the account on first login, always starts a new session, and
/// redirects to the application root.
///
/// # Route
///
/// `GET /auth/callback`
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Grocer denied authorization");
        return Err(AppError::Unauthorized(format!(
            "authorization denied: {error}"
        )));
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Err(AppError::BadRequest(
            "missing authorization code".to_string(),
        ));
    };

    let redirect_uri = &state.config().grocer.redirect_uri;
    match state
        .resolver()
        .complete_login(&code, redirect_uri, jar)
        .await
    {
        Ok((identity, jar)) => {
            set_sentry_user(identity.account_id);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AuthError::AuthenticationRequired(reason)) => {
            tracing::info!(%reason, "Login did not complete, restarting");
            Ok(login_redirect(&headers, state.login_url()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Log out.
///
/// Deletes the session, expires all auth cookies, and tells HTMX to reload.
///
/// # Route
///
/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.resolver().logout(jar).await;
    clear_sentry_user();
    (StatusCode::OK, jar, [(HX_REFRESH, "true")])
}
