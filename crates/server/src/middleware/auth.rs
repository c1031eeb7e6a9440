//! Identity resolution middleware and extractor.
//!
//! [`resolve_identity`] runs the [`AuthSessionResolver`](crate::services::AuthSessionResolver)
//! for every protected request. On success the [`ResolvedIdentity`] is placed
//! in request extensions, where handlers read it through [`RequireIdentity`].
//! When the user must log in, the request never reaches the handler: full
//! navigations are redirected to the grocer, HTMX requests get `HX-Redirect`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::{AppError, set_sentry_user};
use crate::models::ResolvedIdentity;
use crate::services::AuthError;
use crate::state::AppState;

/// Request header set by HTMX on partial requests.
pub const HX_REQUEST: &str = "hx-request";
/// Response header instructing HTMX to perform a full client-side redirect.
pub const HX_REDIRECT: &str = "hx-redirect";
/// Response header instructing HTMX to reload the page.
pub const HX_REFRESH: &str = "hx-refresh";

/// Build the login redirect for a request.
///
/// HTMX requests cannot follow a cross-origin redirect themselves, so they get
/// `200` with `HX-Redirect` instead of a `307`.
pub fn login_redirect(headers: &HeaderMap, login_url: &str) -> Response {
    if headers.contains_key(HX_REQUEST) {
        match HeaderValue::from_str(login_url) {
            Ok(value) => {
                let mut response = StatusCode::OK.into_response();
                response.headers_mut().insert(HX_REDIRECT, value);
                response
            }
            Err(_) => AppError::Internal("login URL is not a valid header".to_string())
                .into_response(),
        }
    } else {
        Redirect::temporary(login_url).into_response()
    }
}

/// Middleware that resolves the request identity from auth cookies.
///
/// Cookies set during resolution (refreshed tokens, new session) are attached
/// to the handler's response.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match state.resolver().resolve(jar).await {
        Ok((identity, jar)) => {
            set_sentry_user(identity.account_id);
            tracing::Span::current()
                .record("account_id", tracing::field::display(identity.account_id));
            request.extensions_mut().insert(identity);
            (jar, next.run(request).await).into_response()
        }
        Err(AuthError::AuthenticationRequired(reason)) => {
            tracing::debug!(%reason, "Redirecting to login");
            login_redirect(request.headers(), state.login_url())
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Extractor for the identity resolved by [`resolve_identity`].
///
/// Only valid on routes behind that middleware. A missing identity means the
/// route was mounted without it and is rejected with `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireIdentity(identity): RequireIdentity,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.account_id)
/// }
/// ```
pub struct RequireIdentity(pub ResolvedIdentity);

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedIdentity>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("no resolved identity".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    const LOGIN: &str = "https://grocer.test/v1/connect/oauth2/authorize?client_id=abc";

    #[test]
    fn test_full_navigation_gets_temporary_redirect() {
        let response = login_redirect(&HeaderMap::new(), LOGIN);
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), LOGIN);
        assert!(response.headers().get(HX_REDIRECT).is_none());
    }

    #[test]
    fn test_htmx_request_gets_hx_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(HX_REQUEST, HeaderValue::from_static("true"));

        let response = login_redirect(&headers, LOGIN);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(HX_REDIRECT).unwrap(), LOGIN);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        let rejection = RequireIdentity::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
