//! Auth cookie construction.
//!
//! All cookies are scoped to `/` and marked `HttpOnly`, `Secure`, and
//! `SameSite=Lax`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use secrecy::ExposeSecret;
use time::Duration;

use recipe_shopper_core::SessionId;

use crate::grocer::TokenGrant;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const SESSION_COOKIE: &str = "sessionID";

/// Refresh tokens are kept for about six months.
pub const REFRESH_TOKEN_MAX_AGE: Duration = Duration::days(182);

/// Longest token value accepted from a cookie.
const MAX_TOKEN_LEN: usize = 4096;

/// Whether a cookie value could plausibly be a token.
///
/// Non-empty, at most 4096 bytes, no whitespace or control characters.
#[must_use]
pub fn is_structurally_valid(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Read a token cookie, ignoring structurally invalid values.
#[must_use]
pub fn token_from(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(Cookie::value)
        .filter(|value| is_structurally_valid(value))
        .map(ToString::to_string)
}

/// Read the session cookie, ignoring values that are not session IDs.
#[must_use]
pub fn session_id_from(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

fn auth_cookie(name: &'static str, value: String, max_age: Option<Duration>) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax);
    if let Some(max_age) = max_age {
        builder = builder.max_age(max_age);
    }
    builder.build()
}

fn access_token_max_age(grant: &TokenGrant) -> Duration {
    Duration::seconds(i64::try_from(grant.expires_in).unwrap_or(i64::MAX))
}

/// Set all three cookies after a token grant.
///
/// The session cookie mirrors the access token lifetime. `refresh_token` is
/// written when the grant did not rotate it.
#[must_use]
pub fn with_grant(
    jar: CookieJar,
    grant: &TokenGrant,
    refresh_token: &str,
    session_id: SessionId,
) -> CookieJar {
    let max_age = access_token_max_age(grant);
    let refresh_token = grant
        .refresh_token
        .as_ref()
        .map_or(refresh_token, |t| t.expose_secret());

    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        grant.access_token.expose_secret().to_string(),
        Some(max_age),
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        refresh_token.to_string(),
        Some(REFRESH_TOKEN_MAX_AGE),
    ))
    .add(auth_cookie(
        SESSION_COOKIE,
        session_id.to_string(),
        Some(max_age),
    ))
}

/// Set the session cookie for a session created without a token grant.
///
/// The access token's remaining lifetime is unknown here, so this is a
/// browser-session cookie.
#[must_use]
pub fn with_session(jar: CookieJar, session_id: SessionId) -> CookieJar {
    jar.add(auth_cookie(SESSION_COOKIE, session_id.to_string(), None))
}

/// Expire all three cookies.
#[must_use]
pub fn cleared(jar: CookieJar) -> CookieJar {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, SESSION_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = auth_cookie(name, String::new(), None);
            cookie.make_removal();
            jar.add(cookie)
        })
}
