//! Authentication service.
//!
//! [`AuthSessionResolver`] turns the inbound `accessToken`, `refreshToken`,
//! and `sessionID` cookies into a [`ResolvedIdentity`], refreshing tokens and
//! creating accounts and sessions as needed:
//!
//! 1. No valid refresh token: the user must log in.
//! 2. Valid access token: accepted without a network call.
//! 3. Missing or invalid access token: refresh it, fetch the grocer profile,
//!    resolve the account, create a session, and reset all three cookies.
//! 4. Otherwise, take the account from the session cookie, or fetch the
//!    profile and create a session if there is no usable session cookie.
//!
//! Any grocer failure along the way becomes
//! [`AuthError::AuthenticationRequired`], and so does an account that
//! disappears mid-resolution. Other store failures are returned as
//! [`AuthError::Store`].

pub mod cookies;
mod error;

pub use error::AuthError;

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use recipe_shopper_core::{AccountId, ExternalProfileId};

use crate::db::{AccountPredicate, AccountStore, RepositoryError, SessionStore};
use crate::grocer::{ExternalAuthClient, ExternalIdentityClient};
use crate::models::{Account, ResolvedIdentity, Session};

/// Resolves and establishes request identities.
#[derive(Clone)]
pub struct AuthSessionResolver {
    auth: Arc<dyn ExternalAuthClient>,
    identity: Arc<dyn ExternalIdentityClient>,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthSessionResolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new(
        auth: Arc<dyn ExternalAuthClient>,
        identity: Arc<dyn ExternalIdentityClient>,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            auth,
            identity,
            accounts,
            sessions,
        }
    }

    /// Resolve the identity for a request from its cookies.
    ///
    /// Returns the identity and the cookie jar to send back, which carries
    /// any cookies set during resolution. At most one session is created.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthenticationRequired` if the user must log in.
    /// Returns `AuthError::Store` if the database fails.
    #[instrument(skip_all)]
    pub async fn resolve(&self, jar: CookieJar) -> Result<(ResolvedIdentity, CookieJar), AuthError> {
        let Some(refresh_token) = cookies::token_from(&jar, cookies::REFRESH_TOKEN_COOKIE) else {
            return Err(AuthError::AuthenticationRequired(
                "missing or invalid refresh token".to_string(),
            ));
        };

        let Some(access_token) = cookies::token_from(&jar, cookies::ACCESS_TOKEN_COOKIE) else {
            return self.resolve_with_refresh(jar, &refresh_token).await;
        };

        if let Some(session) = self.session_from_cookie(&jar).await? {
            return Ok((
                ResolvedIdentity {
                    access_token: SecretString::from(access_token),
                    session_id: session.id,
                    account_id: session.account_id,
                },
                jar,
            ));
        }

        let account = self.account_for_token(&access_token).await?;
        let session = self.create_session(account.id).await?;
        debug!(account_id = %account.id, session_id = %session.id, "Session created for valid access token");

        let jar = cookies::with_session(jar, session.id);
        Ok((
            ResolvedIdentity {
                access_token: SecretString::from(access_token),
                session_id: session.id,
                account_id: account.id,
            },
            jar,
        ))
    }

    /// Complete the authorization-code flow.
    ///
    /// Exchanges the code, resolves or creates the account, always creates a
    /// new session, and sets all three cookies.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthenticationRequired` if any grocer call fails.
    /// Returns `AuthError::Store` if the database fails.
    #[instrument(skip_all)]
    pub async fn complete_login(
        &self,
        code: &str,
        redirect_uri: &str,
        jar: CookieJar,
    ) -> Result<(ResolvedIdentity, CookieJar), AuthError> {
        let grant = self
            .auth
            .exchange_authorization_code(code, redirect_uri)
            .await
            .map_err(|e| AuthError::upstream("authorization code exchange", &e))?;

        let Some(refresh_token) = grant
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
        else {
            return Err(AuthError::AuthenticationRequired(
                "token grant without refresh token".to_string(),
            ));
        };

        let account = self
            .account_for_token(grant.access_token.expose_secret())
            .await?;
        let session = self.create_session(account.id).await?;
        info!(account_id = %account.id, session_id = %session.id, "Login completed");

        let jar = cookies::with_grant(jar, &grant, &refresh_token, session.id);
        Ok((
            ResolvedIdentity {
                access_token: grant.access_token,
                session_id: session.id,
                account_id: account.id,
            },
            jar,
        ))
    }

    /// End the session named by the cookies and expire all auth cookies.
    ///
    /// Deleting the session row is best-effort; the cookies are always expired.
    pub async fn logout(&self, jar: CookieJar) -> CookieJar {
        if let Some(session_id) = cookies::session_id_from(&jar) {
            match self.sessions.delete(session_id).await {
                Ok(_) => debug!(%session_id, "Session deleted"),
                Err(e) => warn!(%session_id, error = %e, "Failed to delete session on logout"),
            }
        }
        cookies::cleared(jar)
    }

    /// Step 3: refresh the access token and start a new session.
    async fn resolve_with_refresh(
        &self,
        jar: CookieJar,
        refresh_token: &str,
    ) -> Result<(ResolvedIdentity, CookieJar), AuthError> {
        let grant = self
            .auth
            .refresh(refresh_token)
            .await
            .map_err(|e| AuthError::upstream("token refresh", &e))?;

        let account = self
            .account_for_token(grant.access_token.expose_secret())
            .await?;
        let session = self.create_session(account.id).await?;
        debug!(account_id = %account.id, session_id = %session.id, "Access token refreshed");

        let jar = cookies::with_grant(jar, &grant, refresh_token, session.id);
        Ok((
            ResolvedIdentity {
                access_token: grant.access_token,
                session_id: session.id,
                account_id: account.id,
            },
            jar,
        ))
    }

    /// Look up the session named by the session cookie, if it still exists.
    async fn session_from_cookie(&self, jar: &CookieJar) -> Result<Option<Session>, AuthError> {
        let Some(session_id) = cookies::session_id_from(jar) else {
            return Ok(None);
        };

        let session = self.sessions.get(session_id).await?;
        if session.is_none() {
            debug!(%session_id, "Session cookie names an unknown session");
        }
        Ok(session)
    }

    /// Fetch the grocer profile for `access_token` and resolve its account.
    async fn account_for_token(&self, access_token: &str) -> Result<Account, AuthError> {
        let profile_id = self
            .identity
            .get_profile(access_token)
            .await
            .map_err(|e| AuthError::upstream("profile lookup", &e))?;

        resolve_or_create_account(self.accounts.as_ref(), &profile_id)
            .await
            .map_err(resolution_store_error)
    }

    async fn create_session(&self, account_id: AccountId) -> Result<Session, AuthError> {
        self.sessions
            .create(account_id)
            .await
            .map_err(resolution_store_error)
    }
}

/// A row missing mid-resolution means the account was deleted concurrently.
fn resolution_store_error(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::NotFound => {
            AuthError::AuthenticationRequired("account no longer exists".to_string())
        }
        other => AuthError::Store(other),
    }
}

/// Find the account for a grocer profile, creating it on first login.
///
/// A concurrent first login that wins the insert is resolved by re-reading.
///
/// # Errors
///
/// Returns `RepositoryError` if the store fails.
pub async fn resolve_or_create_account(
    accounts: &dyn AccountStore,
    profile_id: &ExternalProfileId,
) -> Result<Account, RepositoryError> {
    let predicate = AccountPredicate::ExternalProfileId(profile_id.clone());
    if let Some(account) = accounts.find(&predicate).await? {
        return Ok(account);
    }

    match accounts.create(profile_id).await {
        Ok(account) => Ok(account),
        Err(RepositoryError::Conflict(_)) => {
            debug!("Account created concurrently, re-reading");
            accounts
                .find(&predicate)
                .await?
                .ok_or(RepositoryError::NotFound)
        }
        Err(e) => Err(e),
    }
}
