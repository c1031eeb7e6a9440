//! Request-scoped identity.

use secrecy::{ExposeSecret, SecretString};

use recipe_shopper_core::{AccountId, SessionId};

/// Identity resolved from inbound cookies for the current request.
///
/// Inserted into request extensions by the auth middleware and read through
/// the [`RequireIdentity`](crate::middleware::RequireIdentity) extractor.
#[derive(Clone)]
pub struct ResolvedIdentity {
    /// The grocer access token for calls made on behalf of the user.
    pub access_token: SecretString,
    pub session_id: SessionId,
    pub account_id: AccountId,
}

impl ResolvedIdentity {
    /// Borrow the access token for an outbound call.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl std::fmt::Debug for ResolvedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedIdentity")
            .field("access_token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .field("account_id", &self.account_id)
            .finish()
    }
}
