//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::grocer::GrocerError;

/// Errors that can occur while resolving or establishing a login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user must log in with the grocer again.
    ///
    /// Covers missing or invalid tokens and any failed grocer call in the
    /// refresh/identity chain. Always answered with a login redirect.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Store(#[from] RepositoryError),
}

impl AuthError {
    /// Translate a grocer failure into a login requirement.
    pub(crate) fn upstream(step: &str, err: &GrocerError) -> Self {
        tracing::warn!(step, error = %err, "Grocer call failed during authentication");
        Self::AuthenticationRequired(format!("{step} failed"))
    }
}
