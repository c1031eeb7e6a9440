//! Database operations for the server's `PostgreSQL` database.
//!
//! Stores local data only (the grocer is source of truth for catalog data):
//!
//! ## Tables
//!
//! - `accounts` - One row per grocer profile that has logged in
//! - `sessions` - Cookie sessions, cascade-deleted with their account
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p recipe-shopper-cli -- migrate
//! ```
//!
//! Persistence is reached through the [`AccountStore`] and [`SessionStore`]
//! traits so the auth resolver can be exercised against in-memory fakes.

pub mod accounts;
pub mod sessions;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use recipe_shopper_core::{AccountId, ExternalProfileId, ImageSize, LocationId, SessionId};

use crate::models::{Account, Session};

pub use accounts::{AccountPredicate, AccountRepository};
pub use sessions::SessionRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate external profile ID).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence for [`Account`] records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find the single account matching `predicate`.
    async fn find(&self, predicate: &AccountPredicate) -> Result<Option<Account>, RepositoryError>;

    /// Create an account for a never-before-seen grocer profile.
    ///
    /// Returns `RepositoryError::Conflict` if the profile already has one.
    async fn create(
        &self,
        external_profile_id: &ExternalProfileId,
    ) -> Result<Account, RepositoryError>;

    /// Set or clear the preferred store.
    async fn set_location(
        &self,
        id: AccountId,
        location_id: Option<&LocationId>,
    ) -> Result<Account, RepositoryError>;

    /// Set the preferred product image size.
    async fn set_image_size(
        &self,
        id: AccountId,
        image_size: ImageSize,
    ) -> Result<Account, RepositoryError>;

    /// Delete an account and, by cascade, all of its sessions.
    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError>;
}

/// Persistence for [`Session`] records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session for an existing account.
    async fn create(&self, account_id: AccountId) -> Result<Session, RepositoryError>;

    /// Look up a session by ID.
    async fn get(&self, id: SessionId) -> Result<Option<Session>, RepositoryError>;

    /// Delete a session. Returns whether a row was removed.
    async fn delete(&self, id: SessionId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
