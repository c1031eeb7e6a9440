//! Account repository for database operations.
//!
//! Queries are checked at runtime. Lookups are composed from an
//! [`AccountPredicate`] so that values only ever reach the database as bind
//! parameters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use recipe_shopper_core::{AccountId, ExternalProfileId, ImageSize, LocationId};

use super::{AccountStore, RepositoryError, map_unique_violation};
use crate::models::Account;

const ACCOUNT_COLUMNS: &str = "id, external_profile_id, location_id, image_size, created_at";

/// Selects a single account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountPredicate {
    Id(AccountId),
    ExternalProfileId(ExternalProfileId),
}

impl AccountPredicate {
    /// Append this predicate's `WHERE` clause to `builder`.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE ");
        match self {
            Self::Id(id) => {
                builder.push("id = ").push_bind(*id);
            }
            Self::ExternalProfileId(profile_id) => {
                builder
                    .push("external_profile_id = ")
                    .push_bind(profile_id.clone());
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    external_profile_id: ExternalProfileId,
    location_id: Option<LocationId>,
    image_size: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let image_size = row.image_size.parse::<ImageSize>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid image size in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            external_profile_id: row.external_profile_id,
            location_id: row.location_id,
            image_size,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed [`AccountStore`].
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find(&self, predicate: &AccountPredicate) -> Result<Option<Account>, RepositoryError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts"));
        predicate.push_where(&mut builder);

        let row = builder
            .build_query_as::<AccountRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn create(
        &self,
        external_profile_id: &ExternalProfileId,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO accounts (external_profile_id) VALUES ($1) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(external_profile_id.clone())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "account for external profile"))?;

        tracing::info!(account_id = %row.id, "Account created");
        Account::try_from(row)
    }

    async fn set_location(
        &self,
        id: AccountId,
        location_id: Option<&LocationId>,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET location_id = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(location_id.cloned())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Account::try_from(row)
    }

    async fn set_image_size(
        &self,
        id: AccountId,
        image_size: ImageSize,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET image_size = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(image_size.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Account::try_from(row)
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
