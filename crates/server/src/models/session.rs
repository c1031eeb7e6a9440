//! Session domain type.

use chrono::{DateTime, Utc};

use recipe_shopper_core::{AccountId, SessionId};

/// Correlates a `sessionID` cookie with an account.
///
/// An account may have any number of concurrent sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}
