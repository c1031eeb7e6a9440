//! Account domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use recipe_shopper_core::{AccountId, ExternalProfileId, ImageSize, LocationId};

/// A local account, created on first login for a grocer profile.
///
/// There is exactly one account per `external_profile_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Profile ID issued by the grocer. Never changes after creation.
    pub external_profile_id: ExternalProfileId,
    /// Preferred store, used for product pricing and availability.
    pub location_id: Option<LocationId>,
    /// Preferred product image size.
    pub image_size: ImageSize,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
