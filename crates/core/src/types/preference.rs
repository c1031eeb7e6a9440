//! Account display preferences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product image size preferred by an account.
///
/// Values match the size names used by the grocer's image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Thumbnail,
    Small,
    #[default]
    Medium,
    Large,
    #[serde(rename = "xlarge")]
    ExtraLarge,
}

/// Error returned when parsing an unknown image size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid image size: {0}")]
pub struct ParseImageSizeError(pub String);

impl ImageSize {
    /// The canonical string form, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::ExtraLarge => "xlarge",
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageSize {
    type Err = ParseImageSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(Self::Thumbnail),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "xlarge" => Ok(Self::ExtraLarge),
            _ => Err(ParseImageSizeError(s.to_owned())),
        }
    }
}
