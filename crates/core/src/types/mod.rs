//! Core types for Recipe Shopper.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod preference;

pub use id::*;
pub use preference::{ImageSize, ParseImageSizeError};
