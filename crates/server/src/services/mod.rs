//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Cookie-based identity resolution and grocer login
//! - `catalog` - Cache-aside access to grocer products and locations

pub mod auth;
pub mod catalog;

pub use auth::{AuthError, AuthSessionResolver};
pub use catalog::{CatalogError, CatalogGateway};
