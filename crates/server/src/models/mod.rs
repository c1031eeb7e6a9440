//! Domain models for the server.
//!
//! These are validated domain objects, separate from database row types.

pub mod account;
pub mod catalog;
pub mod identity;
pub mod session;

pub use account::Account;
pub use catalog::{LocationSnapshot, ProductSnapshot, ProductView};
pub use identity::ResolvedIdentity;
pub use session::Session;
