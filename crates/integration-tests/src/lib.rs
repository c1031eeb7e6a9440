//! Integration tests for Recipe Shopper.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations and start the server
//! cargo run -p recipe-shopper-cli -- migrate
//! cargo run -p recipe-shopper-server
//!
//! # Run the ignored integration tests
//! cargo test -p recipe-shopper-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPPER_TEST_URL` - Base URL of the running server (default: `http://127.0.0.1:8080`)
//! - `SHOPPER_DATABASE_URL` - Database used by the store tests

use reqwest::{Client, redirect};
use secrecy::SecretString;

/// Base URL of the server under test.
#[must_use]
pub fn server_base_url() -> String {
    std::env::var("SHOPPER_TEST_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

/// Database URL used by the store tests.
///
/// # Panics
///
/// Panics if neither `SHOPPER_DATABASE_URL` nor `DATABASE_URL` is set.
#[must_use]
pub fn database_url() -> SecretString {
    std::env::var("SHOPPER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("SHOPPER_DATABASE_URL must be set for store tests")
}

/// HTTP client that does not follow redirects, so login redirects are observable.
///
/// Requests carry an `x-forwarded-for` header so the server's rate limiter can
/// key them.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        reqwest::header::HeaderValue::from_static("127.0.0.1"),
    );
    Client::builder()
        .redirect(redirect::Policy::none())
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}
