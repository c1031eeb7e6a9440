//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Rate limiting (governor)
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. `TimeoutLayer` (request deadline)
//! 6. Identity resolution (protected routes only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod trace;

pub use auth::{RequireIdentity, login_redirect, resolve_identity};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use trace::{record_response, request_span};
