//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! GET  /auth/login             - Redirect to the grocer authorize page
//! GET  /auth/callback          - Handle the OAuth callback
//! POST /auth/logout            - End the session (HTMX reload)
//!
//! # Behind identity resolution
//! GET    /                        - Landing page, redirects to the account
//! GET    /account                 - Current account
//! DELETE /account                 - Delete the account and log out
//! PUT    /account/location        - Set or clear the preferred store
//! PUT    /account/image-size      - Set the image size preference
//! GET    /products?ids=a,b        - Products by ID
//! GET    /products/search?term=t  - Product search
//! GET    /locations?zip_code=z    - Stores near a zip code
//! GET    /locations/{id}          - Store location
//! POST   /cart                    - Add items to the grocer cart
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod home;
pub mod locations;
pub mod products;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::middleware::{auth_rate_limiter, resolve_identity};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the routes that require a resolved identity.
pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/account", get(account::show).delete(account::delete))
        .route("/account/location", put(account::set_location))
        .route("/account/image-size", put(account::set_image_size))
        .route("/products", get(products::index))
        .route("/products/search", get(products::search))
        .route("/locations", get(locations::search))
        .route("/locations/{id}", get(locations::show))
        .route("/cart", post(cart::add))
        .route_layer(from_fn_with_state(state.clone(), resolve_identity))
}

/// Create all application routes, without rate limiting.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(protected_routes(state))
}

/// Create all application routes, with the strict limiter on `/auth`.
pub fn rate_limited_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
        .merge(protected_routes(state))
}
