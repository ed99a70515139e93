//! The coffee-shop menu service
//!
//! Patrons can always see what is on the menu. Everything else requires
//! an access token from the configured authorization server carrying the
//! right permission:
//!
//! * `get:drinks-detail` reveals full recipes
//! * `post:drinks` adds drinks to the menu
//! * `patch:drinks` edits drinks already on the menu
//! * `delete:drinks` removes drinks from the menu
//!
//! Failures of any kind are reported in a uniform JSON envelope:
//!
//! ```json
//! { "success": false, "error": 401, "message": "Token expired" }
//! ```

pub mod claims;
pub mod config;
pub mod drinks;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use kafejo_axum::TokenAuthorizer;
use kafejo_oauth2::Authority;

use crate::claims::ApiClaims;
use crate::drinks::MenuStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub menu: Arc<MenuStore>,
}

impl AppState {
    /// Constructs the state with a freshly seeded menu
    pub fn new() -> Self {
        Self {
            menu: Arc::new(MenuStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles the service router
///
/// `GET /drinks` and `GET /health` are public. Every other menu route
/// sits behind the bearer-token layer, with the endpoint guards checking
/// permissions once the token has been verified.
pub fn router(state: AppState, authority: Authority) -> Router {
    let authorizer = TokenAuthorizer::new()
        .with_claims::<ApiClaims>()
        .with_envelope_error_handler();

    let guarded = Router::new()
        .route("/drinks-detail", get(routes::drink_details))
        .route("/drinks", post(routes::create_drink))
        .route(
            "/drinks/:id",
            patch(routes::update_drink).delete(routes::delete_drink),
        )
        .route_layer(authorizer.jwt_layer(authority));

    Router::new()
        .route("/drinks", get(routes::list_drinks))
        .route("/health", get(routes::health))
        .merge(guarded)
        .fallback(routes::not_found)
        .with_state(state)
}
