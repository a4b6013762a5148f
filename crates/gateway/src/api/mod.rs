pub mod demo;
pub mod extract;
pub mod session;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router: demo routes behind the session middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(demo::index))
        .route("/login", post(demo::login))
        .route("/logout", post(demo::logout))
        .route("/my-profile", get(demo::my_profile))
        .route("/forget", post(demo::forget))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .with_state(state)
}
