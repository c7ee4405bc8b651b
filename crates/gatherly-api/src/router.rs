//! Route definitions.

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::middleware::session::{optional_auth, require_auth};
use crate::state::AppState;

/// Builds the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/verify", get(handlers::auth::verify))
        .route(
            "/presence",
            put(handlers::presence::update_presence).post(handlers::presence::update_presence),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let viewer_aware = Router::new()
        .route(
            "/presence/{account_id}",
            get(handlers::presence::get_presence),
        )
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let public = Router::new().route("/health", get(handlers::health::health));

    let api = Router::new()
        .merge(protected)
        .merge(viewer_aware)
        .merge(public);

    Router::new()
        .nest("/api", api)
        .layer(from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config.server.cors))
        .with_state(state)
}
