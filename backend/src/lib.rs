pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;
use crate::utils::uploads::MAX_REQUEST_BODY_BYTES;

/// Assembles the full router: public routes, authenticated routes, and the
/// reviewer-gated routes, plus static serving of stored attachments.
pub fn app(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/health", get(handlers::health::health));

    // Authenticated routes (any role)
    let user_routes = Router::new()
        .route(
            "/api/applications",
            post(handlers::applications::create_application)
                .get(handlers::applications::list_applications),
        )
        .route(
            "/api/applications/{id}",
            get(handlers::applications::get_application)
                .put(handlers::applications::update_application),
        )
        .route("/api/auth/profile", get(handlers::auth::profile))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    // Reviewer routes (auth + principal/admin role)
    let reviewer_routes = Router::new()
        .route(
            "/api/applications/stats",
            get(handlers::applications::get_application_stats),
        )
        .route(
            "/api/applications/{id}/status",
            put(handlers::applications::update_application_status),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_reviewer,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(reviewer_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                )
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES)),
        )
        .with_state(state)
}
