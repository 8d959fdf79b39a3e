//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the question board.
//! It includes:
//! - Question API endpoints (create, list, search, delete)
//! - Tag API endpoints

pub mod common;
pub mod middleware;
pub mod questions;
pub mod responses;
pub mod tags;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, ErrorCode};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid session)
    let protected_routes = Router::new()
        .route("/questions", post(questions::create_question_handler))
        .route("/questions/mine", get(questions::list_my_questions_handler))
        .route("/questions/{id}", delete(questions::delete_question_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/questions", get(questions::list_questions_handler))
        .route(
            "/questions/search",
            get(questions::search_questions_handler).post(questions::search_questions_body_handler),
        )
        .route(
            "/questions/user/{user_id}",
            get(questions::list_user_questions_handler),
        )
        .route("/questions/{id}", get(questions::get_question_handler))
        .nest("/tags", tags::router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
///
/// # Errors
///
/// Returns an error if `cors_origin` is not a valid header value.
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    // Cookie sessions need credentials enabled
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
